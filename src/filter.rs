//! Filter engine: a pure mapping from (full load set, parameters) to the
//! filtered load set.
//!
//! Three independent predicates are evaluated per load, in a fixed order,
//! short-circuiting on the first failure:
//!
//! 1. **Tab**: `available`, `booked`, or `all`.
//! 2. **Equipment**: exact, case-sensitive match; empty means no filter.
//! 3. **Search**: case-insensitive substring over
//!    `"{load_id} {origin} {destination} {equipment_type}"`.
//!
//! The result preserves the relative order of the input.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Load, LoadStatus};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Top-level tab selecting which statuses are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Available,
    Booked,
    All,
}

impl Tab {
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "available" => Some(Self::Available),
            "booked" => Some(Self::Booked),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn admits(self, status: LoadStatus) -> bool {
        match self {
            Self::Available => status == LoadStatus::Available,
            Self::Booked => status == LoadStatus::Booked,
            Self::All => true,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Booked => write!(f, "booked"),
            Self::All => write!(f, "all"),
        }
    }
}

/// The active filter parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub tab: Tab,
    /// Empty string disables the equipment filter.
    pub equipment_type: String,
    /// Empty string disables the search filter.
    pub search_query: String,
}

impl FilterParams {
    pub fn new(tab: Tab, equipment_type: impl Into<String>, search_query: impl Into<String>) -> Self {
        Self {
            tab,
            equipment_type: equipment_type.into(),
            search_query: search_query.into(),
        }
    }

    /// Apply a single-dimension change.
    pub fn set(&mut self, param: FilterParam) {
        match param {
            FilterParam::Tab(tab) => self.tab = tab,
            FilterParam::Equipment(equipment) => self.equipment_type = equipment,
            FilterParam::Search(query) => self.search_query = query,
        }
    }
}

/// A change to one filter dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterParam {
    Tab(Tab),
    Equipment(String),
    Search(String),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Filter `full` by `params`, keeping input order.
pub fn apply(full: &[Load], params: &FilterParams) -> Vec<Load> {
    let needle = params.search_query.to_lowercase();
    full.iter()
        .filter(|load| matches_with_needle(load, params, &needle))
        .cloned()
        .collect()
}

/// Whether a single load passes all three predicates.
pub fn matches(load: &Load, params: &FilterParams) -> bool {
    matches_with_needle(load, params, &params.search_query.to_lowercase())
}

fn matches_with_needle(load: &Load, params: &FilterParams, needle: &str) -> bool {
    if !params.tab.admits(load.status) {
        return false;
    }

    if !params.equipment_type.is_empty() && load.equipment_type != params.equipment_type {
        return false;
    }

    if !needle.is_empty() && !load.search_text().to_lowercase().contains(needle) {
        return false;
    }

    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawLoad, normalize};

    fn load(id: &str, status: &str, equipment: &str, origin: &str) -> Load {
        normalize(RawLoad {
            load_id: id.to_string(),
            origin: origin.to_string(),
            destination: "Atlanta, GA".to_string(),
            equipment_type: equipment.to_string(),
            status: Some(status.to_string()),
            ..RawLoad::default()
        })
    }

    fn ids(loads: &[Load]) -> Vec<&str> {
        loads.iter().map(|l| l.load_id.as_str()).collect()
    }

    #[test]
    fn tab_parse_is_case_insensitive() {
        assert_eq!(Tab::parse("Booked"), Some(Tab::Booked));
        assert_eq!(Tab::parse(" all "), Some(Tab::All));
        assert_eq!(Tab::parse("covered"), None);
    }

    #[test]
    fn default_params_show_available_only() {
        let full = vec![
            load("A", "available", "Reefer", "Chicago, IL"),
            load("B", "booked", "Reefer", "Chicago, IL"),
        ];
        assert_eq!(ids(&apply(&full, &FilterParams::default())), vec!["A"]);
    }

    #[test]
    fn booked_tab_shows_booked_only() {
        let full = vec![
            load("A", "available", "Reefer", "Chicago, IL"),
            load("B", "booked", "Flatbed", "Denver, CO"),
        ];
        let params = FilterParams::new(Tab::Booked, "", "");
        assert_eq!(ids(&apply(&full, &params)), vec!["B"]);
    }

    #[test]
    fn equipment_match_is_case_sensitive() {
        let full = vec![load("A", "available", "Reefer", "Chicago, IL")];
        assert!(apply(&full, &FilterParams::new(Tab::All, "reefer", "")).is_empty());
        assert_eq!(apply(&full, &FilterParams::new(Tab::All, "Reefer", "")).len(), 1);
    }

    #[test]
    fn search_covers_id_and_equipment() {
        let full = vec![
            load("LOAD-042", "available", "Dry Van", "Miami, FL"),
            load("LOAD-043", "available", "Reefer", "Miami, FL"),
        ];
        assert_eq!(ids(&apply(&full, &FilterParams::new(Tab::All, "", "042"))), vec!["LOAD-042"]);
        assert_eq!(ids(&apply(&full, &FilterParams::new(Tab::All, "", "dry van"))), vec!["LOAD-042"]);
        assert_eq!(apply(&full, &FilterParams::new(Tab::All, "", "atlanta")).len(), 2);
    }

    #[test]
    fn covered_loads_only_show_on_all_tab() {
        let mut covered = load("C", "available", "Reefer", "Chicago, IL");
        covered.status = LoadStatus::Covered;
        let full = vec![covered];
        assert!(apply(&full, &FilterParams::new(Tab::Available, "", "")).is_empty());
        assert!(apply(&full, &FilterParams::new(Tab::Booked, "", "")).is_empty());
        assert_eq!(apply(&full, &FilterParams::new(Tab::All, "", "")).len(), 1);
    }

    #[test]
    fn set_replaces_one_dimension() {
        let mut params = FilterParams::new(Tab::All, "Reefer", "chi");
        params.set(FilterParam::Equipment(String::new()));
        assert_eq!(params, FilterParams::new(Tab::All, "", "chi"));
        params.set(FilterParam::Tab(Tab::Booked));
        params.set(FilterParam::Search("DAL".to_string()));
        assert_eq!(params, FilterParams::new(Tab::Booked, "", "DAL"));
    }

    #[test]
    fn matches_agrees_with_apply() {
        let full = vec![
            load("A", "available", "Reefer", "Chicago, IL"),
            load("B", "booked", "Flatbed", "Denver, CO"),
        ];
        let params = FilterParams::new(Tab::All, "", "CHI");
        let kept: Vec<&Load> = full.iter().filter(|l| matches(l, &params)).collect();
        assert_eq!(kept.len(), apply(&full, &params).len());
    }
}
