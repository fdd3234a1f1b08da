/// Terminal output for the load board.
///
/// The `print_*` functions back the one-shot CLI commands. The
/// [`TerminalRenderer`] redraws a compact board on every snapshot for
/// `loadwatch watch`.
use anyhow::Result;
use colored::{ColoredString, Colorize};

use super::Renderer;
use crate::cli::OutputFormat;
use crate::filter::FilterParams;
use crate::model::{Load, LoadStatus, MetricsSnapshot};
use crate::store::{CallRow, Snapshot};

const BAR_WIDTH: usize = 30;

// ---------------------------------------------------------------------------
// Loads
// ---------------------------------------------------------------------------

/// Print the filtered loads as a table, JSON array or CSV.
pub fn print_loads(loads: &[Load], total: usize, params: &FilterParams, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(loads)?),
        OutputFormat::Csv => print_loads_csv(loads),
        OutputFormat::Table => print_loads_table(loads, total, params),
    }
    Ok(())
}

fn print_loads_table(loads: &[Load], total: usize, params: &FilterParams) {
    println!(
        "{}",
        format!("Loads ({} of {})", loads.len(), total).bold().cyan()
    );
    println!("  {}", describe_params(params).dimmed());
    println!("{}", "=".repeat(96));

    if loads.is_empty() {
        println!("  {}", "No loads match the current filters.".yellow());
        return;
    }

    println!(
        "  {:<10} {:<30} {:<10} {:<11} {:>10} {:>7} {:>6}",
        "Load", "Route", "Equipment", "Status", "Rate", "Miles", "$/mi"
    );
    println!("  {}", "-".repeat(94));

    for (i, load) in loads.iter().enumerate() {
        let line = format!(
            "  {:<10} {:<30} {:<10} {} {:>10} {:>7.0} {:>6.2}",
            truncate(&load.load_id, 10),
            truncate(&load.route(), 30),
            truncate(&load.equipment_type, 10),
            status_badge(load.status),
            format_money(load.effective_rate()),
            load.miles,
            load.rate_per_mile(),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_loads_csv(loads: &[Load]) {
    println!("load_id,origin,destination,equipment_type,status,rate,miles,rate_per_mile,pickup_datetime");
    for load in loads {
        println!(
            "{},{},{},{},{},{:.2},{:.0},{:.2},{}",
            load.load_id,
            csv_field(&load.origin),
            csv_field(&load.destination),
            csv_field(&load.equipment_type),
            load.status,
            load.effective_rate(),
            load.miles,
            load.rate_per_mile(),
            load.pickup_datetime,
        );
    }
}

/// Print every detail of a single load.
pub fn print_load_details(load: &Load) {
    println!(
        "{} {}",
        load.load_id.bold().cyan(),
        status_badge(load.status)
    );
    println!("{}", "=".repeat(50));
    print_field("Route", &load.route());
    print_field("Origin", &load.origin);
    print_field("Destination", &load.destination);
    print_field("Pickup", &format_when(load.pickup_at(), &load.pickup_datetime));
    print_field("Delivery", &format_when(load.delivery_at(), &load.delivery_datetime));
    print_field("Equipment", &load.equipment_type);
    print_field("Commodity", load.commodity_or_default());
    if let Some(weight) = load.weight {
        print_field("Weight", &format!("{} lbs", format_number(weight)));
    }
    print_field("Miles", &format!("{:.0}", load.miles));
    print_field("Rate", &format_money(load.effective_rate()));
    print_field("Rate per mile", &format!("${:.2}", load.rate_per_mile()));
    print_field("Max buy", &format_money(load.max_buy));
    if let Some(notes) = load.notes.as_deref().filter(|n| !n.is_empty()) {
        print_field("Notes", notes);
    }
}

fn print_field(name: &str, value: &str) {
    println!("  {} {}", format!("{name:<14}").bold(), value);
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Print recent calls with their routes.
pub fn print_calls(rows: &[CallRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => {
            println!("timestamp,carrier_name,mc_number,load_id,route,outcome,agreed_rate,sentiment");
            for row in rows {
                let call = &row.call;
                println!(
                    "{},{},{},{},{},{},{},{}",
                    call.timestamp,
                    csv_field(call.carrier_or_unknown()),
                    call.mc_number,
                    call.load_id.as_deref().unwrap_or(""),
                    csv_field(row.route.as_deref().unwrap_or("")),
                    call.outcome,
                    call.agreed_rate.map(|r| format!("{r:.2}")).unwrap_or_default(),
                    call.sentiment,
                );
            }
        }
        OutputFormat::Table => print_calls_table(rows),
    }
    Ok(())
}

fn print_calls_table(rows: &[CallRow]) {
    println!("{}", "Recent Calls".bold().cyan());
    println!("{}", "=".repeat(96));

    if rows.is_empty() {
        println!("  {}", "No calls recorded.".yellow());
        return;
    }

    println!(
        "  {:<16} {:<24} {:<10} {:<22} {:<14} {:>9}",
        "Time", "Carrier", "Load", "Route", "Outcome", "Rate"
    );
    println!("  {}", "-".repeat(94));

    for row in rows {
        let call = &row.call;
        let time = call
            .called_at()
            .map(|t| t.format("%b %d %H:%M").to_string())
            .unwrap_or_else(|| call.timestamp.clone());
        let rate = call.agreed_rate.map(format_money).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<16} {:<24} {:<10} {:<22} {} {:>9}",
            truncate(&time, 16),
            truncate(call.carrier_or_unknown(), 24),
            truncate(call.load_id.as_deref().unwrap_or("-"), 10),
            truncate(row.route.as_deref().unwrap_or("-"), 22),
            outcome_badge(&call.outcome),
            rate,
        );
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Print KPIs and the outcome / sentiment breakdowns.
pub fn print_metrics(metrics: &MetricsSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(metrics)?),
        OutputFormat::Csv => {
            println!("series,label,count");
            for (label, count) in metrics.outcome_series() {
                println!("outcome,{},{}", csv_field(&label), count);
            }
            for (label, count) in metrics.sentiment_series() {
                println!("sentiment,{},{}", csv_field(&label), count);
            }
        }
        OutputFormat::Table => {
            println!("{}", "Call Metrics".bold().cyan());
            println!("{}", "=".repeat(60));
            print_kpis(metrics);
            println!();
            print_chart("Call Outcomes", &metrics.outcome_series());
            println!();
            print_chart("Carrier Sentiment", &metrics.sentiment_series());
        }
    }
    Ok(())
}

fn print_kpis(metrics: &MetricsSnapshot) {
    println!("  {} {}", "Total calls:      ".bold(), metrics.total_calls);
    println!(
        "  {} {}",
        "Bookings:         ".bold(),
        metrics.successful_bookings
    );
    println!("  {} {:.1}%", "Success rate:     ".bold(), metrics.success_rate);
    println!(
        "  {} {}",
        "Booked value:     ".bold(),
        format_money(metrics.total_booked_value)
    );
    println!(
        "  {} {:.1}",
        "Avg negotiation:  ".bold(),
        metrics.avg_negotiation_rounds
    );
}

fn print_chart(title: &str, series: &[(String, u64)]) {
    println!("{}", title.bold().cyan());
    if series.is_empty() {
        println!("  {}", "no data".dimmed());
        return;
    }
    let max = series.iter().map(|(_, n)| *n).max().unwrap_or(0);
    for (label, count) in series {
        println!(
            "  {:<22} {} {}",
            truncate(label, 22),
            bar(*count, max, BAR_WIDTH).cyan(),
            count
        );
    }
}

/// Horizontal bar scaled so that `max` fills `width` cells.
pub fn bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let cells = ((count as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}

// ---------------------------------------------------------------------------
// Live board
// ---------------------------------------------------------------------------

/// Redraws the board in place on each snapshot.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    clear_screen: bool,
    last_version: Option<u64>,
}

impl TerminalRenderer {
    pub fn new(clear_screen: bool) -> Self {
        Self {
            clear_screen,
            last_version: None,
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, snapshot: &Snapshot) {
        if self.last_version == Some(snapshot.version) {
            return;
        }
        self.last_version = Some(snapshot.version);

        if self.clear_screen {
            print!("\x1b[2J\x1b[H");
        }

        let updated = snapshot
            .updated_at
            .map(|t| t.format("%H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}  {}",
            "loadwatch".bold().cyan(),
            format!("updated {updated} · v{}", snapshot.version).dimmed()
        );

        match snapshot.metrics.as_deref() {
            Some(m) => println!(
                "  calls {}  booked {}  success {:.1}%  value {}",
                m.total_calls,
                m.successful_bookings,
                m.success_rate,
                format_money(m.total_booked_value)
            ),
            None => println!("  {}", "metrics unavailable".dimmed()),
        }
        println!();

        print_loads_table(&snapshot.filtered, snapshot.total_loads(), &snapshot.params);

        if let Some(load) = &snapshot.selected {
            println!();
            print_load_details(load);
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn status_badge(status: LoadStatus) -> ColoredString {
    let label = format!("{:<11}", status.to_string());
    match status {
        LoadStatus::Available => label.green(),
        LoadStatus::Booked => label.blue(),
        LoadStatus::Covered => label.bright_black(),
    }
}

fn outcome_badge(outcome: &str) -> ColoredString {
    let label = format!("{:<14}", truncate(&crate::model::outcome_label(outcome), 14));
    match outcome {
        "booked" => label.green(),
        "no_agreement" | "not_interested" => label.yellow(),
        "carrier_not_eligible" => label.red(),
        _ => label.normal(),
    }
}

fn describe_params(params: &FilterParams) -> String {
    let mut parts = vec![format!("tab: {}", params.tab)];
    if !params.equipment_type.is_empty() {
        parts.push(format!("equipment: {}", params.equipment_type));
    }
    if !params.search_query.is_empty() {
        parts.push(format!("search: \"{}\"", params.search_query));
    }
    parts.join("  ")
}

fn format_when(parsed: Option<chrono::NaiveDateTime>, raw: &str) -> String {
    match parsed {
        Some(dt) => dt.format("%a %b %d, %H:%M").to_string(),
        None if raw.is_empty() => "-".to_string(),
        None => raw.to_string(),
    }
}

/// `2450.0` → `"$2,450"`.
pub fn format_money(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${}", format_number(amount.abs()))
}

/// Whole number with thousands separators.
fn format_number(value: f64) -> String {
    let digits = format!("{:.0}", value);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_has_thousands_separators() {
        assert_eq!(format_money(2450.0), "$2,450");
        assert_eq!(format_money(1234567.4), "$1,234,567");
        assert_eq!(format_money(0.0), "$0");
        assert_eq!(format_money(-980.0), "-$980");
    }

    #[test]
    fn bar_scales_to_max() {
        assert_eq!(bar(10, 10, 20).chars().count(), 20);
        assert_eq!(bar(5, 10, 20).chars().count(), 10);
        assert_eq!(bar(1, 1000, 20).chars().count(), 1);
        assert!(bar(0, 10, 20).is_empty());
        assert!(bar(3, 0, 20).is_empty());
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Chicago → Dallas", 40), "Chicago → Dallas");
        assert_eq!(truncate("Los Angeles", 5), "Los …");
    }

    #[test]
    fn csv_quotes_commas() {
        assert_eq!(csv_field("Chicago, IL"), "\"Chicago, IL\"");
        assert_eq!(csv_field("Reefer"), "Reefer");
    }

    #[test]
    fn params_description_omits_empty_dimensions() {
        assert_eq!(describe_params(&FilterParams::default()), "tab: available");
        let params = FilterParams::new(crate::filter::Tab::All, "Reefer", "chi");
        assert_eq!(
            describe_params(&params),
            "tab: all  equipment: Reefer  search: \"chi\""
        );
    }
}
