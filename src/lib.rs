//! loadwatch: a polling load board for a freight brokerage backend.
//!
//! Data flows one way: [`poller`] fetches metrics and loads through an
//! [`api::DataSource`], the control thread normalizes and applies each
//! outcome to the [`store::ViewStore`] held by a [`board::Board`], and
//! every change is pushed to the [`render::Renderer`]s as an immutable
//! [`store::Snapshot`]. Filtering is a pure function in [`filter`].

pub mod activity;
pub mod api;
pub mod board;
pub mod cli;
pub mod config;
pub mod filter;
pub mod model;
pub mod poller;
pub mod render;
pub mod store;
pub mod web;
