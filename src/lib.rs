//! gridsight: smart-grid monitoring dashboard core.
//!
//! Energy-demand forecasting, fault prediction and nearest-timestamp search
//! against a prediction backend, with persistent prediction history and
//! generated insights. Exposed through the `gridsight` CLI and an embedded
//! web dashboard.

pub mod analytics;
pub mod cli;
pub mod client;
pub mod config;
pub mod filter;
pub mod history;
pub mod llm;
pub mod store;
pub mod web;
pub mod workflow;
