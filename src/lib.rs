//! Month-over-month KPI engine for the business-unit dashboard.
//!
//! The crate loads two CSV tables once ([`loader`]), slices them by month
//! and key ([`selector`]), aggregates KPI values ([`kpi`]) and assembles the
//! dashboard tabs ([`dashboard`]). Rendering is left to the caller; the
//! bundled binary prints markdown tables and exports JSON/CSV ([`output`]).
pub mod config;
pub mod dashboard;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod selector;
pub mod types;
pub mod util;
