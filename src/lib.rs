//! Vendor sales summary pipeline.
//!
//! Reads purchases, sales, freight invoices and the price list from a
//! SQLite inventory database and rebuilds one summary row per
//! (vendor, brand):
//!
//! 1. [`aggregate`] runs the grouped/joined aggregation query.
//! 2. [`clean`] fills gaps, trims text and derives profitability ratios.
//! 3. [`load`] replaces the destination table with the result.
//!
//! [`pipeline`] runs the three stages in order on a single connection.

pub mod aggregate;
pub mod clean;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod load;
pub mod pipeline;
pub mod report;
pub mod table;

pub use error::{PipelineError, PipelineResult};
pub use table::Table;
