//! Run orchestration: aggregate, clean, load.
//!
//! Stages run strictly in order on one connection. A failing stage ends the
//! run; nothing here retries or recovers.

use crate::aggregate::{create_vendor_summary, purchase_summary};
use crate::clean::{clean_data, ZeroDenominator};
use crate::db;
use crate::error::PipelineResult;
use crate::load::ingest_table;
use crate::table::Table;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rows shown in the debug preview after each stage.
const PREVIEW_ROWS: usize = 5;

/// Options for a single pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Destination table.
    pub table: String,
    /// Ratio value when a denominator is zero.
    pub zero_denominator: ZeroDenominator,
    /// Skip the load stage.
    pub dry_run: bool,
    /// Show a terminal spinner for the current stage.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            table: "vendor_sales_summary".to_string(),
            zero_denominator: ZeroDenominator::default(),
            dry_run: false,
            show_progress: false,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Destination table name.
    pub destination: String,
    /// Rows produced by the aggregation query.
    pub aggregated_rows: usize,
    /// Rows after cleaning (always equal to `aggregated_rows`).
    pub cleaned_rows: usize,
    /// Rows written, or `None` for a dry run.
    pub rows_written: Option<usize>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

/// Result of a run: the summary plus the cleaned table.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub summary: RunSummary,
    pub table: Table,
}

/// Open the database at `path` and run the pipeline against it.
pub fn execute(path: &Path, options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
    let mut conn = db::open(path)?;
    info!("Connected to {}", path.display());
    run(&mut conn, options)
}

/// Run aggregate, clean and load on an open connection.
pub fn run(conn: &mut Connection, options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
    let started_at = Utc::now();
    let start = Instant::now();
    let progress = StageProgress::new(options.show_progress);

    info!("Creating vendor summary table......");
    progress.stage("Aggregating purchases, sales and freight");
    let summary = create_vendor_summary(conn)?;
    debug!("Vendor summary preview:\n{}", summary.head(PREVIEW_ROWS));
    if tracing::enabled!(tracing::Level::DEBUG) {
        excluded_rows(conn, summary.len());
    }

    info!("Cleaning data......");
    progress.stage("Cleaning data and deriving metrics");
    let cleaned = clean_data(&summary, options.zero_denominator)?;
    debug!("Cleaned summary preview:\n{}", cleaned.head(PREVIEW_ROWS));

    let rows_written = if options.dry_run {
        info!("Dry run: skipping load into {}", options.table);
        None
    } else {
        info!("Ingesting data......");
        progress.stage(&format!("Writing {}", options.table));
        Some(ingest_table(&cleaned, &options.table, conn)?)
    };

    progress.finish();
    info!("Complete");

    Ok(PipelineOutput {
        summary: RunSummary {
            started_at,
            destination: options.table.clone(),
            aggregated_rows: summary.len(),
            cleaned_rows: cleaned.len(),
            rows_written,
            duration_seconds: start.elapsed().as_secs_f64(),
        },
        table: cleaned,
    })
}

/// Count purchase summary rows the inner join dropped, for the debug log.
///
/// Diagnostic only: a failing count is logged and never ends the run.
fn excluded_rows(conn: &Connection, aggregated: usize) -> Option<usize> {
    match purchase_summary(conn) {
        Ok(purchases) => {
            let excluded = purchases.len().saturating_sub(aggregated);
            debug!(
                "{} of {} purchase summary rows had no matching sales or freight and were excluded",
                excluded,
                purchases.len()
            );
            Some(excluded)
        }
        Err(e) => {
            warn!("Could not count excluded rows: {}", e);
            None
        }
    }
}

/// Terminal spinner naming the current stage. Inert when disabled.
struct StageProgress {
    bar: Option<ProgressBar>,
}

impl StageProgress {
    fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self { bar }
    }

    fn stage(&self, message: &str) {
        if let Some(ref pb) = self.bar {
            pb.set_message(message.to_string());
        }
    }

    fn finish(&self) {
        if let Some(ref pb) = self.bar {
            pb.finish_and_clear();
        }
    }
}
