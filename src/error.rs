//! Pipeline error taxonomy.
//!
//! Every stage returns a [`PipelineError`]. No stage recovers from an error
//! raised by another; the driver surfaces it and the run ends.

use thiserror::Error;

/// Errors raised by the summary pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The database could not be opened.
    #[error("failed to open database {path}: {source}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The aggregation query failed (missing table/column, bad SQL, closed connection).
    #[error("{stage} query failed: {source}")]
    Query {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// The cleaning stage found a column it needs missing or unusable.
    #[error("schema error: {0}")]
    Schema(String),

    /// Writing the destination table failed.
    #[error("failed to load table {table}: {reason}")]
    Load { table: String, reason: String },
}

impl PipelineError {
    /// Schema error for a column the cleaner expects but the table lacks.
    pub fn missing_column(column: &str) -> Self {
        PipelineError::Schema(format!("expected column `{}` is absent", column))
    }

    pub fn load(table: &str, reason: impl ToString) -> Self {
        PipelineError::Load {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short stage name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Connection { .. } => "ConnectionError",
            PipelineError::Query { .. } => "QueryError",
            PipelineError::Schema(_) => "SchemaError",
            PipelineError::Load { .. } => "LoadError",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
