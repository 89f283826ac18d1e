//! Destination table loading.
//!
//! The loader fully replaces a destination table with the contents of a
//! [`Table`]. Drop, create and insert run in one transaction, so a failed
//! load leaves the previous contents in place, and loading the same table
//! twice leaves the same rows behind.
//!
//! Runs against the same destination must not overlap; the replace is not
//! coordinated between processes beyond SQLite's own locking.

use crate::error::{PipelineError, PipelineResult};
use crate::table::Table;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// Declared SQLite column type, inferred from the values a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Untyped,
    Integer,
    Real,
    Blob,
    Text,
    Mixed,
}

impl ColumnType {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => ColumnType::Untyped,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Real,
            Value::Blob(_) => ColumnType::Blob,
            Value::Text(_) => ColumnType::Text,
        }
    }

    /// Widen two observed kinds. Integer and Real widen to Real; any other
    /// mix (text holding a filled `0`, say) stays untyped so no value is
    /// converted by column affinity.
    fn merge(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Untyped, other) | (other, Untyped) => other,
            (Integer, Real) | (Real, Integer) => Real,
            _ => Mixed,
        }
    }

    fn declaration(self) -> &'static str {
        match self {
            ColumnType::Untyped | ColumnType::Mixed => "",
            ColumnType::Integer => " INTEGER",
            ColumnType::Real => " REAL",
            ColumnType::Blob => " BLOB",
            ColumnType::Text => " TEXT",
        }
    }
}

/// Replace `name` with the rows of `table`. Returns the number of rows written.
pub fn ingest_table(table: &Table, name: &str, conn: &mut Connection) -> PipelineResult<usize> {
    validate_table_name(name)?;
    let load_err = |e: rusqlite::Error| PipelineError::load(name, e);

    let create = create_table_sql(table, name);
    let insert = insert_sql(table, name);
    debug!("Replacing table {} ({} columns)", name, table.columns().len());

    let tx = conn.transaction().map_err(load_err)?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)), [])
        .map_err(load_err)?;
    tx.execute(&create, []).map_err(load_err)?;
    {
        let mut stmt = tx.prepare(&insert).map_err(load_err)?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter())).map_err(load_err)?;
        }
    }
    tx.commit().map_err(load_err)?;

    debug!("Wrote {} rows to {}", table.len(), name);
    Ok(table.len())
}

/// Destination names are plain identifiers: ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn validate_table_name(name: &str) -> PipelineResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(PipelineError::load(
            name,
            "table name must be letters, digits and underscores, not starting with a digit",
        ))
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn create_table_sql(table: &Table, name: &str) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let kind = table
                .rows()
                .iter()
                .map(|row| ColumnType::of(&row[idx]))
                .fold(ColumnType::Untyped, ColumnType::merge);
            format!("{}{}", quote_ident(column), kind.declaration())
        })
        .collect();

    format!("CREATE TABLE {} ({})", quote_ident(name), columns.join(", "))
}

fn insert_sql(table: &Table, name: &str) -> String {
    let columns: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(name),
        columns.join(", "),
        placeholders.join(", ")
    )
}
