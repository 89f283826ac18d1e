//! Database connection handling.
//!
//! The pipeline holds a single SQLite connection for the whole run. It is
//! read by the aggregator and written by the loader, then dropped.

use crate::error::{PipelineError, PipelineResult};
use crate::table::Table;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

/// Open an existing inventory database for reading and writing.
///
/// The file must already exist; a missing database is a connection error
/// rather than a silently created empty file.
pub fn open(path: &Path) -> PipelineResult<Connection> {
    debug!("Opening database: {}", path.display());

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
    )
    .map_err(|source| PipelineError::Connection {
        path: path.display().to_string(),
        source,
    })
}

/// Run a read query and collect every row into a [`Table`].
///
/// Column names come from the statement, in select-list order.
pub fn query_table(conn: &Connection, sql: &str, stage: &'static str) -> PipelineResult<Table> {
    let query_err = |source| PipelineError::Query { stage, source };

    let mut stmt = conn.prepare(sql).map_err(query_err)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut table = Table::new(columns);

    let mut rows = stmt.query([]).map_err(query_err)?;
    while let Some(row) = rows.next().map_err(query_err)? {
        let values = (0..width)
            .map(|i| row.get::<_, Value>(i))
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;
        table.push_row(values);
    }

    debug!("{} query returned {} rows", stage, table.len());
    Ok(table)
}

/// Source-table fixtures shared by the module tests.
#[cfg(test)]
pub mod fixtures {
    use rusqlite::{params, Connection};

    /// Source schema as it appears in the inventory database. `Volume` is
    /// stored as text there, which is why the cleaner coerces it.
    pub const SOURCE_SCHEMA: &str = "
        CREATE TABLE vendor_invoice (VendorNumber INTEGER, Freight REAL);
        CREATE TABLE purchases (
            VendorNumber INTEGER, VendorName TEXT, Brand TEXT, Description TEXT,
            PurchasePrice REAL, Quantity INTEGER, Dollars REAL
        );
        CREATE TABLE purchase_prices (Brand TEXT, Price REAL, Volume TEXT);
        CREATE TABLE sales (
            VendorNo INTEGER, Brand TEXT, SalesDollars REAL, SalesPrice REAL,
            SalesQuantity INTEGER, ExciseTax REAL
        );
    ";

    /// Fresh in-memory database with empty source tables.
    pub fn empty_inventory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SOURCE_SCHEMA).unwrap();
        conn
    }

    #[allow(clippy::too_many_arguments)]
    pub fn purchase(
        conn: &Connection,
        vendor: i64,
        name: &str,
        brand: &str,
        description: &str,
        price: f64,
        quantity: i64,
        dollars: f64,
    ) {
        conn.execute(
            "INSERT INTO purchases VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![vendor, name, brand, description, price, quantity, dollars],
        )
        .unwrap();
    }

    pub fn price(conn: &Connection, brand: &str, price: f64, volume: &str) {
        conn.execute(
            "INSERT INTO purchase_prices VALUES (?1, ?2, ?3)",
            params![brand, price, volume],
        )
        .unwrap();
    }

    pub fn sale(
        conn: &Connection,
        vendor: i64,
        brand: &str,
        dollars: f64,
        price: f64,
        quantity: i64,
        excise: f64,
    ) {
        conn.execute(
            "INSERT INTO sales VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![vendor, brand, dollars, price, quantity, excise],
        )
        .unwrap();
    }

    pub fn invoice(conn: &Connection, vendor: i64, freight: f64) {
        conn.execute(
            "INSERT INTO vendor_invoice VALUES (?1, ?2)",
            params![vendor, freight],
        )
        .unwrap();
    }

    /// The single-vendor scenario: vendor 1, brand "A", every fact present.
    pub fn single_vendor_inventory() -> Connection {
        let conn = empty_inventory();
        purchase(&conn, 1, "ACME SPIRITS  ", "A", " Gin 750mL", 5.0, 10, 50.0);
        price(&conn, "A", 6.0, "750");
        sale(&conn, 1, "A", 80.0, 8.0, 10, 1.0);
        invoice(&conn, 1, 20.0);
        conn
    }
}
