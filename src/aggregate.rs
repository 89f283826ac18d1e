//! Vendor/brand aggregation over the inventory source tables.
//!
//! Three grouped aggregates (freight, purchases, sales) are defined once as
//! CTE bodies. Each can be run on its own, and the combined summary query
//! inner-joins them into one row per (vendor, brand).

use crate::db::query_table;
use crate::error::PipelineResult;
use crate::table::Table;
use rusqlite::Connection;
use tracing::debug;

/// Freight cost per vendor.
const FREIGHT_SUMMARY: &str = "
    SELECT VendorNumber,
           SUM(Freight) AS FreightCost
    FROM vendor_invoice
    GROUP BY VendorNumber";

/// Purchases per vendor/brand, priced against `purchase_prices`.
/// Lines with a non-positive purchase price are dropped here.
///
/// Grouped on (vendor, brand) only. Descriptive columns that can vary
/// between purchase lines take their MAX, and PurchasePrice is the highest
/// unit price paid, so a pair bought at several prices is still one row.
const PURCHASE_SUMMARY: &str = "
    SELECT p.VendorNumber,
           MAX(p.VendorName) AS VendorName,
           p.Brand,
           MAX(p.Description) AS Description,
           MAX(p.PurchasePrice) AS PurchasePrice,
           MAX(pp.Price) AS ActualPrice,
           MAX(pp.Volume) AS Volume,
           SUM(p.Quantity) AS TotalPurchaseQuantity,
           SUM(p.Dollars) AS TotalPurchaseDollars
    FROM purchases p
    JOIN purchase_prices pp
        ON p.Brand = pp.Brand
    WHERE p.PurchasePrice > 0
    GROUP BY p.VendorNumber, p.Brand";

/// Sales per vendor/brand.
const SALES_SUMMARY: &str = "
    SELECT VendorNo,
           Brand,
           SUM(SalesDollars) AS TotalSalesDollars,
           SUM(SalesPrice) AS TotalSalesPrice,
           SUM(SalesQuantity) AS TotalSalesQuantity,
           SUM(ExciseTax) AS TotalExciseTax
    FROM sales
    GROUP BY VendorNo, Brand";

/// Output columns of [`create_vendor_summary`], in order.
pub const SUMMARY_COLUMNS: [&str; 14] = [
    "VendorNumber",
    "VendorName",
    "Brand",
    "Description",
    "PurchasePrice",
    "ActualPrice",
    "Volume",
    "TotalPurchaseQuantity",
    "TotalPurchaseDollars",
    "TotalSalesDollars",
    "TotalSalesPrice",
    "TotalSalesQuantity",
    "TotalExciseTax",
    "FreightCost",
];

/// The combined query: purchases inner-joined to sales on (vendor, brand)
/// and to freight on vendor, largest purchase spend first.
pub fn vendor_summary_sql() -> String {
    format!(
        "WITH FreightSummary AS ({freight}
        ),
        PurchaseSummary AS ({purchase}
        ),
        SalesSummary AS ({sales}
        )
        SELECT ps.VendorNumber,
               ps.VendorName,
               ps.Brand,
               ps.Description,
               ps.PurchasePrice,
               ps.ActualPrice,
               ps.Volume,
               ps.TotalPurchaseQuantity,
               ps.TotalPurchaseDollars,
               ss.TotalSalesDollars,
               ss.TotalSalesPrice,
               ss.TotalSalesQuantity,
               ss.TotalExciseTax,
               fs.FreightCost
        FROM PurchaseSummary ps
        JOIN SalesSummary ss
            ON ps.VendorNumber = ss.VendorNo
           AND ps.Brand = ss.Brand
        JOIN FreightSummary fs
            ON ps.VendorNumber = fs.VendorNumber
        ORDER BY ps.TotalPurchaseDollars DESC, ps.VendorNumber, ps.Brand",
        freight = FREIGHT_SUMMARY,
        purchase = PURCHASE_SUMMARY,
        sales = SALES_SUMMARY,
    )
}

/// Build the vendor sales summary: one row per (vendor, brand) present in
/// purchases, sales and freight alike.
pub fn create_vendor_summary(conn: &Connection) -> PipelineResult<Table> {
    let table = query_table(conn, &vendor_summary_sql(), "vendor summary")?;
    debug!(
        "Aggregated {} vendor/brand rows across {} columns",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Freight aggregate alone, ordered by vendor.
pub fn freight_summary(conn: &Connection) -> PipelineResult<Table> {
    let sql = format!("{} ORDER BY VendorNumber", FREIGHT_SUMMARY);
    query_table(conn, &sql, "freight summary")
}

/// Purchase aggregate alone, ordered by vendor then brand.
pub fn purchase_summary(conn: &Connection) -> PipelineResult<Table> {
    let sql = format!("{} ORDER BY p.VendorNumber, p.Brand", PURCHASE_SUMMARY);
    query_table(conn, &sql, "purchase summary")
}

/// Sales aggregate alone, ordered by vendor then brand.
pub fn sales_summary(conn: &Connection) -> PipelineResult<Table> {
    let sql = format!("{} ORDER BY VendorNo, Brand", SALES_SUMMARY);
    query_table(conn, &sql, "sales summary")
}
