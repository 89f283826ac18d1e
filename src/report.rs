//! End-of-run reporting.
//!
//! Builds the terminal summary printed after a run and the optional JSON
//! export of the cleaned vendor summary.

use crate::pipeline::RunSummary;
use crate::table::{value_as_f64, Table};
use anyhow::{Context, Result};
use rusqlite::types::Value;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Vendors listed in the "top vendors" section.
const TOP_VENDORS: usize = 5;

/// Totals across the cleaned summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VendorTotals {
    pub rows: usize,
    pub vendors: usize,
    pub total_sales_dollars: f64,
    pub total_purchase_dollars: f64,
    pub total_freight_cost: f64,
    pub gross_profit: f64,
    /// Vendors with the highest gross profit, best first.
    pub top_vendors: Vec<(String, f64)>,
}

impl VendorTotals {
    /// Sum the cleaned summary. Columns that are absent count as zero.
    pub fn from_table(table: &Table) -> Self {
        let column_sum = |name: &str| -> f64 {
            table
                .column_index(name)
                .map(|idx| {
                    table
                        .rows()
                        .iter()
                        .filter_map(|row| value_as_f64(&row[idx]))
                        .sum()
                })
                .unwrap_or(0.0)
        };

        let mut by_vendor: HashMap<String, f64> = HashMap::new();
        if let (Some(name_idx), Some(profit_idx)) = (
            table.column_index("VendorName"),
            table.column_index("GrossProfit"),
        ) {
            for row in table.rows() {
                let name = match &row[name_idx] {
                    Value::Text(s) => s.clone(),
                    other => crate::table::display_value(other),
                };
                *by_vendor.entry(name).or_default() +=
                    value_as_f64(&row[profit_idx]).unwrap_or(0.0);
            }
        }

        let vendors = by_vendor.len();
        let mut top_vendors: Vec<(String, f64)> = by_vendor.into_iter().collect();
        top_vendors.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        top_vendors.truncate(TOP_VENDORS);

        Self {
            rows: table.len(),
            vendors,
            total_sales_dollars: column_sum("TotalSalesDollars"),
            total_purchase_dollars: column_sum("TotalPurchaseDollars"),
            total_freight_cost: column_sum("FreightCost"),
            gross_profit: column_sum("GrossProfit"),
            top_vendors,
        }
    }
}

/// Generate the text summary printed at the end of a run.
pub fn generate_summary_text(run: &RunSummary, totals: &VendorTotals) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Run started: {}",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!("Vendor/brand rows: {}", totals.rows));
    lines.push(format!("Vendors: {}", totals.vendors));
    lines.push(format!("Total sales: {:.2}", totals.total_sales_dollars));
    lines.push(format!(
        "Total purchases: {:.2}",
        totals.total_purchase_dollars
    ));
    lines.push(format!("Total freight: {:.2}", totals.total_freight_cost));
    lines.push(format!("Gross profit: {:.2}", totals.gross_profit));

    if !totals.top_vendors.is_empty() {
        lines.push(String::new());
        lines.push("Top vendors by gross profit:".to_string());
        for (i, (vendor, profit)) in totals.top_vendors.iter().enumerate() {
            lines.push(format!("  {}. {} ({:.2})", i + 1, vendor, profit));
        }
    }

    lines.push(String::new());
    match run.rows_written {
        Some(rows) => lines.push(format!("Wrote {} rows to {}", rows, run.destination)),
        None => lines.push(format!("Dry run: {} was not modified", run.destination)),
    }
    lines.push(format!("Duration: {:.1}s", run.duration_seconds));

    lines.join("\n")
}

#[derive(Serialize)]
struct JsonExport<'a> {
    run: &'a RunSummary,
    totals: VendorTotals,
    columns: &'a [String],
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Generate a JSON export of the cleaned summary, one object per row.
pub fn generate_json_export(table: &Table, run: &RunSummary) -> Result<String> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = table
        .rows()
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().map(json_value))
                .collect()
        })
        .collect();

    let export = JsonExport {
        run,
        totals: VendorTotals::from_table(table),
        columns: table.columns(),
        rows,
    };

    serde_json::to_string_pretty(&export).map_err(Into::into)
}

/// Write the JSON export, creating parent directories as needed.
pub fn write_json_export(table: &Table, run: &RunSummary, path: &Path) -> Result<()> {
    let content = generate_json_export(table, run)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    Ok(())
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        // Non-finite floats have no JSON form
        Value::Real(r) => serde_json::Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cleaned() -> Table {
        let mut table = Table::new([
            "VendorName",
            "Brand",
            "TotalPurchaseDollars",
            "TotalSalesDollars",
            "FreightCost",
            "GrossProfit",
        ]);
        for (vendor, brand, purchases, sales, freight) in [
            ("ACME", "A", 50.0, 80.0, 20.0),
            ("ACME", "B", 10.0, 15.0, 20.0),
            ("BRIGHT", "C", 40.0, 30.0, 5.0),
            ("CASK", "D", 5.0, 45.0, 1.0),
        ] {
            table.push_row(vec![
                Value::Text(vendor.into()),
                Value::Text(brand.into()),
                Value::Real(purchases),
                Value::Real(sales),
                Value::Real(freight),
                Value::Real(sales - purchases),
            ]);
        }
        table
    }

    fn run_summary(rows_written: Option<usize>) -> RunSummary {
        RunSummary {
            started_at: Utc::now(),
            destination: "vendor_sales_summary".to_string(),
            aggregated_rows: 4,
            cleaned_rows: 4,
            rows_written,
            duration_seconds: 0.5,
        }
    }

    #[test]
    fn test_totals() {
        let totals = VendorTotals::from_table(&cleaned());

        assert_eq!(totals.rows, 4);
        assert_eq!(totals.vendors, 3);
        assert_eq!(totals.total_sales_dollars, 170.0);
        assert_eq!(totals.total_purchase_dollars, 105.0);
        assert_eq!(totals.gross_profit, 65.0);
        assert_eq!(totals.top_vendors[0], ("CASK".to_string(), 40.0));
        assert_eq!(totals.top_vendors[1], ("ACME".to_string(), 35.0));
        assert_eq!(totals.top_vendors[2], ("BRIGHT".to_string(), -10.0));
    }

    #[test]
    fn test_totals_empty_table() {
        let totals = VendorTotals::from_table(&Table::new(["VendorName"]));
        assert_eq!(totals.rows, 0);
        assert!(totals.top_vendors.is_empty());
        assert_eq!(totals.gross_profit, 0.0);
    }

    #[test]
    fn test_summary_text() {
        let table = cleaned();
        let totals = VendorTotals::from_table(&table);
        let text = generate_summary_text(&run_summary(Some(4)), &totals);

        assert!(text.contains("Vendor/brand rows: 4"));
        assert!(text.contains("Gross profit: 65.00"));
        assert!(text.contains("1. CASK (40.00)"));
        assert!(text.contains("Wrote 4 rows to vendor_sales_summary"));

        let dry = generate_summary_text(&run_summary(None), &totals);
        assert!(dry.contains("Dry run: vendor_sales_summary was not modified"));
    }

    #[test]
    fn test_json_export() {
        let json = generate_json_export(&cleaned(), &run_summary(Some(4))).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["rows"].as_array().map(|r| r.len()), Some(4));
        assert_eq!(parsed["rows"][0]["VendorName"], "ACME");
        assert_eq!(parsed["rows"][0]["GrossProfit"], 30.0);
        assert_eq!(parsed["run"]["rows_written"], 4);
        assert_eq!(parsed["columns"][5], "GrossProfit");
    }

    #[test]
    fn test_write_json_export_creates_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exports").join("summary.json");

        write_json_export(&cleaned(), &run_summary(None), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"rows_written\": null"));
    }
}
