//! Cleaning and derived profitability metrics.
//!
//! [`clean_data`] takes the aggregated summary and returns a new table:
//! `Volume` coerced to float, missing values filled with zero, text columns
//! trimmed, and four derived metric columns appended. The input table is
//! left untouched.

use crate::error::{PipelineError, PipelineResult};
use crate::table::{display_value, value_as_f64, Table};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived columns appended by the cleaner, in order.
pub const DERIVED_COLUMNS: [&str; 4] = [
    "GrossProfit",
    "ProfitMargin",
    "StockTurnover",
    "SalesToPurchaseRatio",
];

const VOLUME: &str = "Volume";
const TRIMMED_COLUMNS: [&str; 2] = ["VendorName", "Description"];
const SALES_DOLLARS: &str = "TotalSalesDollars";
const PURCHASE_DOLLARS: &str = "TotalPurchaseDollars";
const SALES_QUANTITY: &str = "TotalSalesQuantity";
const PURCHASE_QUANTITY: &str = "TotalPurchaseQuantity";

/// What a ratio becomes when its denominator is zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ZeroDenominator {
    /// Write 0.0
    #[default]
    Zero,
    /// Write NULL
    Null,
}

impl fmt::Display for ZeroDenominator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroDenominator::Zero => write!(f, "zero"),
            ZeroDenominator::Null => write!(f, "null"),
        }
    }
}

impl ZeroDenominator {
    /// `numerator / denominator`, or the policy fallback when the result
    /// would not be a finite number.
    pub fn ratio(self, numerator: f64, denominator: f64) -> Value {
        let result = numerator / denominator;
        if denominator != 0.0 && result.is_finite() {
            Value::Real(result)
        } else {
            match self {
                ZeroDenominator::Zero => Value::Real(0.0),
                ZeroDenominator::Null => Value::Null,
            }
        }
    }
}

/// Column positions the cleaner works with, resolved once per table.
struct Columns {
    volume: usize,
    trimmed: [usize; 2],
    sales_dollars: usize,
    purchase_dollars: usize,
    sales_quantity: usize,
    purchase_quantity: usize,
}

impl Columns {
    fn resolve(table: &Table) -> PipelineResult<Self> {
        let find = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| PipelineError::missing_column(name))
        };

        Ok(Self {
            volume: find(VOLUME)?,
            trimmed: [find(TRIMMED_COLUMNS[0])?, find(TRIMMED_COLUMNS[1])?],
            sales_dollars: find(SALES_DOLLARS)?,
            purchase_dollars: find(PURCHASE_DOLLARS)?,
            sales_quantity: find(SALES_QUANTITY)?,
            purchase_quantity: find(PURCHASE_QUANTITY)?,
        })
    }
}

/// Clean the aggregated summary and append the derived metrics.
pub fn clean_data(table: &Table, policy: ZeroDenominator) -> PipelineResult<Table> {
    let cols = Columns::resolve(table)?;

    let mut cleaned = Table::new(
        table
            .columns()
            .iter()
            .map(String::as_str)
            .chain(DERIVED_COLUMNS),
    );

    for (row_idx, row) in table.rows().iter().enumerate() {
        let mut values = row.clone();

        values[cols.volume] = to_float(&values[cols.volume], row_idx)?;

        for (idx, value) in values.iter_mut().enumerate() {
            if *value == Value::Null {
                *value = if idx == cols.volume {
                    Value::Real(0.0)
                } else {
                    Value::Integer(0)
                };
            }
        }

        for idx in cols.trimmed {
            if let Value::Text(text) = &mut values[idx] {
                *text = text.trim().to_string();
            }
        }

        let number = |idx: usize| numeric(&values[idx], &table.columns()[idx], row_idx);
        let sales_dollars = number(cols.sales_dollars)?;
        let purchase_dollars = number(cols.purchase_dollars)?;
        let sales_quantity = number(cols.sales_quantity)?;
        let purchase_quantity = number(cols.purchase_quantity)?;

        let gross_profit = sales_dollars - purchase_dollars;
        let derived = [
            Value::Real(gross_profit),
            match policy.ratio(gross_profit, sales_dollars) {
                Value::Real(margin) => Value::Real(margin * 100.0),
                other => other,
            },
            policy.ratio(sales_quantity, purchase_quantity),
            policy.ratio(sales_dollars, purchase_dollars),
        ];

        values.extend(derived);
        cleaned.push_row(values);
    }

    Ok(cleaned)
}

/// Coerce a `Volume` cell to a float. NULL stays NULL for the fill pass.
fn to_float(value: &Value, row: usize) -> PipelineResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Text(text) if text.trim().is_empty() => Ok(Value::Null),
        other => value_as_f64(other).map(Value::Real).ok_or_else(|| {
            PipelineError::Schema(format!(
                "column `{}` row {}: cannot convert {:?} to float",
                VOLUME,
                row,
                display_value(other)
            ))
        }),
    }
}

fn numeric(value: &Value, column: &str, row: usize) -> PipelineResult<f64> {
    value_as_f64(value).ok_or_else(|| {
        PipelineError::Schema(format!(
            "column `{}` row {}: expected a number, found {:?}",
            column,
            row,
            display_value(value)
        ))
    })
}
