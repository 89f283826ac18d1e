//! Command-line interface argument parsing.
//!
//! Every flag is optional: with no arguments the tool reads `inventory.db`,
//! rebuilds `vendor_sales_summary` and appends to the default log file.

use crate::clean::ZeroDenominator;
use clap::Parser;
use std::path::PathBuf;

/// vendor-summary - per-vendor, per-brand sales summary builder
///
/// Aggregates purchases, sales and freight from an inventory database,
/// derives profitability metrics, and rewrites the summary table.
///
/// Examples:
///   vendor-summary
///   vendor-summary --database data/inventory.db --table vendor_sales_summary
///   vendor-summary --dry-run --export summary.json
///   vendor-summary --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the SQLite inventory database
    ///
    /// Defaults to inventory.db, or the value in .vendor-summary.toml.
    #[arg(long, value_name = "PATH", env = "VENDOR_SUMMARY_DB")]
    pub database: Option<PathBuf>,

    /// Destination table, fully replaced on every run
    #[arg(long, value_name = "NAME")]
    pub table: Option<String>,

    /// Append-only log file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .vendor-summary.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Value written for ratios whose denominator is zero
    #[arg(long, value_name = "POLICY")]
    pub zero_denominator: Option<ZeroDenominator>,

    /// Also write the cleaned summary as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Aggregate and clean, but do not write the destination table
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .vendor-summary.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref table) = self.table {
            crate::load::validate_table_name(table).map_err(|e| e.to_string())?;
        }

        if let Some(ref database) = self.database {
            if database.is_dir() {
                return Err(format!(
                    "Database path is a directory: {}",
                    database.display()
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("vendor-summary").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_arguments_is_valid() {
        let args = parse(&[]);
        assert!(args.table.is_none());
        assert!(args.zero_denominator.is_none());
        assert!(!args.dry_run);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["--verbose", "--quiet"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_table() {
        let args = parse(&["--table", "vendor sales"]);
        assert!(args.validate().is_err());

        let args = parse(&["--table", "vendor_sales_v2"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_denominator_values() {
        let args = parse(&["--zero-denominator", "null"]);
        assert_eq!(args.zero_denominator, Some(ZeroDenominator::Null));
        assert!(Args::try_parse_from(["vendor-summary", "--zero-denominator", "nan"]).is_err());
    }
}
