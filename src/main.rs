//! vendor-summary - per-vendor, per-brand sales summary builder
//!
//! Aggregates purchases, sales and freight from a SQLite inventory database,
//! derives profitability metrics, and rewrites the `vendor_sales_summary`
//! table. Progress is appended to a log file.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (arguments, config, connection, query, schema, load)

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info};
use vendor_summary::cli::Args;
use vendor_summary::config::{self, Config};
use vendor_summary::pipeline::{self, PipelineOptions};
use vendor_summary::report::{self, VendorTotals};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let subscriber = match init_logging(&config.logging.file, config.log_level()) {
        Ok(subscriber) => subscriber,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // The subscriber lives for this run only; nothing is installed globally
    let exit_code = tracing::subscriber::with_default(subscriber, || {
        info!("vendor-summary v{}", env!("CARGO_PKG_VERSION"));
        debug!("Arguments: {:?}", args);
        match config_source {
            Some(ref path) => info!("Loaded config from {}", path),
            None => debug!("No config file found, using defaults"),
        }

        match run(&args, &config) {
            Ok(()) => 0,
            Err(e) => {
                error!("Run failed: {:#}", e);
                eprintln!("\n❌ Error: {:#}", e);
                1
            }
        }
    });

    std::process::exit(exit_code);
}

/// Handle --init-config: generate a default .vendor-summary.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Load configuration from file or use defaults, then apply CLI overrides.
///
/// Also returns where the config came from, for logging once the
/// subscriber exists.
fn load_config(args: &Args) -> Result<(Config, Option<String>)> {
    let (mut config, source) = if let Some(ref config_path) = args.config {
        (
            Config::load(config_path)?,
            Some(config_path.display().to_string()),
        )
    } else {
        match Config::load_default()? {
            Some(loaded) => (loaded, Some(config::DEFAULT_CONFIG_FILE.to_string())),
            None => (Config::default(), None),
        }
    };

    config.merge_with_args(args);
    Ok((config, source))
}

/// Build the file logger: timestamped lines appended to `path`, no colors.
fn init_logging(
    path: &Path,
    level: tracing::Level,
) -> Result<impl tracing::Subscriber + Send + Sync + 'static> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let subscriber = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    Ok(subscriber)
}

/// Run the pipeline and report the outcome.
fn run(args: &Args, config: &Config) -> Result<()> {
    let options = PipelineOptions {
        table: config.output.table.clone(),
        zero_denominator: config.metrics.zero_denominator,
        dry_run: args.dry_run,
        show_progress: !args.quiet,
    };
    debug!("Zero-denominator policy: {}", options.zero_denominator);

    if !args.quiet {
        println!(
            "📦 Building {} from {}",
            options.table,
            config.database.path.display()
        );
    }

    let output = pipeline::execute(&config.database.path, &options).map_err(|e| {
        error!("{}: {}", e.kind(), e);
        e
    })?;

    if let Some(ref export) = config.output.export {
        report::write_json_export(&output.table, &output.summary, export)?;
        info!("Exported summary to {}", export.display());
        if !args.quiet {
            println!("💾 Exported summary to {}", export.display());
        }
    }

    if !args.quiet {
        let totals = VendorTotals::from_table(&output.table);
        println!(
            "\n📊 Vendor Summary:\n{}",
            report::generate_summary_text(&output.summary, &totals)
        );
        println!("\n✅ Done.");
    }

    Ok(())
}
