//! Loader Service - Loads the country GDP reference dataset into the countries database
//!
//! Responsibilities:
//! - Read the delimited source file (UTF-8, optional BOM, header row)
//! - Upsert continents, countries, and years as dimension rows
//! - Link countries to continents
//! - Upsert GDP-per-capita facts classified into pre-seeded GDP categories
//!
//! Stages run in a fixed order; every write commits on its own. Re-running
//! the loader over the same file leaves the database unchanged.
//!
//! Usage:
//!   cargo run --bin loader
//!   cargo run --bin loader -- --file data/gapminder.csv --dry-run

mod source;
mod stages;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use source::{read_source, SourceRecord};
use stages::{run_pipeline, LoadReport, Stage};
use store::{MemoryStore, PgStore};

// =============================================================================
// CONFIGURATION
// =============================================================================

pub const DEFAULT_DATA_FILE: &str = "data.csv";

#[derive(Parser, Debug, Default)]
#[command(name = "loader", about = "Loads country GDP reference data into the countries database")]
pub struct Args {
    /// Source file to load (overrides DATA_FILE)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Field delimiter, a single ASCII character (overrides CSV_DELIMITER)
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Dry run - load into memory only, nothing saved to database
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Print the load report as JSON
    #[arg(long, default_value = "false")]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_url: Option<String>,
    pub data_file: PathBuf,
    pub delimiter: u8,
    pub dry_run: bool,
    pub json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let delimiter = match lookup("CSV_DELIMITER") {
            Some(raw) => parse_delimiter(&raw).context("Invalid CSV_DELIMITER")?,
            None => b',',
        };

        Ok(Self {
            db_url: lookup("DB_URL"),
            data_file: PathBuf::from(
                lookup("DATA_FILE").unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
            ),
            delimiter,
            dry_run: false,
            json: false,
        })
    }

    /// Flags take precedence over the environment
    pub fn apply_args(mut self, args: &Args) -> Result<Self> {
        if let Some(file) = &args.file {
            self.data_file = file.clone();
        }
        if let Some(raw) = &args.delimiter {
            self.delimiter = parse_delimiter(raw).context("Invalid --delimiter")?;
        }
        self.dry_run = args.dry_run;
        self.json = args.json;
        Ok(self)
    }

    pub fn db_url(&self) -> Result<&str> {
        self.db_url.as_deref().context("DB_URL env var missing")
    }
}

/// Accepts one ASCII character, or the escape `\t` for tab
fn parse_delimiter(raw: &str) -> Result<u8> {
    if raw == "\\t" {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => anyhow::bail!("delimiter must be a single ASCII character, got {:?}", raw),
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?.apply_args(&args)?;

    println!("=== Country GDP Loader ===");
    println!("Source file: {}", config.data_file.display());
    println!("Mode: {}", if config.dry_run { "dry-run" } else { "live" });

    let records = read_source(&config.data_file, config.delimiter).await?;
    info!(records = records.len(), "Read source file");

    let report = if config.dry_run {
        dry_run(&config, &records).await?
    } else {
        let mut store = PgStore::connect(config.db_url()?).await?;
        let result = run_pipeline(&mut store, &records).await;
        store.close().await;
        result?
    };

    print_report(&config, &report)?;
    Ok(())
}

/// Run every stage against memory. GDP ranges are read from the database
/// when DB_URL is set, otherwise every metric is left uncategorized.
async fn dry_run(config: &Config, records: &[SourceRecord]) -> Result<LoadReport> {
    let gdp_categories = match config.db_url.as_deref() {
        Some(db_url) => {
            let pg = PgStore::connect(db_url).await?;
            let categories = pg.gdp_categories().await;
            pg.close().await;
            categories?
        }
        None => {
            warn!("DB_URL not set, dry run has no GDP categories");
            Vec::new()
        }
    };

    let mut store = MemoryStore::with_gdp_categories(gdp_categories);
    let report = run_pipeline(&mut store, records).await?;
    println!("\nDry run - nothing saved to database");
    Ok(report)
}

// =============================================================================
// REPORT OUTPUT
// =============================================================================

fn print_report(config: &Config, report: &LoadReport) -> Result<()> {
    if config.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n=== Load Complete ===");
    for line in report.summary_lines() {
        println!("{}", line);
    }

    let skipped = report.total_skipped();
    if skipped > 0 {
        warn!(skipped, "Records skipped on missing dimension rows");
    }
    if let Some(metrics) = report.stage(Stage::EconomicMetrics) {
        if metrics.uncategorized > 0 {
            warn!(
                uncategorized = metrics.uncategorized,
                "Metrics stored without a GDP category"
            );
        }
    }
    Ok(())
}
