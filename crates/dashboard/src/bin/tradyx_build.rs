//! Dashboard builder.
//!
//! Reads the spot/VIX snapshot, the raw option chain and the daily market
//! series, runs every engine and writes the dashboard document.
//!
//! Usage:
//!   cargo run --bin tradyx-build -- --output data/dashboard.json

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tradyx_core::Config;
use tradyx_dashboard::{Pipeline, Snapshots};

#[derive(Parser, Debug)]
#[command(name = "tradyx-build")]
#[command(about = "Build the options dashboard document from market snapshots")]
struct Args {
    /// Spot / VIX snapshot
    #[arg(long, default_value = "data/yf.json")]
    yf: PathBuf,

    /// Raw option chain (optional; skipped when the file does not exist)
    #[arg(long, default_value = "data/chain_raw.json")]
    chain: PathBuf,

    /// Daily OHLC, VIX and sector series
    #[arg(long, default_value = "data/prediction_data.json")]
    predictions: PathBuf,

    /// Output dashboard document
    #[arg(long, default_value = "data/dashboard.json")]
    output: PathBuf,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::level_filters::LevelFilter::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_json(&read(path)?)
            .with_context(|| format!("parsing config {}", path.display()))?,
        None => Config::default(),
    };

    let spot_json = read(&args.yf)?;
    let chain_json = read_optional(&args.chain)?;
    if chain_json.is_none() {
        info!("No option chain at {:?}", args.chain);
    }
    // Missing market data degrades every series indicator, it does not stop the run
    let market_json = read_optional(&args.predictions)?.unwrap_or_else(|| "{}".to_string());

    let snapshots = Snapshots::from_json(
        &spot_json,
        chain_json.as_deref(),
        &market_json,
        Utc::now().naive_utc(),
    )
    .context("decoding spot snapshot")?;

    let payload = match Pipeline::new(&config).run(&snapshots) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Dashboard not written");
            return Err(e.into());
        }
    };

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = payload.to_json_pretty()?;
    fs::write(&args.output, &json)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        path = %args.output.display(),
        bytes = json.len(),
        updated_at = %payload.updated_at,
        spot = payload.spot,
        vix = ?payload.vix,
        "Dashboard written"
    );
    Ok(())
}
