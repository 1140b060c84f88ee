//! Trade extraction command line.
//!
//! All needed data files must be local; the network is never used to
//! retrieve missing data, so a run fails hard on a missing archive.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tradeflow_core::ExtractConfig;
use tradeflow_pipeline::{extract_trades, TradeSink};
use tradeflow_storage::{BulkHistoryProvider, BulkSnapshotSource};

/// Infer executed trades for one day of order-book snapshots.
#[derive(Parser)]
#[command(name = "tradeflow", version, about)]
struct Cli {
    /// Compute date, YYYYMMDD
    date: String,

    /// Item order books held in memory per batch (default 200)
    batch_size: Option<usize>,

    /// Directory holding the bulk archive and history files
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Data files are organized in a YYYY/MM/DD tree
    #[arg(long)]
    tree: bool,

    /// JSON configuration file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let date = parse_date(&cli.date)?;
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ExtractConfig::default(),
    };
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }

    let source = BulkSnapshotSource::new(&cli.data_dir, cli.tree);
    let history = BulkHistoryProvider::new(&cli.data_dir, cli.tree);

    let out_name = format!("trades_allregions_{}", date.format("%Y%m%d"));
    let out = File::create(&out_name).with_context(|| format!("creating {out_name}"))?;
    let mut sink = TradeSink::new(BufWriter::new(out));

    extract_trades(date, &source, &history, &mut sink, &config)
        .with_context(|| format!("extracting trades for {date}"))?;
    Ok(())
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .with_context(|| format!("bad date {s:?}, expected YYYYMMDD"))
}

fn load_config(path: &Path) -> anyhow::Result<ExtractConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
