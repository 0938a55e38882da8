use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use foodclub_logit::affinity::AffinityTables;
use foodclub_logit::config::{PipelineConfig, init_logging};
use foodclub_logit::history;

/// Turn raw round files into the sorted wide history table.
#[derive(Parser)]
#[command(name = "build_history")]
struct Cli {
    /// Directory of raw round JSON files (searched recursively)
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Output CSV path
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let cfg = PipelineConfig::from_env()?;
    let raw_dir = cli.raw_dir.unwrap_or_else(|| cfg.raw_dir.clone());
    let out = cli.out.unwrap_or_else(|| cfg.history_path());

    let summary = history::build_history_file(&raw_dir, &out, AffinityTables::standard())?;
    println!("History written: {}", summary.path.display());
    println!("Rounds read: {}", summary.rounds_read);
    println!("Arenas: {}", summary.rows);
    println!("SHA-256: {}", summary.digest);
    Ok(())
}
