use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use foodclub_logit::config::{PipelineConfig, init_logging};
use foodclub_logit::round_fetch;

/// Download finished rounds that are not on disk yet.
#[derive(Parser)]
#[command(name = "grab_rounds")]
struct Cli {
    /// Directory holding one `<round>.json` per round
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// CDN base url
    #[arg(long)]
    cdn_url: Option<String>,

    /// Maximum number of rounds to walk back
    #[arg(long)]
    limit: Option<u32>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let cfg = PipelineConfig::from_env()?;
    let raw_dir = cli.raw_dir.unwrap_or(cfg.raw_dir);
    let cdn_url = cli.cdn_url.unwrap_or(cfg.cdn_url);
    let limit = cli.limit.unwrap_or(cfg.fetch_limit).max(1);

    let summary = round_fetch::grab_missing_rounds(&cdn_url, &raw_dir, limit)?;
    info!(
        current_round = summary.current_round,
        fetched = summary.fetched.len(),
        not_found = summary.not_found.len(),
        dir = %raw_dir.display(),
        "round grab complete"
    );
    Ok(())
}
