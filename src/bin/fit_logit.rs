use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use foodclub_logit::coefficients::{self, FittedCoefficients};
use foodclub_logit::config::{PipelineConfig, init_logging};
use foodclub_logit::design_matrix::build_design_matrix;
use foodclub_logit::estimator::{ChoiceEstimator, ConditionalLogit, evaluate_fit};
use foodclub_logit::history;
use foodclub_logit::long_format::expand_long_format;
use foodclub_logit::render;

/// Fit per-pirate logit coefficients from the history table and render lookup tables.
#[derive(Parser)]
#[command(name = "fit_logit")]
struct Cli {
    /// Wide history CSV produced by build_history
    #[arg(long)]
    history: Option<PathBuf>,

    /// Directory for coefficients.json and the rendered tables
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Skip fitting and render coefficients produced by an external estimator
    #[arg(long)]
    coefficients: Option<PathBuf>,

    /// Also write the design matrix as CSV
    #[arg(long)]
    export_design: Option<PathBuf>,

    /// Pirate whose intercept is fixed at zero
    #[arg(long)]
    baseline: Option<u8>,

    /// Iteration cap for the built-in estimator
    #[arg(long)]
    max_iters: Option<usize>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut cfg = PipelineConfig::from_env()?;
    if let Some(dir) = cli.out_dir {
        cfg.output_dir = dir;
    }
    if let Some(baseline) = cli.baseline {
        cfg.baseline_pirate = baseline;
    }
    if let Some(max_iters) = cli.max_iters {
        cfg.max_iters = max_iters.max(1);
    }

    let fitted = match cli.coefficients {
        Some(path) => coefficients::load_coefficients(&path)?,
        None => {
            let history_path = cli.history.unwrap_or_else(|| cfg.history_path());
            fit_from_history(&cfg, &history_path, cli.export_design.as_deref())?
        }
    };

    let tables = fitted.to_tables()?;
    let written = render::write_rendered(&cfg.output_dir, &tables, &render::default_renderers())?;
    for path in written {
        println!("Created {}", path.display());
    }
    Ok(())
}

fn fit_from_history(
    cfg: &PipelineConfig,
    history_path: &Path,
    export_design: Option<&Path>,
) -> Result<FittedCoefficients> {
    let spec = cfg.design_spec()?;
    let wide = history::load_history(history_path)?;
    let long = expand_long_format(&wide).context("expand long format")?;
    let matrix = build_design_matrix(&long, &spec).context("build design matrix")?;
    info!(
        matches = wide.len(),
        rows = matrix.n_rows(),
        columns = matrix.n_cols(),
        baseline = spec.baseline(),
        "design matrix ready"
    );

    if let Some(path) = export_design {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
        matrix.write_csv(BufWriter::new(file))?;
        info!(path = %path.display(), "design matrix exported");
    }

    let fit = ConditionalLogit::with_max_iters(cfg.max_iters).fit(&matrix)?;
    if !fit.converged {
        warn!(iterations = fit.iterations, "estimator stopped before convergence");
    }
    let metrics = evaluate_fit(&matrix, &fit.coefficients)?;
    info!(
        matches = metrics.matches,
        log_loss = metrics.log_loss,
        accuracy = metrics.accuracy,
        "in-sample fit"
    );

    let fitted = FittedCoefficients::from_fit(&fit, &spec);
    let path = cfg.coefficients_path();
    coefficients::save_coefficients(&path, &fitted)?;
    println!("Coefficients written: {}", path.display());
    Ok(fitted)
}
