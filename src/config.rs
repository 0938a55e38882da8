use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::design_matrix::{DEFAULT_BASELINE_PIRATE, DesignSpec};
use crate::error::DatasetError;

const DEFAULT_RAW_DIR: &str = "raw_json";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_CDN_URL: &str = "https://cdn.neofood.club";
const DEFAULT_FETCH_LIMIT: u32 = 90;
const DEFAULT_MAX_ITERS: usize = 5000;

pub const HISTORY_FILE: &str = "history.csv";
pub const COEFFICIENTS_FILE: &str = "coefficients.json";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cdn_url: String,
    pub fetch_limit: u32,
    pub baseline_pirate: u8,
    pub max_iters: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cdn_url: DEFAULT_CDN_URL.to_string(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            baseline_pirate: DEFAULT_BASELINE_PIRATE,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }
}

impl PipelineConfig {
    /// Reads `FOODCLUB_*` variables; call `dotenvy::dotenv()` first to pick up `.env`.
    /// Unset or blank variables fall back to defaults; unparsable ones are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_dir = var("FOODCLUB_RAW_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.raw_dir);
        let output_dir = var("FOODCLUB_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let cdn_url = var("FOODCLUB_CDN_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.cdn_url);
        let fetch_limit = parse_var::<u32>("FOODCLUB_FETCH_LIMIT", var("FOODCLUB_FETCH_LIMIT"))?
            .unwrap_or(DEFAULT_FETCH_LIMIT)
            .clamp(1, 1000);
        let baseline_pirate =
            parse_var::<u8>("FOODCLUB_BASELINE_PIRATE", var("FOODCLUB_BASELINE_PIRATE"))?
                .unwrap_or(DEFAULT_BASELINE_PIRATE);
        DesignSpec::new(baseline_pirate)
            .with_context(|| format!("FOODCLUB_BASELINE_PIRATE={baseline_pirate}"))?;
        let max_iters = parse_var::<usize>("FOODCLUB_MAX_ITERS", var("FOODCLUB_MAX_ITERS"))?
            .unwrap_or(DEFAULT_MAX_ITERS)
            .max(1);

        Ok(Self {
            raw_dir,
            output_dir,
            cdn_url,
            fetch_limit,
            baseline_pirate,
            max_iters,
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join(HISTORY_FILE)
    }

    pub fn coefficients_path(&self) -> PathBuf {
        self.output_dir.join(COEFFICIENTS_FILE)
    }

    pub fn design_spec(&self) -> Result<DesignSpec, DatasetError> {
        DesignSpec::new(self.baseline_pirate)
    }
}

fn parse_var<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|v| {
        v.parse::<T>()
            .with_context(|| format!("{key} is not a valid number: {v:?}"))
    })
    .transpose()
}

/// Installs the fmt subscriber used by every binary. `RUST_LOG` overrides the default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_output_dir() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.history_path(), PathBuf::from("output/history.csv"));
        assert_eq!(cfg.coefficients_path(), PathBuf::from("output/coefficients.json"));
        assert_eq!(cfg.design_spec().unwrap().baseline(), 15);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            ("FOODCLUB_OUTPUT_DIR", " out "),
            ("FOODCLUB_CDN_URL", "https://example.test/"),
            ("FOODCLUB_FETCH_LIMIT", "5000"),
            ("FOODCLUB_BASELINE_PIRATE", "3"),
            ("FOODCLUB_MAX_ITERS", ""),
        ]))
        .unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.raw_dir, PathBuf::from("raw_json"));
        assert_eq!(cfg.cdn_url, "https://example.test");
        assert_eq!(cfg.fetch_limit, 1000);
        assert_eq!(cfg.baseline_pirate, 3);
        assert_eq!(cfg.max_iters, 5000);
    }

    #[test]
    fn unparsable_numbers_are_errors() {
        for (key, value) in [
            ("FOODCLUB_BASELINE_PIRATE", "abc"),
            ("FOODCLUB_BASELINE_PIRATE", "300"),
            ("FOODCLUB_FETCH_LIMIT", "-1"),
            ("FOODCLUB_MAX_ITERS", "lots"),
        ] {
            let err = PipelineConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains(key), "{key}={value}: {err}");
        }
    }

    #[test]
    fn out_of_range_baseline_is_rejected_at_load() {
        let err = PipelineConfig::from_lookup(lookup(&[("FOODCLUB_BASELINE_PIRATE", "21")]))
            .unwrap_err();
        assert!(err.to_string().contains("FOODCLUB_BASELINE_PIRATE"));
    }

    #[test]
    fn invalid_baseline_surfaces_when_used() {
        let cfg = PipelineConfig {
            baseline_pirate: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.design_spec(), Err(DatasetError::InvalidPirate(0)));
    }
}
