use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::affinity::{PIRATE_COUNT, pirate_index};
use crate::design_matrix::{DesignSpec, Feature};
use crate::error::DatasetError;
use crate::estimator::FitResult;

const ARTIFACT_VERSION: u32 = 1;

/// Fitted coefficients regrouped per feature, each table indexed by pirate id - 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTables {
    pub baseline: u8,
    pub intercepts: [f64; PIRATE_COUNT],
    pub pfa: [f64; PIRATE_COUNT],
    pub nfa: [f64; PIRATE_COUNT],
    pub is_pos2: [f64; PIRATE_COUNT],
    pub is_pos3: [f64; PIRATE_COUNT],
    pub is_pos4: [f64; PIRATE_COUNT],
}

pub fn table_name(feature: Feature) -> &'static str {
    match feature {
        Feature::Asc => "LOGIT_INTERCEPTS",
        Feature::Pfa => "LOGIT_PFA",
        Feature::Nfa => "LOGIT_NFA",
        Feature::IsPos2 => "LOGIT_IS_POS2",
        Feature::IsPos3 => "LOGIT_IS_POS3",
        Feature::IsPos4 => "LOGIT_IS_POS4",
    }
}

impl CoefficientTables {
    /// Maps a flat vector in design-column order back onto per-pirate tables. The
    /// baseline pirate's intercept is not in the vector and comes out as exactly 0.0.
    pub fn from_flat(coeffs: &[f64], spec: &DesignSpec) -> Result<Self, DatasetError> {
        let columns = spec.columns();
        if coeffs.len() != columns.len() {
            return Err(DatasetError::CoefficientCount {
                expected: columns.len(),
                found: coeffs.len(),
            });
        }

        let mut out = Self {
            baseline: spec.baseline(),
            intercepts: [0.0; PIRATE_COUNT],
            pfa: [0.0; PIRATE_COUNT],
            nfa: [0.0; PIRATE_COUNT],
            is_pos2: [0.0; PIRATE_COUNT],
            is_pos3: [0.0; PIRATE_COUNT],
            is_pos4: [0.0; PIRATE_COUNT],
        };
        for (column, value) in columns.iter().zip(coeffs) {
            let idx = pirate_index(column.pirate)?;
            out.table_mut(column.feature)[idx] = *value;
        }
        Ok(out)
    }

    pub fn table(&self, feature: Feature) -> &[f64; PIRATE_COUNT] {
        match feature {
            Feature::Asc => &self.intercepts,
            Feature::Pfa => &self.pfa,
            Feature::Nfa => &self.nfa,
            Feature::IsPos2 => &self.is_pos2,
            Feature::IsPos3 => &self.is_pos3,
            Feature::IsPos4 => &self.is_pos4,
        }
    }

    fn table_mut(&mut self, feature: Feature) -> &mut [f64; PIRATE_COUNT] {
        match feature {
            Feature::Asc => &mut self.intercepts,
            Feature::Pfa => &mut self.pfa,
            Feature::Nfa => &mut self.nfa,
            Feature::IsPos2 => &mut self.is_pos2,
            Feature::IsPos3 => &mut self.is_pos3,
            Feature::IsPos4 => &mut self.is_pos4,
        }
    }

    /// The six tables in output order, with their declaration names.
    pub fn named_tables(&self) -> [(&'static str, &[f64; PIRATE_COUNT]); 6] {
        Feature::ALL.map(|feature| (table_name(feature), self.table(feature)))
    }
}

/// On-disk hand-off between an estimator and the renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCoefficients {
    pub version: u32,
    pub generated_at: String,
    pub baseline: u8,
    pub column_names: Vec<String>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub log_likelihood: Option<f64>,
    #[serde(default)]
    pub null_log_likelihood: Option<f64>,
    #[serde(default)]
    pub converged: Option<bool>,
}

impl FittedCoefficients {
    pub fn from_fit(fit: &FitResult, spec: &DesignSpec) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            baseline: spec.baseline(),
            column_names: spec.columns().into_iter().map(|c| c.name).collect(),
            coefficients: fit.coefficients.clone(),
            log_likelihood: Some(fit.log_likelihood),
            null_log_likelihood: Some(fit.null_log_likelihood),
            converged: Some(fit.converged),
        }
    }

    /// Rebuilds the tables, refusing vectors whose column names disagree with the
    /// layout implied by the recorded baseline.
    pub fn to_tables(&self) -> Result<CoefficientTables> {
        let spec = DesignSpec::new(self.baseline)?;
        let expected = spec.columns();
        if !self.column_names.is_empty() {
            if self.column_names.len() != expected.len() {
                return Err(DatasetError::CoefficientCount {
                    expected: expected.len(),
                    found: self.column_names.len(),
                }
                .into());
            }
            if let Some((idx, (got, want))) = self
                .column_names
                .iter()
                .zip(&expected)
                .enumerate()
                .find(|(_, (got, want))| **got != want.name)
            {
                return Err(anyhow!(
                    "coefficient column {idx} is `{got}`, expected `{}`",
                    want.name
                ));
            }
        }
        Ok(CoefficientTables::from_flat(&self.coefficients, &spec)?)
    }
}

pub fn save_coefficients(path: &Path, fitted: &FittedCoefficients) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(fitted).context("serialize coefficients")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn load_coefficients(path: &Path) -> Result<FittedCoefficients> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
