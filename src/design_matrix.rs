use std::collections::HashMap;
use std::io::Write;
use std::ops::Range;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::affinity::{PIRATE_COUNT, pirate_ids, pirate_index, pirate_name};
use crate::error::DatasetError;
use crate::long_format::LongFormatRow;

/// The pirate whose intercept is pinned at zero for identifiability.
pub const DEFAULT_BASELINE_PIRATE: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Asc,
    Pfa,
    Nfa,
    IsPos2,
    IsPos3,
    IsPos4,
}

impl Feature {
    /// Block order of the flattened coefficient vector.
    pub const ALL: [Feature; 6] = [
        Feature::Asc,
        Feature::Pfa,
        Feature::Nfa,
        Feature::IsPos2,
        Feature::IsPos3,
        Feature::IsPos4,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Feature::Asc => "ASC",
            Feature::Pfa => "PFA",
            Feature::Nfa => "NFA",
            Feature::IsPos2 => "is_pos2",
            Feature::IsPos3 => "is_pos3",
            Feature::IsPos4 => "is_pos4",
        }
    }

    pub fn base_value(self, row: &LongFormatRow) -> f64 {
        match self {
            Feature::Asc => 1.0,
            Feature::Pfa => f64::from(row.pfa),
            Feature::Nfa => f64::from(row.nfa),
            Feature::IsPos2 => f64::from(row.is_pos2),
            Feature::IsPos3 => f64::from(row.is_pos3),
            Feature::IsPos4 => f64::from(row.is_pos4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignColumn {
    pub feature: Feature,
    pub pirate: u8,
    pub name: String,
}

/// Which (feature, pirate) interactions exist. Only the intercept block drops the
/// baseline pirate; every other block spans all 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignSpec {
    baseline: u8,
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE_PIRATE,
        }
    }
}

impl DesignSpec {
    pub fn new(baseline: u8) -> Result<Self, DatasetError> {
        pirate_index(baseline)?;
        Ok(Self { baseline })
    }

    pub fn baseline(&self) -> u8 {
        self.baseline
    }

    pub fn pirates_for(&self, feature: Feature) -> Vec<u8> {
        match feature {
            Feature::Asc => pirate_ids().filter(|p| *p != self.baseline).collect(),
            _ => pirate_ids().collect(),
        }
    }

    pub fn column_count(&self) -> usize {
        Feature::ALL.len() * PIRATE_COUNT - 1
    }

    pub fn columns(&self) -> Vec<DesignColumn> {
        let mut out = Vec::with_capacity(self.column_count());
        for feature in Feature::ALL {
            for pirate in self.pirates_for(feature) {
                let label = pirate_name(pirate).unwrap_or("Unknown");
                out.push(DesignColumn {
                    feature,
                    pirate,
                    name: format!("{}_{}_{}", feature.prefix(), pirate, label),
                });
            }
        }
        out
    }

    fn column_index(&self) -> HashMap<(Feature, u8), usize> {
        self.columns()
            .into_iter()
            .enumerate()
            .map(|(idx, col)| ((col.feature, col.pirate), idx))
            .collect()
    }
}

/// Dense row-major design matrix plus the vectors a conditional-logit estimator needs.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub baseline: u8,
    pub columns: Vec<DesignColumn>,
    pub values: Vec<f64>,
    pub response: Vec<u8>,
    pub match_ids: Vec<u64>,
    /// Alternative axis: the pirate occupying the row's seat.
    pub alternatives: Vec<u8>,
}

impl DesignMatrix {
    pub fn n_rows(&self) -> usize {
        self.response.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let cols = self.n_cols();
        &self.values[idx * cols..(idx + 1) * cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols() + col]
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Row ranges sharing a match id. Rows of one match are contiguous by construction.
    pub fn match_groups(&self) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        let mut start = 0usize;
        for idx in 1..=self.match_ids.len() {
            if idx == self.match_ids.len() || self.match_ids[idx] != self.match_ids[start] {
                out.push(start..idx);
                start = idx;
            }
        }
        out
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec![
            "match_id".to_string(),
            "alternative".to_string(),
            "win".to_string(),
        ];
        header.extend(self.column_names());
        csv.write_record(&header).context("write design header")?;

        for idx in 0..self.n_rows() {
            let mut record = Vec::with_capacity(self.n_cols() + 3);
            record.push(self.match_ids[idx].to_string());
            record.push(self.alternatives[idx].to_string());
            record.push(self.response[idx].to_string());
            record.extend(self.row(idx).iter().map(|v| v.to_string()));
            csv.write_record(&record)
                .with_context(|| format!("write design row {idx}"))?;
        }
        csv.flush().context("flush design csv")?;
        Ok(())
    }
}

/// Expands long-format rows into per-pirate interaction columns. Each value is
/// `feature(row) * [row.pirate == column.pirate]`, laid out in `spec.columns()` order.
pub fn build_design_matrix(
    rows: &[LongFormatRow],
    spec: &DesignSpec,
) -> Result<DesignMatrix, DatasetError> {
    let columns = spec.columns();
    let index = spec.column_index();
    let n_cols = columns.len();

    let mut values = vec![0.0; rows.len() * n_cols];
    let mut response = Vec::with_capacity(rows.len());
    let mut match_ids = Vec::with_capacity(rows.len());
    let mut alternatives = Vec::with_capacity(rows.len());

    for (r, row) in rows.iter().enumerate() {
        pirate_index(row.pirate)?;
        let dest = &mut values[r * n_cols..(r + 1) * n_cols];
        for feature in Feature::ALL {
            // The baseline pirate has no intercept column; its ASC block stays zero.
            if let Some(col) = index.get(&(feature, row.pirate)) {
                dest[*col] = feature.base_value(row);
            }
        }
        response.push(row.win);
        match_ids.push(row.match_id);
        alternatives.push(row.pirate);
    }

    Ok(DesignMatrix {
        baseline: spec.baseline(),
        columns,
        values,
        response,
        match_ids,
        alternatives,
    })
}
