use std::ops::Range;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::design_matrix::DesignMatrix;

const DEFAULT_MAX_ITERS: usize = 5000;
const LR_START: f64 = 0.5;
const GRAD_TOL: f64 = 1e-6;

/// Anything that turns a design matrix into one coefficient per column, in column order.
pub trait ChoiceEstimator {
    fn fit(&self, matrix: &DesignMatrix) -> Result<FitResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub coefficients: Vec<f64>,
    pub log_likelihood: f64,
    pub null_log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FitMetrics {
    pub matches: usize,
    pub log_loss: f64,
    pub accuracy: f64,
}

/// Conditional (multinomial) logit fitted by full-batch gradient ascent from zeros.
#[derive(Debug, Clone, Copy)]
pub struct ConditionalLogit {
    pub max_iters: usize,
    pub tolerance: f64,
}

impl Default for ConditionalLogit {
    fn default() -> Self {
        Self {
            max_iters: DEFAULT_MAX_ITERS,
            tolerance: GRAD_TOL,
        }
    }
}

impl ConditionalLogit {
    pub fn with_max_iters(max_iters: usize) -> Self {
        Self {
            max_iters: max_iters.max(1),
            ..Self::default()
        }
    }
}

impl ChoiceEstimator for ConditionalLogit {
    fn fit(&self, matrix: &DesignMatrix) -> Result<FitResult> {
        let groups = checked_groups(matrix)?;
        let n_cols = matrix.n_cols();
        let scale = 1.0 / groups.len() as f64;

        let mut coeffs = vec![0.0; n_cols];
        let (null_ll, mut grad) = log_likelihood_and_gradient(matrix, &groups, &coeffs);
        let mut ll = null_ll;
        let mut lr = LR_START;
        let mut iterations = 0usize;
        let mut converged = false;

        while iterations < self.max_iters {
            iterations += 1;
            let max_grad = grad.iter().fold(0.0_f64, |m, g| m.max((g * scale).abs()));
            if max_grad < self.tolerance {
                converged = true;
                break;
            }

            let candidate: Vec<f64> = coeffs
                .iter()
                .zip(&grad)
                .map(|(b, g)| b + lr * g * scale)
                .collect();
            let (cand_ll, cand_grad) = log_likelihood_and_gradient(matrix, &groups, &candidate);
            if !cand_ll.is_finite() {
                return Err(anyhow!("log-likelihood diverged at iteration {iterations}"));
            }
            if cand_ll >= ll {
                coeffs = candidate;
                ll = cand_ll;
                grad = cand_grad;
                lr *= 1.1;
            } else {
                lr *= 0.5;
                if lr < 1e-12 {
                    warn!(iterations, "step size collapsed before convergence");
                    break;
                }
            }
            if iterations % 500 == 0 {
                debug!(iterations, log_likelihood = ll, lr, "conditional logit progress");
            }
        }

        info!(
            iterations,
            converged,
            log_likelihood = ll,
            null_log_likelihood = null_ll,
            "conditional logit fitted"
        );
        Ok(FitResult {
            coefficients: coeffs,
            log_likelihood: ll,
            null_log_likelihood: null_ll,
            iterations,
            converged,
        })
    }
}

fn checked_groups(matrix: &DesignMatrix) -> Result<Vec<Range<usize>>> {
    if matrix.n_rows() == 0 {
        return Err(anyhow!("design matrix has no rows"));
    }
    if matrix.values.len() != matrix.n_rows() * matrix.n_cols() {
        return Err(anyhow!(
            "design matrix holds {} values for {}x{}",
            matrix.values.len(),
            matrix.n_rows(),
            matrix.n_cols()
        ));
    }
    let groups = matrix.match_groups();
    for group in &groups {
        let chosen: u32 = matrix.response[group.clone()]
            .iter()
            .map(|y| u32::from(*y))
            .sum();
        if chosen != 1 {
            return Err(anyhow!(
                "match {} has {} chosen alternatives",
                matrix.match_ids[group.start],
                chosen
            ));
        }
    }
    Ok(groups)
}

fn utilities(matrix: &DesignMatrix, group: &Range<usize>, coeffs: &[f64]) -> Vec<f64> {
    group
        .clone()
        .map(|r| dot(matrix.row(r), coeffs))
        .collect()
}

/// Per-alternative choice probabilities for one match, numerically stabilised.
fn choice_probs(utilities: &[f64]) -> Vec<f64> {
    let mx = utilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = utilities.iter().map(|u| (u - mx).exp()).collect();
    let den: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / den).collect()
}

fn log_likelihood_and_gradient(
    matrix: &DesignMatrix,
    groups: &[Range<usize>],
    coeffs: &[f64],
) -> (f64, Vec<f64>) {
    let mut ll = 0.0;
    let mut grad = vec![0.0; coeffs.len()];
    for group in groups {
        let u = utilities(matrix, group, coeffs);
        let p = choice_probs(&u);
        for (offset, r) in group.clone().enumerate() {
            let y = f64::from(matrix.response[r]);
            if y > 0.0 {
                ll += p[offset].max(1e-300).ln();
            }
            let resid = y - p[offset];
            if resid != 0.0 {
                for (g, x) in grad.iter_mut().zip(matrix.row(r)) {
                    *g += resid * x;
                }
            }
        }
    }
    (ll, grad)
}

/// In-sample quality of a coefficient vector: mean log-loss of the winner and how often
/// the highest-utility alternative won.
pub fn evaluate_fit(matrix: &DesignMatrix, coeffs: &[f64]) -> Result<FitMetrics> {
    if coeffs.len() != matrix.n_cols() {
        return Err(anyhow!(
            "{} coefficients for {} design columns",
            coeffs.len(),
            matrix.n_cols()
        ));
    }
    let groups = checked_groups(matrix)?;
    let mut log_loss = 0.0;
    let mut correct = 0usize;
    for group in &groups {
        let p = choice_probs(&utilities(matrix, group, coeffs));
        let Some(chosen) = matrix.response[group.clone()].iter().position(|y| *y == 1) else {
            continue;
        };
        log_loss += -p[chosen].clamp(1e-12, 1.0).ln();
        let best = p
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx);
        if best == Some(chosen) {
            correct += 1;
        }
    }
    let n = groups.len() as f64;
    Ok(FitMetrics {
        matches: groups.len(),
        log_loss: log_loss / n,
        accuracy: correct as f64 / n,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design_matrix::{DesignColumn, Feature};

    // Two alternatives per match, one column: x = 1 for the first seat, 0 otherwise.
    fn toy_matrix(first_wins: usize, second_wins: usize) -> DesignMatrix {
        let mut values = Vec::new();
        let mut response = Vec::new();
        let mut match_ids = Vec::new();
        let mut alternatives = Vec::new();
        for m in 0..(first_wins + second_wins) {
            let first = m < first_wins;
            values.extend([1.0, 0.0]);
            response.extend([u8::from(first), u8::from(!first)]);
            match_ids.extend([m as u64, m as u64]);
            alternatives.extend([1, 2]);
        }
        DesignMatrix {
            baseline: 2,
            columns: vec![DesignColumn {
                feature: Feature::Asc,
                pirate: 1,
                name: "ASC_1_Dan".to_string(),
            }],
            values,
            response,
            match_ids,
            alternatives,
        }
    }

    #[test]
    fn recovers_log_odds_of_binary_choice() {
        let matrix = toy_matrix(30, 10);
        let fit = ConditionalLogit::default().fit(&matrix).unwrap();
        assert!(fit.converged);
        assert!((fit.coefficients[0] - 3.0f64.ln()).abs() < 1e-4);
        assert!(fit.log_likelihood > fit.null_log_likelihood);
        assert!((fit.null_log_likelihood - 40.0 * 0.5f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn balanced_data_stays_at_zero() {
        let fit = ConditionalLogit::default().fit(&toy_matrix(5, 5)).unwrap();
        assert!(fit.converged);
        assert!(fit.coefficients[0].abs() < 1e-9);
    }

    #[test]
    fn rejects_matches_without_single_winner() {
        let mut matrix = toy_matrix(2, 2);
        matrix.response[0] = 0;
        assert!(ConditionalLogit::default().fit(&matrix).is_err());

        let empty = toy_matrix(0, 0);
        assert!(ConditionalLogit::default().fit(&empty).is_err());
    }

    #[test]
    fn metrics_reflect_coefficients() {
        let matrix = toy_matrix(3, 1);
        let m = evaluate_fit(&matrix, &[2.0]).unwrap();
        assert_eq!(m.matches, 4);
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!(evaluate_fit(&matrix, &[1.0, 2.0]).is_err());
    }
}
