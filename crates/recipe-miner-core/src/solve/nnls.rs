//! Relaxed solve: weighted non-negative least squares.
//!
//! The hard bounds of the target are replaced by single-point
//! pseudo-targets and the blend is fit by `min ||Ax - b||²` subject to
//! `x >= 0`. One design row per nutrient pulls the blend toward its
//! pseudo-target; nutrients with minimize weights get an extra row pulling
//! toward zero. Row weights enter as `sqrt(w)` so the squared objective
//! weighs them linearly; bound rows carry a higher fixed weight than
//! minimize rows.
//!
//! The minimization runs as cyclic coordinate descent on the normal
//! equations: deterministic, no randomness, converges for this convex
//! objective.

use crate::nutrition::NutritionTarget;

/// Weight on pseudo-target rows (hard extrema).
pub const EXTREMA_ROW_WEIGHT: f64 = 3.0;

/// Weight multiplier on minimize rows.
pub const MINIMIZE_ROW_WEIGHT: f64 = 2.0;

const MAX_SWEEPS: usize = 1000;
const CONVERGENCE_TOL: f64 = 1e-12;
const EXACT_FIT_TOL: f64 = 1e-10;

/// Outcome of the relaxed solve. Amounts are always produced.
#[derive(Debug, Clone)]
pub struct RelaxedSolution {
    /// `-residual²`; exactly 0.0 for an exact fit. Never NaN.
    pub subscore: f64,
    pub amounts: Vec<f64>,
}

/// Fit `food_rows` toward the target's pseudo-targets.
pub fn solve_relaxed(target: &NutritionTarget, food_rows: &[&[f64]]) -> RelaxedSolution {
    let (a, b) = assemble_design(target, food_rows);
    let amounts = nnls(&a, &b, food_rows.len());
    let residual_sq = residual_sq(&a, &b, &amounts);
    let subscore = if residual_sq <= EXACT_FIT_TOL { 0.0 } else { -residual_sq };
    RelaxedSolution { subscore, amounts }
}

/// Build the weighted design matrix (rows over equations, columns over
/// foods) and right-hand side.
fn assemble_design(target: &NutritionTarget, food_rows: &[&[f64]]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let n_foods = food_rows.len();
    let mut a = Vec::with_capacity(target.len() * 2);
    let mut b = Vec::with_capacity(target.len() * 2);

    for i in 0..target.len() {
        let w = EXTREMA_ROW_WEIGHT.sqrt();
        let row: Vec<f64> = (0..n_foods).map(|j| w * food_rows[j][i]).collect();
        a.push(row);
        b.push(w * target.pseudo_target(i));
    }
    for i in 0..target.len() {
        let weight = target.minimize_weight(i);
        if weight > 0.0 {
            let w = (MINIMIZE_ROW_WEIGHT * weight).sqrt();
            let row: Vec<f64> = (0..n_foods).map(|j| w * food_rows[j][i]).collect();
            a.push(row);
            b.push(0.0);
        }
    }
    (a, b)
}

/// Cyclic coordinate descent for `min ||Ax - b||²` with `x >= 0`.
fn nnls(a: &[Vec<f64>], b: &[f64], n: usize) -> Vec<f64> {
    // Normal equations: h = AᵀA, g = Aᵀb.
    let mut h = vec![0.0f64; n * n];
    let mut g = vec![0.0f64; n];
    for (row, &rhs) in a.iter().zip(b) {
        for j in 0..n {
            g[j] += row[j] * rhs;
            for k in j..n {
                h[j * n + k] += row[j] * row[k];
            }
        }
    }
    for j in 0..n {
        for k in (j + 1)..n {
            h[k * n + j] = h[j * n + k];
        }
    }

    let mut x = vec![0.0f64; n];
    for _ in 0..MAX_SWEEPS {
        let mut max_delta = 0.0f64;
        for j in 0..n {
            let hjj = h[j * n + j];
            if hjj <= CONVERGENCE_TOL {
                continue; // food contributes nothing to any equation
            }
            let mut dot = 0.0;
            for k in 0..n {
                dot += h[j * n + k] * x[k];
            }
            let candidate = x[j] + (g[j] - dot) / hjj;
            let new = candidate.max(0.0);
            max_delta = max_delta.max((new - x[j]).abs());
            x[j] = new;
        }
        if max_delta < CONVERGENCE_TOL {
            break;
        }
    }
    x
}

fn residual_sq(a: &[Vec<f64>], b: &[f64], x: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(row, &rhs)| {
            let v: f64 = row.iter().zip(x).map(|(c, xi)| c * xi).sum::<f64>() - rhs;
            v * v
        })
        .sum()
}
