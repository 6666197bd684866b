//! Exact solve: constrained feasibility search.
//!
//! Succeeds only when every bound of the target can be met, optionally
//! with whole-unit (integer) amounts. The search is seeded from the
//! relaxed least-squares solution and repaired greedily: while some
//! minimum is unmet, raise the amount of the food contributing most per
//! unit to the worst deficit. Repair is bounded; if bounds still fail
//! afterwards the attempt is abandoned and the caller falls back to the
//! relaxed outcome.

use crate::config::SolverConfig;
use crate::nutrition::{less_or_close, NutritionTarget};

/// Try to find amounts meeting every bound.
///
/// Returns `(subscore, amounts)` on success. The subscore is the negated
/// weighted sum of minimized nutrient totals — the optimization objective
/// once feasibility holds — or, when no minimize weights are configured,
/// the negated squared deviation from the pseudo-targets so solved recipes
/// still order meaningfully.
pub fn solve_exact(
    target: &NutritionTarget,
    food_rows: &[&[f64]],
    config: &SolverConfig,
    seed: &[f64],
) -> Option<(f64, Vec<f64>)> {
    debug_assert_eq!(seed.len(), food_rows.len());

    let mut amounts: Vec<f64> = if config.integer_amounts {
        seed.iter().map(|a| a.round().max(0.0)).collect()
    } else {
        seed.iter().map(|a| a.max(0.0)).collect()
    };

    for _ in 0..config.max_repair_sweeps {
        let totals = totals(food_rows, &amounts, target.len());
        let Some((nutrient, deficit)) = worst_unmet_minimum(target, &totals) else {
            break;
        };

        // Food with the strongest per-unit contribution to the deficit.
        let mut best: Option<(usize, f64)> = None;
        for (j, row) in food_rows.iter().enumerate() {
            let contribution = row[nutrient];
            if contribution > 0.0 && best.map_or(true, |(_, c)| contribution > c) {
                best = Some((j, contribution));
            }
        }
        let (j, contribution) = best?; // no food supplies this nutrient

        let step = if config.integer_amounts {
            (deficit / contribution).ceil().max(1.0)
        } else {
            deficit / contribution
        };
        amounts[j] += step;
    }

    let totals = totals(food_rows, &amounts, target.len());
    if !target.satisfied_by(&totals) {
        return None;
    }

    let subscore = if target.has_minimize_weights() {
        -(0..target.len())
            .map(|i| target.minimize_weight(i) * totals[i])
            .sum::<f64>()
    } else {
        -(0..target.len())
            .map(|i| {
                let d = totals[i] - target.pseudo_target(i);
                d * d
            })
            .sum::<f64>()
    };
    Some((subscore, amounts))
}

fn totals(food_rows: &[&[f64]], amounts: &[f64], nutrients: usize) -> Vec<f64> {
    let mut totals = vec![0.0; nutrients];
    for (row, &amount) in food_rows.iter().zip(amounts) {
        for (i, total) in totals.iter_mut().enumerate() {
            *total += amount * row[i];
        }
    }
    totals
}

/// The nutrient with the largest unmet minimum, if any, with its deficit.
fn worst_unmet_minimum(target: &NutritionTarget, totals: &[f64]) -> Option<(usize, f64)> {
    let mut worst: Option<(usize, f64)> = None;
    for i in 0..target.len() {
        if let Some(min) = target.bounds(i).min {
            if !less_or_close(min, totals[i]) {
                let deficit = min - totals[i];
                if worst.map_or(true, |(_, d)| deficit > d) {
                    worst = Some((i, deficit));
                }
            }
        }
    }
    worst
}
