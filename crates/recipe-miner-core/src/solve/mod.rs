//! Scoring a candidate food set against the nutrition target.
//!
//! `solve` is the single entry point the mining loop calls for every
//! recipe. Two strategies exist:
//!
//! - an exact feasibility search ([`feasible`]) that only succeeds when
//!   every bound of the target is met, optionally with whole-unit amounts;
//! - a relaxed weighted non-negative least-squares fit ([`nnls`]) toward
//!   per-nutrient pseudo-targets, which always produces amounts and a
//!   finite score.
//!
//! Infeasibility is an expected outcome, not an error: it yields
//! `solved == false` with the relaxed score. Which strategies run is a
//! [`SolverPolicy`](crate::config::SolverPolicy) decision.

pub mod feasible;
pub mod nnls;

use crate::config::{SolverConfig, SolverPolicy};
use crate::nutrition::NutritionTarget;

/// Scalar fitness of a solve attempt.
///
/// Totally ordered: any solved score beats any unsolved one; within a
/// class, higher `subscore` is better. `subscore` is never NaN.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    /// True only when an exact solution meeting every bound exists.
    pub solved: bool,
    /// Comparable sub-score; higher is better, never NaN.
    pub subscore: f64,
}

impl Score {
    /// Score of a totally infeasible solve: unsolved and worse than any
    /// other score.
    pub fn worst() -> Self {
        Self { solved: false, subscore: f64::NEG_INFINITY }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.solved
            .cmp(&other.solved)
            .then_with(|| self.subscore.total_cmp(&other.subscore))
    }
}

/// Result of scoring one candidate food set.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub score: Score,
    /// Food amounts aligned with the input rows; `None` only when even the
    /// relaxed solve could not produce values.
    pub amounts: Option<Vec<f64>>,
}

/// Compute a best-effort blend of `food_rows` toward `target`.
///
/// `food_rows[j]` is the nutrient row of food `j`, in the target's
/// canonical column order (caller contract; lengths are debug-asserted).
pub fn solve(target: &NutritionTarget, food_rows: &[&[f64]], config: &SolverConfig) -> SolverOutcome {
    debug_assert!(!food_rows.is_empty());
    debug_assert!(food_rows.iter().all(|r| r.len() == target.len()));

    let relaxed = nnls::solve_relaxed(target, food_rows);

    if config.policy == SolverPolicy::ExactThenRelaxed {
        if let Some((subscore, amounts)) =
            feasible::solve_exact(target, food_rows, config, &relaxed.amounts)
        {
            return SolverOutcome {
                score: Score { solved: true, subscore },
                amounts: Some(amounts),
            };
        }
    }

    SolverOutcome {
        score: Score { solved: false, subscore: relaxed.subscore },
        amounts: Some(relaxed.amounts),
    }
}
