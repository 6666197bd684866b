//! Nutrition targets: per-nutrient bounds and minimize weights.
//!
//! A [`NutritionTarget`] is a vector of per-nutrient `(min, max)` bounds —
//! either side may be absent, never both — plus optional minimize weights
//! (e.g. "prefer less sodium"). It is immutable once constructed and shared
//! by reference across every recipe solve of a mining run.
//!
//! Bound comparisons throughout the core use [`less_or_close`], a tolerant
//! comparator in the numpy-isclose style, so a solution sitting exactly on
//! a bound is not rejected by floating-point noise.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Absolute tolerance for bound comparisons.
pub const ABS_TOLERANCE: f64 = 1e-8;

/// Relative tolerance for bound comparisons.
pub const REL_TOLERANCE: f64 = 1e-5;

/// `a < b`, or close enough to `b` that the difference is numeric noise.
pub fn less_or_close(a: f64, b: f64) -> bool {
    a < b || (a - b).abs() <= ABS_TOLERANCE + REL_TOLERANCE * b.abs()
}

/// Bounds on a single nutrient. At least one side must be present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientBounds {
    /// Minimum required amount, if any.
    pub min: Option<f64>,
    /// Maximum allowed amount, if any.
    pub max: Option<f64>,
}

impl NutrientBounds {
    /// A nutrient with only a lower bound.
    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    /// A nutrient with only an upper bound.
    pub fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    /// A nutrient bounded on both sides.
    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.min.is_none() && self.max.is_none() {
            return Err(CoreError::construction(format!(
                "nutrient {index} has neither a min nor a max bound; \
                 an unconstrained nutrient is meaningless to track"
            )));
        }
        for (side, value) in [("min", self.min), ("max", self.max)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(CoreError::construction(format!(
                        "nutrient {index} {side} bound must be finite and >= 0, got {v}"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(CoreError::construction(format!(
                    "nutrient {index} has min {min} > max {max}"
                )));
            }
        }
        Ok(())
    }

    /// Single-point stand-in used by the relaxed solver.
    ///
    /// Midpoint when both bounds are present. With only one bound present
    /// the multiplier leans away from the unconstrained side: `1.1 * min`
    /// when only a minimum exists, `0.5 * max` when only a maximum does.
    pub fn pseudo_target(&self) -> f64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => (min + max) / 2.0,
            (Some(min), None) => 1.1 * min,
            (None, Some(max)) => 0.5 * max,
            (None, None) => unreachable!("rejected at construction"),
        }
    }

    /// Whether `total` satisfies both sides, tolerantly.
    pub fn satisfied_by(&self, total: f64) -> bool {
        let min_ok = self.min.map_or(true, |min| less_or_close(min, total));
        let max_ok = self.max.map_or(true, |max| less_or_close(total, max));
        min_ok && max_ok
    }
}

/// The nutrition envelope a recipe should satisfy.
///
/// Nutrient order here is the canonical column order: food tables handed to
/// the core must match it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionTarget {
    bounds: Vec<NutrientBounds>,
    minimize: Vec<f64>,
}

impl NutritionTarget {
    /// Construct a target with no minimize weights.
    pub fn new(bounds: Vec<NutrientBounds>) -> Result<Self> {
        let n = bounds.len();
        Self::with_minimize(bounds, vec![0.0; n])
    }

    /// Construct a target with per-nutrient minimize weights.
    ///
    /// `minimize[i]` is the weight for nutrient `i`; `0.0` means the
    /// nutrient is not minimized. Positive weights require a min bound on
    /// that nutrient (otherwise minimization is unbounded below). Weights
    /// are normalized to sum to 1.
    pub fn with_minimize(bounds: Vec<NutrientBounds>, minimize: Vec<f64>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(CoreError::construction("nutrition target has no nutrients"));
        }
        if minimize.len() != bounds.len() {
            return Err(CoreError::construction(format!(
                "minimize weights length {} != nutrient count {}",
                minimize.len(),
                bounds.len()
            )));
        }
        for (i, b) in bounds.iter().enumerate() {
            b.validate(i)?;
        }
        for (i, &w) in minimize.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(CoreError::construction(format!(
                    "minimize weight for nutrient {i} must be finite and >= 0, got {w}"
                )));
            }
            if w > 0.0 && w <= ABS_TOLERANCE {
                return Err(CoreError::construction(format!(
                    "minimize weight for nutrient {i} is indistinguishable from 0: {w}"
                )));
            }
            if w > 0.0 && bounds[i].min.is_none() {
                return Err(CoreError::construction(format!(
                    "nutrient {i} has a minimize weight but no min bound; \
                     minimization would be unbounded"
                )));
            }
        }
        let sum: f64 = minimize.iter().sum();
        let minimize = if sum > 0.0 {
            minimize.iter().map(|w| w / sum).collect()
        } else {
            minimize
        };
        Ok(Self { bounds, minimize })
    }

    /// Number of nutrients tracked.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Always false: an empty target is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Bounds for nutrient `i`.
    pub fn bounds(&self, i: usize) -> &NutrientBounds {
        &self.bounds[i]
    }

    /// All bounds, in canonical column order.
    pub fn all_bounds(&self) -> &[NutrientBounds] {
        &self.bounds
    }

    /// Normalized minimize weight for nutrient `i` (0.0 if not minimized).
    pub fn minimize_weight(&self, i: usize) -> f64 {
        self.minimize[i]
    }

    /// Whether any minimize weights are configured.
    pub fn has_minimize_weights(&self) -> bool {
        self.minimize.iter().any(|&w| w > 0.0)
    }

    /// Pseudo-target for nutrient `i`.
    pub fn pseudo_target(&self, i: usize) -> f64 {
        self.bounds[i].pseudo_target()
    }

    /// Whether per-nutrient `totals` satisfy every bound, tolerantly.
    ///
    /// `totals` must align with the canonical nutrient order.
    pub fn satisfied_by(&self, totals: &[f64]) -> bool {
        debug_assert_eq!(totals.len(), self.bounds.len());
        self.bounds
            .iter()
            .zip(totals)
            .all(|(b, &total)| b.satisfied_by(total))
    }

    /// The same target expressed on the pseudo-target basis.
    ///
    /// Each nutrient's bounds are divided by its pseudo-target, so that a
    /// total of 1.0 corresponds to hitting the pseudo-target exactly. Pairs
    /// with [`NormalizedFoodTable`](crate::foods::NormalizedFoodTable).
    pub fn normalized(&self) -> Self {
        let bounds = self
            .bounds
            .iter()
            .map(|b| {
                let scale = b.pseudo_target().max(ABS_TOLERANCE);
                NutrientBounds {
                    min: b.min.map(|v| v / scale),
                    max: b.max.map(|v| v / scale),
                }
            })
            .collect();
        Self { bounds, minimize: self.minimize.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_less_or_close() {
        assert!(less_or_close(1.0, 2.0));
        assert!(less_or_close(2.0, 2.0));
        // Just above, within relative tolerance.
        assert!(less_or_close(2.0 + 1e-9, 2.0));
        assert!(!less_or_close(2.1, 2.0));
        // Absolute tolerance near zero.
        assert!(less_or_close(1e-9, 0.0));
    }

    #[test]
    fn test_bounds_require_at_least_one_side() {
        let err = NutritionTarget::new(vec![NutrientBounds { min: None, max: None }]);
        assert!(err.is_err());
    }

    #[test]
    fn test_min_greater_than_max_rejected() {
        let err = NutritionTarget::new(vec![NutrientBounds::between(5.0, 2.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn test_pseudo_targets() {
        assert_eq!(NutrientBounds::between(2.0, 4.0).pseudo_target(), 3.0);
        assert!((NutrientBounds::at_least(10.0).pseudo_target() - 11.0).abs() < 1e-12);
        assert!((NutrientBounds::at_most(10.0).pseudo_target() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_minimize_weights_normalized() {
        let target = NutritionTarget::with_minimize(
            vec![NutrientBounds::at_least(1.0), NutrientBounds::at_least(2.0)],
            vec![1.0, 3.0],
        )
        .unwrap();
        assert!((target.minimize_weight(0) - 0.25).abs() < 1e-12);
        assert!((target.minimize_weight(1) - 0.75).abs() < 1e-12);
        assert!(target.has_minimize_weights());
    }

    #[test]
    fn test_minimize_weight_without_min_bound_rejected() {
        let err = NutritionTarget::with_minimize(
            vec![NutrientBounds::at_most(5.0)],
            vec![1.0],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_satisfied_by() {
        let target = NutritionTarget::new(vec![
            NutrientBounds::between(1.0, 3.0),
            NutrientBounds::at_least(2.0),
        ])
        .unwrap();
        assert!(target.satisfied_by(&[2.0, 5.0]));
        assert!(target.satisfied_by(&[3.0, 2.0])); // exactly on bounds
        assert!(!target.satisfied_by(&[4.0, 5.0]));
        assert!(!target.satisfied_by(&[2.0, 1.0]));
    }

    #[test]
    fn test_normalized_scales_bounds() {
        let target = NutritionTarget::new(vec![NutrientBounds::between(2.0, 4.0)]).unwrap();
        let normalized = target.normalized();
        // pseudo-target 3.0 becomes the unit.
        let b = normalized.bounds(0);
        assert!((b.min.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((b.max.unwrap() - 4.0 / 3.0).abs() < 1e-12);
        assert!((normalized.pseudo_target(0) - 1.0).abs() < 1e-12);
    }
}
