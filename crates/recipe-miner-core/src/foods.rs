//! Food tables: the food-by-nutrient numeric matrix the core searches over.
//!
//! Ingestion (database parsing, unit conversion, NaN handling) happens
//! upstream; the core receives a rectangular, NaN-free matrix whose column
//! order matches the [`NutritionTarget`](crate::nutrition::NutritionTarget)
//! nutrient order exactly. [`NormalizedFoodTable`] rescales each column to
//! the pseudo-target basis so Euclidean distances between food rows weigh
//! every nutrient comparably.

use crate::error::{CoreError, Result};
use crate::nutrition::{NutritionTarget, ABS_TOLERANCE};

/// Raw food matrix plus display identifiers.
#[derive(Debug, Clone)]
pub struct FoodTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    nutrient_count: usize,
}

impl FoodTable {
    /// Construct a table, validating shape and finiteness.
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>, nutrient_count: usize) -> Result<Self> {
        if rows.is_empty() {
            return Err(CoreError::construction("food table has no rows"));
        }
        if names.len() != rows.len() {
            return Err(CoreError::construction(format!(
                "food table has {} names but {} rows",
                names.len(),
                rows.len()
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != nutrient_count {
                return Err(CoreError::construction(format!(
                    "food row {i} has {} nutrients, expected {nutrient_count}",
                    row.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(CoreError::construction(format!(
                    "food row {i} nutrient {j} is not finite; \
                     NaN handling is an ingestion-layer responsibility"
                )));
            }
        }
        Ok(Self { names, rows, nutrient_count })
    }

    /// Number of foods.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty. Always false after construction.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of nutrient columns.
    pub fn nutrient_count(&self) -> usize {
        self.nutrient_count
    }

    /// Nutrient row of food `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Display name of food `i`.
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }
}

/// Food matrix rescaled to the pseudo-target basis.
///
/// Column `j` is divided by the target's `pseudo_target(j)`, so an amount
/// vector summing a column to 1.0 hits that nutrient's pseudo-target.
/// Column order matches the nutrition target order; this is checked at
/// construction and relied on everywhere downstream.
#[derive(Debug, Clone)]
pub struct NormalizedFoodTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    nutrient_count: usize,
}

impl NormalizedFoodTable {
    /// Normalize `foods` against `target`.
    pub fn new(foods: &FoodTable, target: &NutritionTarget) -> Result<Self> {
        if foods.nutrient_count() != target.len() {
            return Err(CoreError::construction(format!(
                "food table has {} nutrient columns but target tracks {}; \
                 column orders must match exactly",
                foods.nutrient_count(),
                target.len()
            )));
        }
        let scales: Vec<f64> = (0..target.len())
            .map(|j| target.pseudo_target(j).max(ABS_TOLERANCE))
            .collect();
        let rows = foods
            .rows
            .iter()
            .map(|row| row.iter().zip(&scales).map(|(v, s)| v / s).collect())
            .collect();
        Ok(Self {
            names: foods.names.clone(),
            rows,
            nutrient_count: foods.nutrient_count,
        })
    }

    /// Wrap a matrix that is already on the pseudo-target basis.
    ///
    /// For callers that normalize upstream; validation matches
    /// [`FoodTable::new`].
    pub fn from_normalized_rows(
        names: Vec<String>,
        rows: Vec<Vec<f64>>,
        nutrient_count: usize,
    ) -> Result<Self> {
        let table = FoodTable::new(names, rows, nutrient_count)?;
        Ok(Self {
            names: table.names,
            rows: table.rows,
            nutrient_count: table.nutrient_count,
        })
    }

    /// Number of foods.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty. Always false after construction.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of nutrient columns.
    pub fn nutrient_count(&self) -> usize {
        self.nutrient_count
    }

    /// Normalized nutrient row of food `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Display name of food `i`.
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }
}
