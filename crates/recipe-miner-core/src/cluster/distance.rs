//! Pairwise distances between food rows.

use crate::foods::NormalizedFoodTable;

/// Symmetric matrix of pairwise Euclidean distances.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute pairwise Euclidean distances over the normalized food rows.
    pub fn from_foods(foods: &NormalizedFoodTable) -> Self {
        let n = foods.len();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(foods.row(i), foods.row(j));
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        Self { n, data }
    }

    /// Build directly from a row-major symmetric matrix. Test seam.
    pub fn from_raw(n: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n * n);
        Self { n, data }
    }

    /// Number of rows/columns.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the matrix is empty.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between rows `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// Collapse exact-duplicate rows, keeping the first of each group.
    ///
    /// A row `j` is a duplicate when some earlier row `i < j` sits at
    /// distance 0 from it (upper triangle only, so each group keeps exactly
    /// one representative). Returns the kept row indices (into the original
    /// ordering) and the matrix restricted to them.
    pub fn collapse_duplicates(&self) -> (Vec<usize>, DistanceMatrix) {
        let mut keep = Vec::with_capacity(self.n);
        for j in 0..self.n {
            let duplicate = (0..j).any(|i| self.get(i, j) == 0.0);
            if !duplicate {
                keep.push(j);
            }
        }
        if keep.len() == self.n {
            return (keep, self.clone());
        }
        let m = keep.len();
        let mut data = vec![0.0; m * m];
        for (a, &i) in keep.iter().enumerate() {
            for (b, &j) in keep.iter().enumerate() {
                data[a * m + b] = self.get(i, j);
            }
        }
        (keep, DistanceMatrix { n: m, data })
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
