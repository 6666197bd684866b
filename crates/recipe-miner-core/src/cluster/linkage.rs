//! Agglomerative clustering with complete linkage.
//!
//! Complete linkage is deliberate: the inter-cluster distance is the
//! maximum pairwise distance between members, so a merged cluster's linkage
//! height is a true diameter bound, which the tree later exposes as
//! `max_distance` for pruning. Average or single linkage would not bound
//! worst-case intra-cluster distance.
//!
//! The output is a dependency-ordered merge sequence in the conventional
//! linkage encoding: with `n` initial rows, step `k` merges two cluster ids
//! strictly below `n + k` and produces cluster id `n + k`.

use super::distance::DistanceMatrix;

/// One merge step. `left < right`, both valid ids at the time of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStep {
    pub left: usize,
    pub right: usize,
}

/// Run complete-linkage agglomerative clustering.
///
/// Deterministic: among pairs at the same linkage distance the one with the
/// smallest `(left, right)` id pair merges first. Returns `n - 1` steps;
/// empty for a single-row input.
pub fn complete_linkage(distances: &DistanceMatrix) -> Vec<MergeStep> {
    let n = distances.len();
    if n <= 1 {
        return Vec::new();
    }

    // Lance-Williams over a fixed (2n - 1)-wide table: cluster k's distance
    // row is filled when k is created and never mutated afterwards. Costs
    // O(n²) memory and O(n³) scanning.
    // TODO: switch to the nearest-neighbor-chain formulation before mining
    // multi-thousand-row food tables.
    let total = 2 * n - 1;
    let mut dist = vec![0.0f64; total * total];
    for i in 0..n {
        for j in 0..n {
            dist[i * total + j] = distances.get(i, j);
        }
    }
    let mut alive = vec![false; total];
    alive[..n].fill(true);

    let mut merges = Vec::with_capacity(n - 1);
    for step in 0..(n - 1) {
        let next_id = n + step;
        let mut best: Option<(f64, usize, usize)> = None;
        for a in 0..next_id {
            if !alive[a] {
                continue;
            }
            for b in (a + 1)..next_id {
                if !alive[b] {
                    continue;
                }
                let d = dist[a * total + b];
                let better = match best {
                    None => true,
                    Some((bd, ba, bb)) => d < bd || (d == bd && (a, b) < (ba, bb)),
                };
                if better {
                    best = Some((d, a, b));
                }
            }
        }
        let (_, a, b) = best.expect("at least two clusters remain before the final merge");

        for k in 0..next_id {
            if alive[k] && k != a && k != b {
                let d = dist[a * total + k].max(dist[b * total + k]);
                dist[next_id * total + k] = d;
                dist[k * total + next_id] = d;
            }
        }
        alive[a] = false;
        alive[b] = false;
        alive[next_id] = true;
        merges.push(MergeStep { left: a, right: b });
    }
    merges
}
