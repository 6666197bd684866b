//! The recipe registry: bounded pools of the best leaf and branch recipes.
//!
//! Leaf recipes are final results; branch recipes are the frontier still
//! awaiting refinement. Both pools rank by `(score, max_distance)` and
//! evict their worst member when full. Branches are additionally indexed
//! by refinement priority `(next_max_distance, score)` descending, which
//! is the order the mining loop consumes them in: splitting the coarsest
//! frontier recipe first shrinks the bound fastest. The two branch
//! structures hold exactly the same recipes at all times.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::solve::Score;

use super::recipe::Recipe;
use super::top_k::BoundedTopK;

/// Retention rank: worse scores evict first, coarser recipes break ties.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RankKey {
    score: Score,
    max_distance: f64,
}

impl RankKey {
    fn of(recipe: &Arc<Recipe>) -> Self {
        Self { score: recipe.score(), max_distance: recipe.max_distance() }
    }
}

impl Eq for RankKey {}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.max_distance.total_cmp(&other.max_distance))
    }
}

/// Refinement priority of a branch recipe. Higher `next_max_distance`
/// comes first; the reversed key makes it the pool minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RefineKey {
    next_max_distance: f64,
    score: Score,
}

impl RefineKey {
    fn of(recipe: &Arc<Recipe>) -> Reverse<Self> {
        Reverse(Self {
            next_max_distance: recipe
                .next_max_distance()
                .expect("branch pool only holds branch recipes"),
            score: recipe.score(),
        })
    }
}

impl Eq for RefineKey {}

impl PartialOrd for RefineKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RefineKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.next_max_distance
            .total_cmp(&other.next_max_distance)
            .then_with(|| self.score.cmp(&other.score))
    }
}

type RankedPool = BoundedTopK<Arc<Recipe>, RankKey, fn(&Arc<Recipe>) -> RankKey>;
type RefinementPool =
    BoundedTopK<Arc<Recipe>, Reverse<RefineKey>, fn(&Arc<Recipe>) -> Reverse<RefineKey>>;

/// Bounded registry of the best recipes found so far.
pub struct TopRecipes {
    leafs: RankedPool,
    branches: RankedPool,
    branches_by_refinement: RefinementPool,
    pushed: bool,
}

impl TopRecipes {
    pub fn new(max_leafs: usize, max_branches: usize) -> Result<Self> {
        Ok(Self {
            leafs: BoundedTopK::new(max_leafs, RankKey::of as fn(&Arc<Recipe>) -> RankKey)?,
            branches: BoundedTopK::new(max_branches, RankKey::of as fn(&Arc<Recipe>) -> RankKey)?,
            branches_by_refinement: BoundedTopK::new(
                max_branches,
                RefineKey::of as fn(&Arc<Recipe>) -> Reverse<RefineKey>,
            )?,
            pushed: false,
        })
    }

    /// Offer a recipe to the appropriate pool. Returns whether it was
    /// retained; the worst member is evicted when the pool is full, which
    /// may be the offered recipe itself.
    pub fn push(&mut self, recipe: Arc<Recipe>) -> Result<bool> {
        let retained = if recipe.is_leaf() {
            let evicted = self.leafs.push(recipe.clone())?;
            evicted.as_ref() != Some(&recipe)
        } else {
            let evicted = self.branches.push(recipe.clone())?;
            match evicted {
                Some(e) if e == recipe => false,
                Some(e) => {
                    self.branches_by_refinement.remove(&e)?;
                    let shadow_evicted = self.branches_by_refinement.push(recipe.clone())?;
                    debug_assert!(shadow_evicted.is_none());
                    true
                }
                None => {
                    let shadow_evicted = self.branches_by_refinement.push(recipe.clone())?;
                    debug_assert!(shadow_evicted.is_none());
                    true
                }
            }
        };
        if retained {
            self.pushed = true;
            trace!(
                clusters = recipe.len(),
                solved = recipe.solved(),
                leaf = recipe.is_leaf(),
                "recipe retained"
            );
        }
        debug_assert_eq!(self.branches.len(), self.branches_by_refinement.len());
        Ok(retained)
    }

    /// Take the branch with the highest refinement priority, removing it
    /// from both branch structures. `None` when the frontier is exhausted.
    pub fn pop_branch(&mut self) -> Result<Option<Arc<Recipe>>> {
        if self.branches_by_refinement.is_empty() {
            return Ok(None);
        }
        let recipe = self.branches_by_refinement.pop()?;
        self.branches.remove(&recipe)?;
        debug_assert_eq!(self.branches.len(), self.branches_by_refinement.len());
        Ok(Some(recipe))
    }

    /// Whether any push retained a recipe since the last `unset_pushed`.
    pub fn pushed(&self) -> bool {
        self.pushed
    }

    pub fn unset_pushed(&mut self) {
        self.pushed = false;
    }

    /// Number of retained leaf recipes.
    pub fn leaf_count(&self) -> usize {
        self.leafs.len()
    }

    /// Number of branch recipes still on the frontier.
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Total retained recipes across both pools.
    pub fn len(&self) -> usize {
        self.leafs.len() + self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaf recipes, best first.
    pub fn leafs_sorted(&self) -> Vec<Arc<Recipe>> {
        let mut leafs: Vec<Arc<Recipe>> = self.leafs.iter().cloned().collect();
        leafs.sort_by(|a, b| rank_desc(a, b));
        leafs
    }

    /// Every retained recipe, leafs and branches together, best first.
    pub fn iter_sorted(&self) -> Vec<Arc<Recipe>> {
        let mut all: Vec<Arc<Recipe>> = self
            .leafs
            .iter()
            .chain(self.branches.iter())
            .cloned()
            .collect();
        all.sort_by(|a, b| rank_desc(a, b));
        all
    }
}

// Descending rank with a cluster-id tiebreak, so equally ranked recipes
// come back in one fixed order regardless of hash iteration.
fn rank_desc(a: &Arc<Recipe>, b: &Arc<Recipe>) -> std::cmp::Ordering {
    RankKey::of(b)
        .cmp(&RankKey::of(a))
        .then_with(|| a.clusters().cmp(b.clusters()))
}
