//! The mining loop: anytime branch-and-bound over the cluster tree.
//!
//! Starts from a recipe holding only the root cluster and repeatedly
//! refines the most promising branch recipe by splitting its coarsest
//! cluster. Refinements that improve (or whose parent was unsolved) are
//! pushed back; when a split would exceed the food budget, one cluster is
//! dropped per alternative; when nothing was retained at all, the split
//! cluster collapses to its representative leaf so refinement always makes
//! progress. The loop ends when no branch recipes remain or cancellation
//! fires, and whatever leaf recipes were retained so far are the result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::ClusterTree;
use crate::config::MinerConfig;
use crate::error::Result;
use crate::foods::NormalizedFoodTable;
use crate::nutrition::NutritionTarget;

use super::recipe::{Recipe, RecipeFactory};
use super::registry::TopRecipes;

/// Cloneable cancellation handle, the only state shared with the outside
/// while a search runs. Setting it stops the loop at the next iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters describing one mining run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MineStats {
    /// Distinct cluster sets scored (one solver call each).
    pub recipes_scored: u64,
    /// Recipe creations skipped by the visited cache.
    pub recipes_skipped_visited: u64,
    /// Branch recipes popped off the frontier.
    pub branches_examined: u64,
}

/// Output of a mining run: retained leaf recipes, best first.
#[derive(Debug)]
pub struct MineResult {
    pub recipes: Vec<Arc<Recipe>>,
    pub stats: MineStats,
    /// True when the run was stopped by its [`CancelToken`].
    pub cancelled: bool,
}

/// The orchestrating search. Stateless between runs; all per-run state
/// lives on the stack of [`Miner::mine`].
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Search `tree` for the best food combinations against `target`.
    ///
    /// `foods` must be normalized against the same target; the target is
    /// brought onto the same pseudo-target basis here, so all solving
    /// happens in one space. Amounts are basis-independent and apply to
    /// the raw food rows directly.
    ///
    /// Anytime: cancellation returns everything accumulated so far.
    pub fn mine(
        &self,
        tree: &ClusterTree,
        foods: &NormalizedFoodTable,
        target: &NutritionTarget,
        cancel: &CancelToken,
    ) -> Result<MineResult> {
        let target = target.normalized();
        let mut factory = RecipeFactory::new(tree, foods, &target, self.config.solver.clone());
        let mut top = TopRecipes::new(self.config.max_leafs, self.config.max_branches)?;
        let mut branches_examined = 0u64;
        let mut cancelled = false;

        info!(
            foods = foods.len(),
            nodes = tree.len(),
            max_foods = self.config.max_foods,
            "mining started"
        );

        let root = factory
            .create(vec![tree.root()])?
            .expect("root recipe is never a revisit");
        top.push(root)?;

        while let Some(recipe) = top.pop_branch()? {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            branches_examined += 1;
            top.unset_pushed();

            let cluster = recipe.next_cluster()?;
            let children = tree
                .children(cluster)
                .expect("next_cluster of a branch recipe is a branch");

            if let Some(split) = factory.replace(&recipe, &[cluster], &children)? {
                if split.score() > recipe.score() || !recipe.solved() {
                    if split.len() <= self.config.max_foods {
                        top.push(split)?;
                    } else {
                        // Over the food budget: make room by dropping one
                        // cluster per alternative.
                        for &dropped in split.clusters() {
                            if let Some(narrowed) = factory.replace(&split, &[dropped], &[])? {
                                if narrowed.score() > recipe.score() || !recipe.solved() {
                                    top.push(narrowed)?;
                                }
                            }
                        }
                    }
                }
            }

            if !top.pushed() {
                // Splitting led nowhere; collapse the cluster to its
                // representative leaf so this line of search still narrows.
                let leaf = tree.representative_leaf(cluster);
                if let Some(collapsed) = factory.replace(&recipe, &[cluster], &[leaf])? {
                    top.push(collapsed)?;
                }
            }

            if branches_examined % 1000 == 0 {
                debug!(
                    branches_examined,
                    leafs = top.leaf_count(),
                    frontier = top.branch_count(),
                    "mining progress"
                );
            }
        }

        let stats = MineStats {
            recipes_scored: factory.recipes_scored(),
            recipes_skipped_visited: factory.recipes_skipped_visited(),
            branches_examined,
        };
        info!(
            recipes = top.leaf_count(),
            scored = stats.recipes_scored,
            skipped = stats.recipes_skipped_visited,
            branches = stats.branches_examined,
            cancelled,
            "mining finished"
        );
        Ok(MineResult {
            recipes: top.leafs_sorted(),
            stats,
            cancelled,
        })
    }
}
