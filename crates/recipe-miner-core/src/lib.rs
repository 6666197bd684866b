//! Recipe mining core: anytime search for food combinations meeting a
//! nutrition target.
//!
//! The search space is the power set of a food table; it is tamed by a
//! hierarchical cluster tree built once over the (normalized) foods with
//! complete linkage, so every cluster carries a true diameter bound.
//! Mining is branch-and-bound over recipes, sets of tree nodes standing in
//! for their representative foods: the coarsest promising recipe is split
//! first, every candidate is scored by a constrained solver, and bounded
//! top-k pools retain the best found so far. Results are ranked leaf
//! recipes, each resolved down to individual foods with amounts.
//!
//! The crate is synchronous and single-threaded by design; the only
//! concurrency surface is the [`CancelToken`] a host can set from another
//! thread to stop a run early.
//!
//! ```no_run
//! use recipe_miner_core::{
//!     build_cluster_tree, mine, CancelToken, FoodTable, MinerConfig, NormalizedFoodTable,
//!     NutrientBounds, NutritionTarget,
//! };
//!
//! # fn main() -> recipe_miner_core::Result<()> {
//! let target = NutritionTarget::new(vec![
//!     NutrientBounds::at_least(50.0),
//!     NutrientBounds::between(20.0, 35.0),
//! ])?;
//! let foods = FoodTable::new(
//!     vec!["oats".into(), "lentils".into()],
//!     vec![vec![17.0, 7.0], vec![9.0, 1.0]],
//!     2,
//! )?;
//! let foods = NormalizedFoodTable::new(&foods, &target)?;
//! let tree = build_cluster_tree(&foods)?;
//! let result = mine(&tree, &foods, &target, MinerConfig::default(), &CancelToken::new())?;
//! for recipe in &result.recipes {
//!     println!("{:?} {:?}", recipe.score(), recipe.amounts()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod foods;
pub mod mining;
pub mod nutrition;
pub mod solve;

pub use cluster::{build_cluster_tree, ClusterNode, ClusterTree, NodeId, NodeKind};
pub use config::{MinerConfig, SolverConfig, SolverPolicy};
pub use error::{CoreError, Result};
pub use foods::{FoodTable, NormalizedFoodTable};
pub use mining::{CancelToken, MineResult, MineStats, Miner, Recipe};
pub use nutrition::{NutrientBounds, NutritionTarget};
pub use solve::Score;

/// Run one mining search end to end.
///
/// Convenience wrapper over [`Miner::new`] + [`Miner::mine`].
pub fn mine(
    tree: &ClusterTree,
    foods: &NormalizedFoodTable,
    target: &NutritionTarget,
    config: MinerConfig,
    cancel: &CancelToken,
) -> Result<MineResult> {
    Miner::new(config)?.mine(tree, foods, target, cancel)
}
