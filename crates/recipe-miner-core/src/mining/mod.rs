//! The mining layer: recipes, bounded retention, and the search loop.

pub mod miner;
pub mod recipe;
pub mod registry;
pub mod top_k;

pub use miner::{CancelToken, MineResult, MineStats, Miner};
pub use recipe::{Recipe, RecipeFactory};
pub use registry::TopRecipes;
pub use top_k::BoundedTopK;
