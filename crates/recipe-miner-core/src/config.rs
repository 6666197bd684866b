//! Configuration for the mining core.
//!
//! Plain serde-derived structs with explicit `validate()` methods. Loading
//! these from a file is a collaborator concern; the core only checks that
//! whatever it is handed is internally consistent.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default cap on the number of clusters (hence foods) per recipe.
pub const DEFAULT_MAX_FOODS: usize = 20;

/// Default number of fully-resolved (leaf) recipes to retain.
pub const DEFAULT_MAX_LEAFS: usize = 1000;

/// Default number of unresolved (branch) recipes to keep on the worklist.
pub const DEFAULT_MAX_BRANCHES: usize = 1000;

/// Strategy choice for scoring a candidate food set.
///
/// The exact path and the relaxed fallback coexist; this only controls
/// whether the exact path is attempted at all. An exact success always
/// outranks any relaxed score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverPolicy {
    /// Try the constrained feasibility search first, fall back to
    /// non-negative least squares when no feasible solution is found.
    #[default]
    ExactThenRelaxed,
    /// Skip the exact path entirely; every recipe scores as unsolved.
    RelaxedOnly,
}

/// Parameters for the candidate solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Which solve strategy to run.
    pub policy: SolverPolicy,

    /// Require whole-unit servings on the exact path.
    pub integer_amounts: bool,

    /// Bound on greedy repair sweeps in the feasibility search.
    pub max_repair_sweeps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            policy: SolverPolicy::default(),
            integer_amounts: true,
            max_repair_sweeps: 64,
        }
    }
}

impl SolverConfig {
    /// Validate parameter consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_repair_sweeps == 0 {
            return Err(CoreError::construction(
                "max_repair_sweeps must be >= 1, got 0",
            ));
        }
        Ok(())
    }
}

/// Parameters for a mining run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Cap on cluster count per recipe. Must be >= 1.
    pub max_foods: usize,

    /// Capacity of the retained leaf-recipe top-k.
    pub max_leafs: usize,

    /// Capacity of the branch-recipe worklist top-k.
    pub max_branches: usize,

    /// Solver parameters used for every recipe scored during the run.
    pub solver: SolverConfig,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            max_foods: DEFAULT_MAX_FOODS,
            max_leafs: DEFAULT_MAX_LEAFS,
            max_branches: DEFAULT_MAX_BRANCHES,
            solver: SolverConfig::default(),
        }
    }
}

impl MinerConfig {
    /// Validate parameter consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_foods == 0 {
            return Err(CoreError::construction("max_foods must be >= 1, got 0"));
        }
        if self.max_leafs == 0 {
            return Err(CoreError::construction("max_leafs must be >= 1, got 0"));
        }
        if self.max_branches == 0 {
            return Err(CoreError::construction("max_branches must be >= 1, got 0"));
        }
        self.solver.validate()
    }

    /// Builder-style override for `max_foods`.
    pub fn with_max_foods(mut self, max_foods: usize) -> Self {
        self.max_foods = max_foods;
        self
    }

    /// Builder-style override for the retained top-k capacities.
    pub fn with_capacities(mut self, max_leafs: usize, max_branches: usize) -> Self {
        self.max_leafs = max_leafs;
        self.max_branches = max_branches;
        self
    }
}
