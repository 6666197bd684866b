//! Recipes: scored bindings of cluster-tree nodes to food amounts.
//!
//! A [`Recipe`] is immutable. It is created only through a
//! [`RecipeFactory`], which resolves each cluster to its representative
//! leaf's food row, runs the solver once, and deduplicates by the *set* of
//! cluster ids — the same food combination reached along two different
//! refinement paths is scored at most once.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::trace;

use crate::cluster::{ClusterTree, NodeId};
use crate::config::SolverConfig;
use crate::error::{CoreError, Result};
use crate::foods::NormalizedFoodTable;
use crate::nutrition::NutritionTarget;
use crate::solve::{solve, Score};

#[derive(Debug, Clone, Copy)]
struct NextSplit {
    cluster: NodeId,
    next_max_distance: f64,
}

/// An immutable scored recipe over cluster-tree nodes.
#[derive(Debug)]
pub struct Recipe {
    clusters: Vec<NodeId>,
    score: Score,
    amounts: Option<Vec<f64>>,
    max_distance: f64,
    is_leaf: bool,
    next: Option<NextSplit>,
}

impl Recipe {
    /// Cluster ids, sorted ascending, unique, non-empty.
    pub fn clusters(&self) -> &[NodeId] {
        &self.clusters
    }

    /// Number of clusters (hence representative foods).
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Always false: an empty cluster list is rejected at creation.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Solve score of this recipe.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Whether an exact solution meeting every bound was found.
    pub fn solved(&self) -> bool {
        self.score.solved
    }

    /// Food amounts aligned with `clusters()`.
    ///
    /// Fails with `InvalidOperation` when the solve produced none.
    pub fn amounts(&self) -> Result<&[f64]> {
        self.amounts
            .as_deref()
            .ok_or_else(|| CoreError::invalid_operation("unsolved recipe has no amounts"))
    }

    /// Max `max_distance` over the recipe's clusters.
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// True iff every cluster is a leaf (fully resolved to foods).
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// The cluster to split next: the one with the largest `max_distance`
    /// (ties broken by lowest id). Fails on a leaf-only recipe.
    pub fn next_cluster(&self) -> Result<NodeId> {
        self.next
            .map(|n| n.cluster)
            .ok_or_else(|| CoreError::invalid_operation("no next_cluster on a leaf recipe"))
    }

    /// The recipe's `max_distance` after hypothetically splitting
    /// `next_cluster`. Fails on a leaf-only recipe.
    pub fn next_max_distance(&self) -> Result<f64> {
        self.next
            .map(|n| n.next_max_distance)
            .ok_or_else(|| CoreError::invalid_operation("no next_max_distance on a leaf recipe"))
    }

    /// Dominance: `self` is no better than `other` when it is at least as
    /// refined yet scores no better. Not a total order.
    pub fn no_better_than(&self, other: &Recipe) -> bool {
        self.max_distance <= other.max_distance && self.score <= other.score
    }
}

// Identity is the cluster-id set only; scores and amounts are derived.
impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.clusters == other.clusters
    }
}

impl Eq for Recipe {}

impl Hash for Recipe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clusters.hash(state);
    }
}

/// Factory and revisit-avoidance cache for recipe creation.
pub struct RecipeFactory<'a> {
    tree: &'a ClusterTree,
    foods: &'a NormalizedFoodTable,
    target: &'a NutritionTarget,
    solver: SolverConfig,
    visited: HashSet<Vec<NodeId>>,
    recipes_scored: u64,
    recipes_skipped_visited: u64,
}

impl<'a> RecipeFactory<'a> {
    pub fn new(
        tree: &'a ClusterTree,
        foods: &'a NormalizedFoodTable,
        target: &'a NutritionTarget,
        solver: SolverConfig,
    ) -> Self {
        Self {
            tree,
            foods,
            target,
            solver,
            visited: HashSet::new(),
            recipes_scored: 0,
            recipes_skipped_visited: 0,
        }
    }

    /// Recipes actually scored (one solver call each).
    pub fn recipes_scored(&self) -> u64 {
        self.recipes_scored
    }

    /// Creations skipped because the cluster set was already visited.
    pub fn recipes_skipped_visited(&self) -> u64 {
        self.recipes_skipped_visited
    }

    /// Create a recipe for the given cluster set if it has not been
    /// created before. Returns `Ok(None)` on a revisit; order of the input
    /// does not matter.
    pub fn create(&mut self, mut clusters: Vec<NodeId>) -> Result<Option<Arc<Recipe>>> {
        if clusters.is_empty() {
            return Err(CoreError::construction("clusters must be non-empty"));
        }
        clusters.sort_unstable();
        if clusters.windows(2).any(|w| w[0] == w[1]) {
            return Err(CoreError::construction(format!(
                "duplicate cluster id in {:?}",
                clusters
            )));
        }

        if self.visited.contains(&clusters) {
            self.recipes_skipped_visited += 1;
            trace!(?clusters, "skipping already-visited cluster set");
            return Ok(None);
        }
        self.visited.insert(clusters.clone());
        self.recipes_scored += 1;

        let rows: Vec<&[f64]> = clusters
            .iter()
            .map(|&c| self.foods.row(self.tree.food_index(c)))
            .collect();
        let outcome = solve(self.target, &rows, &self.solver);

        let max_distance = clusters
            .iter()
            .map(|&c| self.tree.max_distance(c))
            .fold(0.0f64, f64::max);
        let is_leaf = clusters.iter().all(|&c| self.tree.node(c).is_leaf());
        let next = if is_leaf {
            None
        } else {
            Some(self.next_split(&clusters))
        };

        Ok(Some(Arc::new(Recipe {
            clusters,
            score: outcome.score,
            amounts: outcome.amounts,
            max_distance,
            is_leaf,
            next,
        })))
    }

    /// Create the recipe obtained by replacing `replacee` with
    /// `replacement` in `recipe`'s clusters.
    ///
    /// `replacee` must be non-empty and fully present; `replacement` may be
    /// empty (pure removal) or several clusters (a split), but must be
    /// disjoint from `replacee`. Returns `Ok(None)` on a revisit.
    pub fn replace(
        &mut self,
        recipe: &Recipe,
        replacee: &[NodeId],
        replacement: &[NodeId],
    ) -> Result<Option<Arc<Recipe>>> {
        if replacee.is_empty() {
            return Err(CoreError::construction("replacee must not be empty"));
        }
        if replacement.iter().any(|r| replacee.contains(r)) {
            return Err(CoreError::construction(format!(
                "replacee {replacee:?} and replacement {replacement:?} overlap"
            )));
        }
        let mut clusters = recipe.clusters().to_vec();
        for r in replacee {
            let pos = clusters.iter().position(|c| c == r).ok_or_else(|| {
                CoreError::construction(format!(
                    "replacee cluster {} not present in recipe",
                    r.index()
                ))
            })?;
            clusters.remove(pos);
        }
        clusters.extend_from_slice(replacement);
        self.create(clusters)
    }

    fn next_split(&self, clusters: &[NodeId]) -> NextSplit {
        let mut cluster = clusters[0];
        let mut best = f64::NEG_INFINITY;
        for &c in clusters {
            let d = self.tree.max_distance(c);
            if d > best {
                best = d;
                cluster = c;
            }
        }

        let children = self
            .tree
            .children(cluster)
            .expect("cluster with the largest max_distance of a branch recipe is a branch");
        let mut next_max = children
            .iter()
            .map(|&c| self.tree.max_distance(c))
            .fold(0.0f64, f64::max);
        for &c in clusters {
            if c != cluster {
                next_max = next_max.max(self.tree.max_distance(c));
            }
        }
        NextSplit { cluster, next_max_distance: next_max }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A recipe with fabricated attributes, bypassing the factory. For
    /// tests of structures that hold recipes without solving.
    pub(crate) fn recipe_fixture(
        clusters: Vec<NodeId>,
        score: Score,
        max_distance: f64,
        next: Option<(NodeId, f64)>,
    ) -> Recipe {
        Recipe {
            clusters,
            score,
            amounts: None,
            max_distance,
            is_leaf: next.is_none(),
            next: next.map(|(cluster, next_max_distance)| NextSplit {
                cluster,
                next_max_distance,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterNode, NodeKind};
    use crate::nutrition::NutrientBounds;

    /// Leaves 0..4 over a 1-nutrient table, branches with fabricated
    /// diameters:
    ///   5 = (0, 1) max_distance 3.0
    ///   6 = (2, 3) max_distance 4.5
    ///   7 = (5, 6) max_distance 9.0
    fn fixture() -> (ClusterTree, NormalizedFoodTable, NutritionTarget) {
        let leaf = |i: usize| ClusterNode {
            id: NodeId(i),
            kind: NodeKind::Leaf { food_index: i },
        };
        let branch = |id: usize, children: [usize; 2], d: f64, rep: usize| ClusterNode {
            id: NodeId(id),
            kind: NodeKind::Branch {
                children: [NodeId(children[0]), NodeId(children[1])],
                max_distance: d,
                representative: NodeId(rep),
            },
        };
        let nodes = vec![
            leaf(0),
            leaf(1),
            leaf(2),
            leaf(3),
            leaf(4),
            branch(5, [0, 1], 3.0, 0),
            branch(6, [2, 3], 4.5, 2),
            branch(7, [5, 6], 9.0, 0),
        ];
        let tree = ClusterTree::from_nodes(nodes, NodeId(7)).unwrap();
        let foods = NormalizedFoodTable::from_normalized_rows(
            (0..5).map(|i| format!("f{i}")).collect(),
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]],
            1,
        )
        .unwrap();
        let target = NutritionTarget::new(vec![NutrientBounds::at_least(2.0)]).unwrap();
        (tree, foods, target)
    }

    fn factory<'a>(
        tree: &'a ClusterTree,
        foods: &'a NormalizedFoodTable,
        target: &'a NutritionTarget,
    ) -> RecipeFactory<'a> {
        RecipeFactory::new(tree, foods, target, SolverConfig::default())
    }

    #[test]
    fn test_branch_recipe_attributes() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        // Clusters with max_distance {3.0, 4.5, 0.0}.
        let recipe = factory
            .create(vec![NodeId(5), NodeId(6), NodeId(4)])
            .unwrap()
            .unwrap();
        assert!(!recipe.is_leaf());
        assert_eq!(recipe.len(), 3);
        assert_eq!(recipe.max_distance(), 4.5);
        assert_eq!(recipe.next_cluster().unwrap(), NodeId(6));
        // After splitting 6 (children at 0.0 each), the worst remaining
        // cluster is 5 at 3.0.
        assert!((recipe.next_max_distance().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_leaf_recipe_rejects_next_cluster() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        let recipe = factory.create(vec![NodeId(0)]).unwrap().unwrap();
        assert!(recipe.is_leaf());
        assert_eq!(recipe.max_distance(), 0.0);
        assert!(recipe.next_cluster().is_err());
        assert!(recipe.next_max_distance().is_err());
    }

    #[test]
    fn test_create_deduplicates_by_set() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        assert!(factory.create(vec![NodeId(0), NodeId(1)]).unwrap().is_some());
        // Same set, different order: a revisit.
        assert!(factory.create(vec![NodeId(1), NodeId(0)]).unwrap().is_none());
        assert_eq!(factory.recipes_scored(), 1);
        assert_eq!(factory.recipes_skipped_visited(), 1);
    }

    #[test]
    fn test_create_rejects_empty_and_duplicates() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        assert!(factory.create(vec![]).is_err());
        assert!(factory.create(vec![NodeId(0), NodeId(0)]).is_err());
    }

    #[test]
    fn test_replace_validation() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        let recipe = factory.create(vec![NodeId(0)]).unwrap().unwrap();

        // Overlapping replacee/replacement.
        assert!(factory.replace(&recipe, &[NodeId(0)], &[NodeId(0)]).is_err());
        // Empty replacee.
        assert!(factory.replace(&recipe, &[], &[NodeId(1)]).is_err());
        // Replacee missing from recipe.
        assert!(factory.replace(&recipe, &[NodeId(1)], &[NodeId(2)]).is_err());
        assert!(factory
            .replace(&recipe, &[NodeId(0), NodeId(1)], &[NodeId(2)])
            .is_err());
        // Overlap in any position.
        assert!(factory
            .replace(&recipe, &[NodeId(0)], &[NodeId(1), NodeId(0)])
            .is_err());
    }

    #[test]
    fn test_replace_operations() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        let recipe = factory.create(vec![NodeId(0)]).unwrap().unwrap();

        // Replace with one.
        let recipe = factory
            .replace(&recipe, &[NodeId(0)], &[NodeId(1)])
            .unwrap()
            .unwrap();
        assert_eq!(recipe.clusters(), &[NodeId(1)]);

        // Replace with multiple (a split).
        let recipe = factory
            .replace(&recipe, &[NodeId(1)], &[NodeId(0), NodeId(2)])
            .unwrap()
            .unwrap();
        assert_eq!(recipe.clusters(), &[NodeId(0), NodeId(2)]);

        // Replace multiple with one.
        let recipe = factory
            .replace(&recipe, &[NodeId(0), NodeId(2)], &[NodeId(3)])
            .unwrap()
            .unwrap();
        assert_eq!(recipe.clusters(), &[NodeId(3)]);

        // Pure removal, leaving some behind.
        let recipe = factory
            .replace(&recipe, &[NodeId(3)], &[NodeId(1), NodeId(2), NodeId(4)])
            .unwrap()
            .unwrap();
        let recipe = factory
            .replace(&recipe, &[NodeId(4)], &[])
            .unwrap()
            .unwrap();
        assert_eq!(recipe.clusters(), &[NodeId(1), NodeId(2)]);
    }

    #[test]
    fn test_recipe_identity_ignores_score() {
        let (tree, foods, target) = fixture();
        let mut factory = factory(&tree, &foods, &target);
        let a = factory.create(vec![NodeId(0), NodeId(2)]).unwrap().unwrap();
        let b = factory.create(vec![NodeId(0), NodeId(3)]).unwrap().unwrap();
        assert_ne!(a.as_ref(), b.as_ref());
        assert_eq!(a.as_ref(), a.as_ref());
    }

    #[test]
    fn test_dominance_truth_table() {
        fn recipe(max_distance: f64, subscore: f64) -> Recipe {
            Recipe {
                clusters: vec![NodeId(0)],
                score: Score { solved: false, subscore },
                amounts: None,
                max_distance,
                is_leaf: false,
                next: None,
            }
        }
        let r5_10 = recipe(5.0, 10.0);
        let r5_9 = recipe(5.0, 9.0);
        let r5_8 = recipe(5.0, 8.0);
        let r4_9 = recipe(4.0, 9.0);
        assert!(r5_10.no_better_than(&r5_10));
        assert!(!r5_10.no_better_than(&r5_9));
        assert!(r5_9.no_better_than(&r5_10));
        assert!(r4_9.no_better_than(&r5_9));
        assert!(!r5_9.no_better_than(&r4_9));
        assert!(r4_9.no_better_than(&r5_10));
        assert!(!r5_10.no_better_than(&r4_9));
        assert!(!r4_9.no_better_than(&r5_8));
        assert!(!r5_8.no_better_than(&r4_9));
    }

    #[test]
    fn test_amounts_error_when_absent() {
        let recipe = Recipe {
            clusters: vec![NodeId(0)],
            score: Score::worst(),
            amounts: None,
            max_distance: 0.0,
            is_leaf: true,
            next: None,
        };
        assert!(recipe.amounts().is_err());
    }
}
