//! The hierarchical cluster tree over the food set.
//!
//! Built once by complete-linkage agglomerative clustering, immutable
//! thereafter, and shared by reference across every recipe of a mining run.
//! Nodes live in an arena and reference each other by [`NodeId`]; children
//! are owned downward only, so the representative back-reference from a
//! branch to a descendant leaf is a plain index with no cycle risk.
//!
//! A node is either a `Leaf` standing for one food row or a `Branch` with
//! exactly two children, a `max_distance` (the true diameter of its leaf
//! set, courtesy of complete linkage) and a designated representative leaf:
//! the most central member by furthest-neighbor distance, a 1-center
//! approximation.

use tracing::debug;

use super::distance::DistanceMatrix;
use super::linkage::complete_linkage;
use crate::error::{CoreError, Result};
use crate::foods::NormalizedFoodTable;

/// Arena index of a cluster node. Leaves occupy `[0, n_kept_foods)`;
/// branches follow in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Leaf-or-branch payload of a cluster node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A single food; `food_index` points into the full food table.
    Leaf { food_index: usize },
    /// A merged cluster of two children.
    Branch {
        children: [NodeId; 2],
        /// Least upper bound on pairwise distance within the subtree.
        /// Strictly positive for every branch.
        max_distance: f64,
        /// Descendant leaf standing in for the whole cluster when solving.
        representative: NodeId,
    },
}

/// One immutable node of the cluster tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl ClusterNode {
    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Cluster diameter: 0.0 for a leaf.
    pub fn max_distance(&self) -> f64 {
        match self.kind {
            NodeKind::Leaf { .. } => 0.0,
            NodeKind::Branch { max_distance, .. } => max_distance,
        }
    }
}

/// The static binary tree produced by clustering.
#[derive(Debug, Clone)]
pub struct ClusterTree {
    nodes: Vec<ClusterNode>,
    root: NodeId,
}

impl ClusterTree {
    /// Assemble a tree from pre-built nodes, validating the invariants:
    /// ids match arena positions, every branch has in-range children, a
    /// strictly positive `max_distance` and a leaf representative.
    pub fn from_nodes(nodes: Vec<ClusterNode>, root: NodeId) -> Result<Self> {
        if nodes.is_empty() {
            return Err(CoreError::construction("cluster tree has no nodes"));
        }
        if root.index() >= nodes.len() {
            return Err(CoreError::construction(format!(
                "root id {} out of range for {} nodes",
                root.index(),
                nodes.len()
            )));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.id.index() != i {
                return Err(CoreError::construction(format!(
                    "node at arena position {i} carries id {}",
                    node.id.index()
                )));
            }
            if let NodeKind::Branch { children, max_distance, representative } = &node.kind {
                for child in children {
                    if child.index() >= nodes.len() {
                        return Err(CoreError::construction(format!(
                            "branch {i} references missing child {}",
                            child.index()
                        )));
                    }
                }
                if !(*max_distance > 0.0) {
                    return Err(CoreError::construction(format!(
                        "branch {i} has non-positive max_distance {max_distance}; \
                         is_leaf must hold exactly when max_distance == 0"
                    )));
                }
                match nodes.get(representative.index()) {
                    Some(rep) if rep.is_leaf() => {}
                    _ => {
                        return Err(CoreError::construction(format!(
                            "branch {i} representative {} is not a leaf",
                            representative.index()
                        )))
                    }
                }
            }
        }
        Ok(Self { nodes, root })
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total node count (leaves + branches).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty. Always false after construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &ClusterNode {
        &self.nodes[id.index()]
    }

    /// Both children of a branch; `None` for a leaf.
    pub fn children(&self, id: NodeId) -> Option<[NodeId; 2]> {
        match self.node(id).kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Branch { children, .. } => Some(children),
        }
    }

    /// Cluster diameter of `id`; 0.0 for a leaf.
    pub fn max_distance(&self, id: NodeId) -> f64 {
        self.node(id).max_distance()
    }

    /// The leaf representing cluster `id`: itself for a leaf.
    pub fn representative_leaf(&self, id: NodeId) -> NodeId {
        match self.node(id).kind {
            NodeKind::Leaf { .. } => id,
            NodeKind::Branch { representative, .. } => representative,
        }
    }

    /// Food-table row index backing cluster `id`, delegating through the
    /// representative leaf for branches.
    pub fn food_index(&self, id: NodeId) -> usize {
        match self.node(self.representative_leaf(id)).kind {
            NodeKind::Leaf { food_index } => food_index,
            NodeKind::Branch { .. } => unreachable!("representative is always a leaf"),
        }
    }
}

/// Build the cluster tree for a normalized food table.
///
/// Exact-duplicate rows (pairwise distance 0) are collapsed to a single
/// representative before clustering; kept leaves still carry their original
/// row index. Construction is pure: the same table always yields the same
/// tree.
pub fn build_cluster_tree(foods: &NormalizedFoodTable) -> Result<ClusterTree> {
    let distances = DistanceMatrix::from_foods(foods);
    let (keep, reduced) = distances.collapse_duplicates();
    let m = keep.len();
    debug!(foods = foods.len(), kept = m, "clustering foods (complete linkage)");

    let merges = complete_linkage(&reduced);

    let mut nodes: Vec<ClusterNode> = Vec::with_capacity(2 * m - 1);
    for (leaf_id, &food_index) in keep.iter().enumerate() {
        nodes.push(ClusterNode {
            id: NodeId(leaf_id),
            kind: NodeKind::Leaf { food_index },
        });
    }

    // leaf_sets[id] = sorted reduced-row indices of the leaf descendants of
    // cluster id. Leaf rows double as leaf NodeIds.
    let mut leaf_sets: Vec<Vec<usize>> = (0..m).map(|i| vec![i]).collect();
    for (k, merge) in merges.iter().enumerate() {
        let id = m + k;
        let mut leaves = leaf_sets[merge.left].clone();
        leaves.extend_from_slice(&leaf_sets[merge.right]);
        leaves.sort_unstable();

        let mut max_distance = 0.0f64;
        let mut representative = leaves[0];
        let mut representative_eccentricity = f64::INFINITY;
        for &l in &leaves {
            let mut eccentricity = 0.0f64;
            for &other in &leaves {
                if other != l {
                    eccentricity = eccentricity.max(reduced.get(l, other));
                }
            }
            max_distance = max_distance.max(eccentricity);
            if eccentricity < representative_eccentricity {
                representative_eccentricity = eccentricity;
                representative = l;
            }
        }

        nodes.push(ClusterNode {
            id: NodeId(id),
            kind: NodeKind::Branch {
                children: [NodeId(merge.left), NodeId(merge.right)],
                max_distance,
                representative: NodeId(representative),
            },
        });
        leaf_sets.push(leaves);
    }

    let root = NodeId(nodes.len() - 1);
    debug!(nodes = nodes.len(), root = root.index(), "cluster tree built");
    ClusterTree::from_nodes(nodes, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foods::NormalizedFoodTable;

    fn table(rows: Vec<Vec<f64>>) -> NormalizedFoodTable {
        let n = rows[0].len();
        let names = (0..rows.len()).map(|i| format!("f{i}")).collect();
        NormalizedFoodTable::from_normalized_rows(names, rows, n).unwrap()
    }

    #[test]
    fn test_single_food_root_is_leaf() {
        let tree = build_cluster_tree(&table(vec![vec![1.0, 2.0]])).unwrap();
        assert_eq!(tree.len(), 1);
        let root = tree.root();
        assert!(tree.node(root).is_leaf());
        assert_eq!(tree.max_distance(root), 0.0);
        assert_eq!(tree.food_index(root), 0);
    }

    #[test]
    fn test_binary_tree_shape() {
        let tree = build_cluster_tree(&table(vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![5.0, 5.0],
        ]))
        .unwrap();
        // 3 leaves, 2 branches.
        assert_eq!(tree.len(), 5);
        let root = tree.root();
        let children = tree.children(root).unwrap();
        assert_eq!(children.len(), 2);
        assert!(tree.max_distance(root) > 0.0);
    }

    #[test]
    fn test_leaf_iff_zero_max_distance() {
        let tree = build_cluster_tree(&table(vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 3.0],
            vec![4.0, 4.0],
        ]))
        .unwrap();
        for i in 0..tree.len() {
            let id = NodeId(i);
            assert_eq!(tree.node(id).is_leaf(), tree.max_distance(id) == 0.0);
        }
    }

    #[test]
    fn test_root_max_distance_is_diameter() {
        // Diameter is the farthest pair: (0,0) to (6,8) = 10.
        let tree = build_cluster_tree(&table(vec![
            vec![0.0, 0.0],
            vec![3.0, 4.0],
            vec![6.0, 8.0],
        ]))
        .unwrap();
        assert!((tree.max_distance(tree.root()) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_representative_is_central_leaf() {
        // Points on a line: 0.0, 1.0, 10.0. The root's 1-center is the
        // middle point (furthest neighbor 9.0, vs 10.0 for the endpoints).
        let tree = build_cluster_tree(&table(vec![
            vec![0.0],
            vec![1.0],
            vec![10.0],
        ]))
        .unwrap();
        let rep = tree.representative_leaf(tree.root());
        assert_eq!(tree.food_index(rep), 1);
    }

    #[test]
    fn test_duplicates_collapsed_keep_original_indices() {
        let tree = build_cluster_tree(&table(vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0], // duplicate of row 0
            vec![0.0, 1.0],
        ]))
        .unwrap();
        // 2 kept leaves + 1 branch.
        assert_eq!(tree.len(), 3);
        let food_indices: Vec<usize> = (0..2).map(|i| tree.food_index(NodeId(i))).collect();
        assert_eq!(food_indices, vec![0, 2]);
    }

    #[test]
    fn test_construction_is_deterministic() {
        let rows = vec![
            vec![0.0, 0.0],
            vec![2.0, 1.0],
            vec![1.0, 7.0],
            vec![4.0, 4.0],
            vec![9.0, 0.5],
        ];
        let a = build_cluster_tree(&table(rows.clone())).unwrap();
        let b = build_cluster_tree(&table(rows)).unwrap();
        assert_eq!(a.len(), b.len());
        for i in 0..a.len() {
            let id = NodeId(i);
            assert_eq!(a.max_distance(id), b.max_distance(id));
            assert_eq!(a.representative_leaf(id), b.representative_leaf(id));
            assert_eq!(a.children(id), b.children(id));
        }
    }

    #[test]
    fn test_from_nodes_rejects_zero_distance_branch() {
        let nodes = vec![
            ClusterNode { id: NodeId(0), kind: NodeKind::Leaf { food_index: 0 } },
            ClusterNode { id: NodeId(1), kind: NodeKind::Leaf { food_index: 1 } },
            ClusterNode {
                id: NodeId(2),
                kind: NodeKind::Branch {
                    children: [NodeId(0), NodeId(1)],
                    max_distance: 0.0,
                    representative: NodeId(0),
                },
            },
        ];
        assert!(ClusterTree::from_nodes(nodes, NodeId(2)).is_err());
    }

    #[test]
    fn test_from_nodes_rejects_branch_representative() {
        let nodes = vec![
            ClusterNode { id: NodeId(0), kind: NodeKind::Leaf { food_index: 0 } },
            ClusterNode { id: NodeId(1), kind: NodeKind::Leaf { food_index: 1 } },
            ClusterNode {
                id: NodeId(2),
                kind: NodeKind::Branch {
                    children: [NodeId(0), NodeId(1)],
                    max_distance: 1.0,
                    representative: NodeId(2),
                },
            },
        ];
        assert!(ClusterTree::from_nodes(nodes, NodeId(2)).is_err());
    }
}
