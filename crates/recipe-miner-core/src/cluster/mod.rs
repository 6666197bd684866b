//! Hierarchical clustering of the food set.

pub mod distance;
pub mod linkage;
pub mod tree;

pub use distance::DistanceMatrix;
pub use linkage::{complete_linkage, MergeStep};
pub use tree::{build_cluster_tree, ClusterNode, ClusterTree, NodeId, NodeKind};
