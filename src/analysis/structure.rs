//! Structural hashing and convexity detection.
//!
//! All three analyses walk the expression depth first, finishing each child
//! before its parent, and keep per-node results in the iterator's user data.
//! Curvature and monotonicity read the cached activities, so run forward
//! propagation first when they should reflect current bounds.

use crate::graph::{ExprGraph, NodeId};
use crate::interval::Interval;
use crate::iter::{ExprIter, IterMode, StageSet};
use crate::ops::{Curvature, Monotonicity};
use smallvec::SmallVec;

/// Hash of the expression below `root`; equal for structurally equal
/// expressions, including sums and products whose operands are permuted.
pub fn hash_expr(graph: &mut ExprGraph, root: NodeId) -> u64 {
    let mut it = ExprIter::new(graph);
    it.set_dfs_stop_stages(StageSet::LEAVE);
    let mut node = it.init(graph, Some(root), IterMode::Dfs, false);
    while let Some(id) = node {
        let hash = {
            let child_hashes: SmallVec<[u64; 4]> =
                graph.children(id).iter().map(|&c| it.node_user_data(graph, c)).collect();
            let kind = graph.kind(id);
            graph.handlers().for_kind(kind).hash(kind, &child_hashes)
        };
        it.set_user_data(graph, hash);
        node = it.next(graph);
    }
    it.node_user_data(graph, root)
}

fn encode(curvature: Curvature) -> u64 {
    match curvature {
        Curvature::Linear => 0,
        Curvature::Convex => 1,
        Curvature::Concave => 2,
        Curvature::Unknown => 3,
    }
}

fn decode(code: u64) -> Curvature {
    match code {
        0 => Curvature::Linear,
        1 => Curvature::Convex,
        2 => Curvature::Concave,
        _ => Curvature::Unknown,
    }
}

fn child_activities(graph: &ExprGraph, node: NodeId) -> SmallVec<[Interval; 4]> {
    graph.children(node).iter().map(|&c| graph.activity(c)).collect()
}

pub fn curvature(graph: &mut ExprGraph, root: NodeId) -> Curvature {
    let mut it = ExprIter::new(graph);
    it.set_dfs_stop_stages(StageSet::LEAVE);
    let mut node = it.init(graph, Some(root), IterMode::Dfs, false);
    while let Some(id) = node {
        let curv = {
            let children: SmallVec<[Curvature; 4]> =
                graph.children(id).iter().map(|&c| decode(it.node_user_data(graph, c))).collect();
            let activities = child_activities(graph, id);
            let kind = graph.kind(id);
            graph.handlers().for_kind(kind).curvature(kind, &children, &activities)
        };
        it.set_user_data(graph, encode(curv));
        node = it.next(graph);
    }
    decode(it.node_user_data(graph, root))
}

/// Monotonicity of `node` in its `child`-th argument.
pub fn monotonicity(graph: &ExprGraph, node: NodeId, child: usize) -> Monotonicity {
    assert!(child < graph.child_count(node), "BUG: {:?} has no child {}", node, child);
    let activities = child_activities(graph, node);
    let kind = graph.kind(node);
    graph.handlers().for_kind(kind).monotonicity(kind, child, &activities)
}
