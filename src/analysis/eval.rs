//! Point evaluation and constant folding.

use crate::graph::{ExprGraph, NodeId};
use crate::iter::{ExprIter, IterMode, StageSet};
use smallvec::SmallVec;

/// Evaluates `root` at `solution` (indexed by `VarId`), caching every
/// intermediate value on its node. `None` when some node is evaluated outside
/// its domain; the failure propagates to every ancestor.
pub fn evaluate(graph: &mut ExprGraph, root: NodeId, solution: &[f64]) -> Option<f64> {
    let mut it = ExprIter::new(graph);
    let mut node = it.init(graph, Some(root), IterMode::ReverseTopological, false);
    while let Some(id) = node {
        let children: Option<SmallVec<[f64; 4]>> =
            graph.children(id).iter().map(|c| graph.store.values[c.index()]).collect();
        let value = children.and_then(|values| {
            let kind = graph.kind(id);
            graph.handlers().for_kind(kind).eval(kind, &values, solution)
        });
        graph.store.values[id.index()] = value;
        node = it.next(graph);
    }
    graph.value_of(root)
}

/// User data marker for "not constant". A NaN, so no folded value collides.
const NOT_CONSTANT: u64 = u64::MAX;

fn decode(bits: u64) -> Option<f64> {
    let value = f64::from_bits(bits);
    (bits != NOT_CONSTANT && !value.is_nan()).then_some(value)
}

/// Value of `root` if it does not depend on any variable.
pub fn fold_constant(graph: &mut ExprGraph, root: NodeId) -> Option<f64> {
    let mut it = ExprIter::new(graph);
    it.set_dfs_stop_stages(StageSet::LEAVE);
    let mut node = it.init(graph, Some(root), IterMode::Dfs, false);
    while let Some(id) = node {
        let folded = {
            let constants: SmallVec<[Option<f64>; 4]> =
                graph.children(id).iter().map(|&c| decode(it.node_user_data(graph, c))).collect();
            let kind = graph.kind(id);
            graph.handlers().for_kind(kind).simplify(kind, &constants)
        };
        it.set_user_data(graph, folded.map_or(NOT_CONSTANT, f64::to_bits));
        node = it.next(graph);
    }
    decode(it.node_user_data(graph, root))
}
