//! Whole-graph ordering and Graphviz export, via petgraph.

use crate::display::node_label;
use crate::graph::{ExprGraph, GraphError, NodeId};
use crate::iter::{ExprIter, IterMode};
use petgraph::algo::toposort;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Copies the expression below `root` into a petgraph graph. Edges point from
/// operator to operand and carry the operand position; shared subexpressions
/// appear once.
pub fn to_digraph(graph: &mut ExprGraph, root: NodeId) -> (DiGraph<String, usize>, HashMap<NodeId, NodeIndex>) {
    let mut dg = DiGraph::new();
    let mut index = HashMap::new();

    let mut it = ExprIter::new(graph);
    let mut node = it.init(graph, Some(root), IterMode::Bfs, false);
    while let Some(id) = node {
        index.insert(id, dg.add_node(node_label(graph, id)));
        node = it.next(graph);
    }
    for (&id, &from) in &index {
        for (pos, child) in graph.children(id).iter().enumerate() {
            dg.add_edge(from, index[child], pos);
        }
    }
    (dg, index)
}

/// Graphviz rendering of the expression below `root`.
pub fn to_dot(graph: &mut ExprGraph, root: NodeId) -> String {
    let (dg, _) = to_digraph(graph, root);
    format!("{}", Dot::new(&dg))
}

/// Every live node, operands before the operators that use them.
///
/// Builders cannot create cycles, so an error here means the arena was
/// corrupted.
pub fn topological_order(graph: &ExprGraph) -> Result<Vec<NodeId>, GraphError> {
    let capacity = graph.store.capacity();
    let mut dg: DiGraph<NodeId, ()> = DiGraph::with_capacity(capacity, capacity);
    let mut index = vec![None; capacity];
    for i in 0..capacity {
        let id = NodeId::new(i);
        if graph.is_alive(id) {
            index[i] = Some(dg.add_node(id));
        }
    }
    for (i, from) in index.iter().enumerate() {
        let Some(parent) = *from else { continue };
        for child in graph.store.get_children(NodeId::new(i)) {
            if let Some(operand) = index[child.index()] {
                dg.add_edge(operand, parent, ());
            }
        }
    }
    toposort(&dg, None)
        .map(|order| order.into_iter().map(|ix| dg[ix]).collect())
        .map_err(|cycle| GraphError::CycleDetected { node: dg[cycle.node_id()] })
}

pub fn check_acyclic(graph: &ExprGraph) -> Result<(), GraphError> {
    topological_order(graph).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::VarId;

    #[test]
    fn test_order_diamond_dependency() {
        // Shape: x -> a, x -> b, a+b -> d
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        let a = g.exp(x);
        let b = g.log(x);
        let d = g.sum(&[a, b], &[1.0, 1.0], 0.0).unwrap();

        let order = topological_order(&g).expect("Sort failed");
        let pos = |id: NodeId| order.iter().position(|&n| n == id).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos(x) < pos(a));
        assert!(pos(x) < pos(b));
        assert!(pos(a) < pos(d));
        assert!(pos(b) < pos(d));
    }

    #[test]
    fn test_cycle_detection_explicit() {
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        let s = g.sum(&[x], &[1.0], 0.0).unwrap();
        let e = g.exp(s);
        assert!(check_acyclic(&g).is_ok());

        // HACK: bypass append_child, which refuses to close the loop.
        g.store.children[s.index()].push(e);

        let err = check_acyclic(&g).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { node } if node == s || node == e), "{err}");
    }

    #[test]
    fn test_dot_export_shares_subexpressions() {
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        let sq = g.pow(x, 2.0);
        let e = g.exp(sq);
        let root = g.sum(&[sq, e], &[1.0, 1.0], 0.0).unwrap();

        let (dg, index) = to_digraph(&mut g, root);
        assert_eq!(dg.node_count(), 4);
        assert_eq!(dg.edge_count(), 4);
        assert_eq!(dg[index[&sq]], "pow(2)");

        let dot = to_dot(&mut g, root);
        assert!(dot.starts_with("digraph"));
        assert_eq!(dot.matches("->").count(), 4);
        assert!(dot.contains("x0"));
    }
}
