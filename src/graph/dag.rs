//! dag.rs
//! Wraps the low-level Registry with builders, reference counting and the
//! epoch bookkeeping shared by traversal and propagation.

use super::context::{EpochCounter, IterContext};
use super::error::GraphError;
use super::node::{NodeKind, VarId};
use super::storage::{NodeId, Registry};
use crate::config::PropagationConfig;
use crate::interval::Interval;
use crate::ops::OperatorTable;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

#[derive(Debug)]
pub struct ExprGraph {
    pub(crate) store: Registry,
    pub(crate) iter_ctx: Rc<IterContext>,
    epochs: EpochCounter,
    /// Revision of the variable bounds; activities tagged with it are fresh.
    bounds_epoch: u64,
    /// Tag of the current propagation round.
    round_epoch: u64,
    /// Bounds revision at the start of the current round.
    round_bounds_epoch: u64,
    var_nodes: HashMap<VarId, NodeId>,
    handlers: OperatorTable,
    config: PropagationConfig,
}

impl Default for ExprGraph {
    fn default() -> Self {
        Self::with_config(PropagationConfig::default())
    }
}

impl ExprGraph {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: PropagationConfig) -> Self {
        let mut epochs = EpochCounter::new();
        let bounds_epoch = epochs.mint();
        let round_epoch = epochs.mint();
        Self {
            store: Registry::new(),
            iter_ctx: Rc::new(IterContext::new()),
            epochs,
            bounds_epoch,
            round_epoch,
            round_bounds_epoch: bounds_epoch,
            var_nodes: HashMap::new(),
            handlers: OperatorTable::new(&config),
            config,
        }
    }

    // --- Builders ---
    // Every builder returns a handle owning one reference.

    /// The node of `var`. Variables are shared: asking twice returns the same
    /// node with one more reference.
    pub fn var(&mut self, var: VarId) -> NodeId {
        if let Some(&id) = self.var_nodes.get(&var) {
            self.store.capture(id);
            return id;
        }
        let id = self.store.add_node(NodeKind::Var(var), &[]);
        self.var_nodes.insert(var, id);
        id
    }

    pub fn value(&mut self, value: f64) -> NodeId {
        self.store.add_node(NodeKind::Value(value), &[])
    }

    /// `constant + Σ coefs[i] · children[i]`.
    pub fn sum(&mut self, children: &[NodeId], coefs: &[f64], constant: f64) -> Result<NodeId, GraphError> {
        let kind = NodeKind::Sum { coefs: SmallVec::from_slice(coefs), constant };
        self.add_node(kind, children)
    }

    /// `coef · Π children[i]`.
    pub fn product(&mut self, children: &[NodeId], coef: f64) -> Result<NodeId, GraphError> {
        self.add_node(NodeKind::Product { coef }, children)
    }

    pub fn pow(&mut self, child: NodeId, exponent: f64) -> NodeId {
        self.store.add_node(NodeKind::Pow { exponent }, &[child])
    }

    pub fn exp(&mut self, child: NodeId) -> NodeId {
        self.store.add_node(NodeKind::Exp, &[child])
    }

    pub fn log(&mut self, child: NodeId) -> NodeId {
        self.store.add_node(NodeKind::Log, &[child])
    }

    pub fn sin(&mut self, child: NodeId) -> NodeId {
        self.store.add_node(NodeKind::Sin, &[child])
    }

    pub fn cos(&mut self, child: NodeId) -> NodeId {
        self.store.add_node(NodeKind::Cos, &[child])
    }

    pub fn abs(&mut self, child: NodeId) -> NodeId {
        self.store.add_node(NodeKind::Abs, &[child])
    }

    pub fn entropy(&mut self, child: NodeId) -> NodeId {
        self.store.add_node(NodeKind::Entropy, &[child])
    }

    /// Generic builder; validates the child count against the kind.
    pub fn add_node(&mut self, kind: NodeKind, children: &[NodeId]) -> Result<NodeId, GraphError> {
        if let Some(expected) = kind.arity() {
            if expected != children.len() {
                return Err(GraphError::ChildCount { op: kind.op(), expected, got: children.len() });
            }
        }
        if let NodeKind::Sum { coefs, .. } = &kind {
            if coefs.len() != children.len() {
                return Err(GraphError::CoefficientCount { children: children.len(), coefs: coefs.len() });
            }
        }
        if let NodeKind::Var(var) = kind {
            return Ok(self.var(var));
        }
        Ok(self.store.add_node(kind, children))
    }

    /// Appends `child` to a sum (with coefficient `coef`) or a product (whose
    /// coefficient is scaled by `coef`).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId, coef: f64) -> Result<(), GraphError> {
        self.assert_alive(parent);
        self.assert_alive(child);
        let op = self.store.kinds[parent.index()].op();
        if !self.store.kinds[parent.index()].is_associative() {
            return Err(GraphError::NotAssociative { node: parent, op });
        }
        if self.reaches(child, parent) {
            return Err(GraphError::WouldCreateCycle { parent, child });
        }

        match &mut self.store.kinds[parent.index()] {
            NodeKind::Sum { coefs, .. } => coefs.push(coef),
            NodeKind::Product { coef: c } => *c *= coef,
            _ => unreachable!("BUG: associative kinds are sum and product"),
        }
        self.store.push_child(parent, child);
        // Cached activities of the parent and its ancestors no longer hold.
        self.bump_bounds_epoch();
        Ok(())
    }

    /// Whether `target` is `from` or one of its descendants.
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == target {
                return true;
            }
            if visited.insert(node) {
                queue.extend(self.store.get_children(node).iter().copied());
            }
        }
        false
    }

    // --- Reference counting ---

    pub fn capture(&mut self, id: NodeId) {
        self.store.capture(id);
    }

    /// Drops one reference; frees the node and, transitively, children whose
    /// count reaches zero.
    pub fn release(&mut self, id: NodeId) {
        let var_nodes = &mut self.var_nodes;
        self.store.release(id, |_, kind| {
            if let NodeKind::Var(var) = kind {
                var_nodes.remove(var);
            }
        });
    }

    // --- Accessors ---

    #[inline(always)]
    fn assert_alive(&self, id: NodeId) {
        assert!(self.store.is_alive(id), "BUG: access to released node {:?}", id);
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.assert_alive(id);
        &self.store.kinds[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.assert_alive(id);
        self.store.get_children(id)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn refcount(&self, id: NodeId) -> u32 {
        self.store.refcounts.get(id.index()).copied().unwrap_or(0)
    }

    pub fn is_alive(&self, id: NodeId) -> bool { self.store.is_alive(id) }

    pub fn node_count(&self) -> usize { self.store.count() }

    pub fn var_node(&self, var: VarId) -> Option<NodeId> {
        self.var_nodes.get(&var).copied()
    }

    /// Last cached activity, fresh or not.
    pub fn activity(&self, id: NodeId) -> Interval {
        self.assert_alive(id);
        self.store.activity[id.index()]
    }

    pub fn activity_tag(&self, id: NodeId) -> u64 {
        self.store.activity_tag[id.index()]
    }

    /// Whether the activity was computed against the current bounds.
    pub fn is_activity_fresh(&self, id: NodeId) -> bool {
        self.store.activity_tag[id.index()] == self.bounds_epoch
    }

    /// Bounds propagated onto the node in the current round, if any.
    pub fn prop_bounds(&self, id: NodeId) -> Option<Interval> {
        self.assert_alive(id);
        (self.store.prop_tag[id.index()] == self.round_epoch).then(|| self.store.prop_bounds[id.index()])
    }

    /// Result of the last point evaluation that reached this node.
    pub fn value_of(&self, id: NodeId) -> Option<f64> {
        self.assert_alive(id);
        self.store.values[id.index()]
    }

    pub fn handlers(&self) -> &OperatorTable { &self.handlers }

    pub fn handlers_mut(&mut self) -> &mut OperatorTable { &mut self.handlers }

    pub fn config(&self) -> &PropagationConfig { &self.config }

    pub fn iter_context(&self) -> &Rc<IterContext> { &self.iter_ctx }

    // --- Epochs ---

    pub fn bounds_epoch(&self) -> u64 { self.bounds_epoch }

    pub fn round_epoch(&self) -> u64 { self.round_epoch }

    pub fn round_bounds_epoch(&self) -> u64 { self.round_bounds_epoch }

    /// Marks every cached activity stale. Call after any change of variable
    /// bounds made outside the propagator.
    pub fn bump_bounds_epoch(&mut self) -> u64 {
        self.bounds_epoch = self.epochs.mint();
        self.bounds_epoch
    }

    /// Starts a new propagation round; bounds of earlier rounds go stale.
    pub(crate) fn begin_round(&mut self) -> u64 {
        self.round_epoch = self.epochs.mint();
        self.round_bounds_epoch = self.bounds_epoch;
        self.round_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_shared() {
        let mut g = ExprGraph::new();
        let a = g.var(VarId(0));
        let b = g.var(VarId(0));
        assert_eq!(a, b);
        assert_eq!(g.refcount(a), 2);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_builders_capture_children() {
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        let sq = g.pow(x, 2.0);
        let s = g.sum(&[sq, x], &[1.0, -1.0], 0.0).unwrap();
        assert_eq!(g.refcount(x), 3);
        assert_eq!(g.children(s), &[sq, x]);

        g.release(x);
        g.release(sq);
        assert!(g.is_alive(x));
        g.release(s);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.var_node(VarId(0)), None);
    }

    #[test]
    fn test_arity_is_validated() {
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        let y = g.var(VarId(1));
        assert_eq!(
            g.add_node(NodeKind::Log, &[x, y]),
            Err(GraphError::ChildCount { op: crate::graph::OpKind::Log, expected: 1, got: 2 })
        );
        assert_eq!(
            g.sum(&[x, y], &[1.0], 0.0),
            Err(GraphError::CoefficientCount { children: 2, coefs: 1 })
        );
    }

    #[test]
    fn test_append_child_rejects_cycles() {
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        let s = g.sum(&[x], &[1.0], 0.0).unwrap();
        let e = g.exp(s);

        assert!(matches!(g.append_child(s, e, 1.0), Err(GraphError::WouldCreateCycle { .. })));
        assert!(matches!(g.append_child(s, s, 1.0), Err(GraphError::WouldCreateCycle { .. })));
        assert!(matches!(g.append_child(e, x, 1.0), Err(GraphError::NotAssociative { .. })));

        let y = g.var(VarId(1));
        let before = g.bounds_epoch();
        g.append_child(s, y, 3.0).unwrap();
        assert_eq!(g.children(s), &[x, y]);
        assert!(matches!(g.kind(s), NodeKind::Sum { coefs, .. } if coefs.as_slice() == [1.0, 3.0]));
        assert!(g.bounds_epoch() > before);
    }

    #[test]
    #[should_panic(expected = "released node")]
    fn test_reading_released_node_panics() {
        let mut g = ExprGraph::new();
        let v = g.value(1.0);
        g.release(v);
        g.kind(v);
    }

    #[test]
    fn test_prop_bounds_expire_with_round() {
        let mut g = ExprGraph::new();
        let x = g.var(VarId(0));
        g.begin_round();
        let round = g.round_epoch();
        g.store.prop_bounds[x.index()] = Interval::new(0.0, 1.0);
        g.store.prop_tag[x.index()] = round;
        assert_eq!(g.prop_bounds(x), Some(Interval::new(0.0, 1.0)));
        g.begin_round();
        assert_eq!(g.prop_bounds(x), None);
    }
}
