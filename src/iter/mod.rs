//! Resumable walks over the expression DAG.
//!
//! `ExprIter` keeps its own stack or queue and stores per-node state (DFS
//! cursor, DFS parent, visit tag, user data) in the node's scratch slot for
//! the iterator's slot index. It never borrows the graph between steps:
//! every step takes `&mut ExprGraph`, so the caller may read and update
//! cached node state while the walk is suspended.
//!
//! No mode recurses over expression depth.

mod stage;

pub use stage::{IterMode, Stage, StageSet};

use crate::graph::{ExprGraph, IterContext, NodeId, SlotLease};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug)]
pub struct ExprIter {
    ctx: Rc<IterContext>,
    mode: IterMode,
    curr: Option<NodeId>,
    lease: Option<SlotLease>,
    /// Zero when revisits are allowed.
    visited_tag: u64,
    stage: Stage,
    stop_stages: StageSet,
    /// Reverse-topological pending nodes with their next child index.
    stack: Vec<(NodeId, u32)>,
    /// Breadth-first frontier.
    queue: VecDeque<NodeId>,
}

impl ExprIter {
    pub fn new(graph: &ExprGraph) -> Self {
        Self {
            ctx: Rc::clone(graph.iter_context()),
            mode: IterMode::Dfs,
            curr: None,
            lease: None,
            visited_tag: 0,
            stage: Stage::Enter,
            stop_stages: StageSet::default(),
            stack: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Starts a walk from `root` and returns the first node, or `None` when
    /// `root` is `None`.
    ///
    /// With `allow_revisit == false` every node is reported at most once per
    /// walk; otherwise shared nodes are reported once per incoming edge.
    /// DFS walks and revisit-tracking walks lease a slot index from the
    /// graph's pool, which panics when exhausted.
    pub fn init(
        &mut self,
        graph: &mut ExprGraph,
        root: Option<NodeId>,
        mode: IterMode,
        allow_revisit: bool,
    ) -> Option<NodeId> {
        assert!(Rc::ptr_eq(&self.ctx, graph.iter_context()), "BUG: iterator used with a foreign graph");
        self.mode = mode;
        self.curr = None;
        self.stack.clear();
        self.queue.clear();

        if mode == IterMode::Dfs || !allow_revisit {
            if self.lease.is_none() {
                self.lease = Some(self.ctx.activate());
            }
        } else {
            self.lease = None;
        }
        self.visited_tag = if allow_revisit { 0 } else { self.ctx.next_visit_tag() };

        let root = root?;
        match mode {
            IterMode::Dfs => self.restart_dfs(graph, root),
            IterMode::Bfs => {
                self.mark_visited(graph, root);
                self.queue.push_back(root);
                self.bfs_next(graph)
            }
            IterMode::ReverseTopological => {
                self.push_leftmost(graph, root);
                self.rtopo_next(graph)
            }
        }
    }

    /// Stages at which a DFS `next` stops. Defaults to `Enter`.
    pub fn set_dfs_stop_stages(&mut self, stages: StageSet) {
        self.stop_stages = stages;
    }

    /// Restarts a DFS at `root`, keeping the visit tag: nodes already left in
    /// this walk are not entered again.
    pub fn restart_dfs(&mut self, graph: &mut ExprGraph, root: NodeId) -> Option<NodeId> {
        assert_eq!(self.mode, IterMode::Dfs, "BUG: restart_dfs on a {:?} iterator", self.mode);
        let slot = self.slot_index();
        let state = graph.store.slot_mut(root, slot);
        state.cursor = 0;
        state.parent = None;

        self.curr = Some(root);
        self.stage = Stage::Enter;
        if self.stop_stages.contains(Stage::Enter) {
            return self.curr;
        }
        self.next(graph)
    }

    pub fn next(&mut self, graph: &mut ExprGraph) -> Option<NodeId> {
        match self.mode {
            IterMode::Dfs => {
                while self.curr.is_some() {
                    self.dfs_step(graph);
                    if self.curr.is_some() && self.stop_stages.contains(self.stage) {
                        break;
                    }
                }
                self.curr
            }
            IterMode::Bfs => self.bfs_next(graph),
            IterMode::ReverseTopological => self.rtopo_next(graph),
        }
    }

    /// DFS only. From `Enter` or `VisitedChild`, abandons the rest of the
    /// current node and continues from its `Leave`; from `VisitingChild`,
    /// skips the pending child as if it had been visited.
    pub fn skip(&mut self, graph: &mut ExprGraph) -> Option<NodeId> {
        assert_eq!(self.mode, IterMode::Dfs, "BUG: skip on a {:?} iterator", self.mode);
        match self.stage {
            Stage::Enter | Stage::VisitedChild => {
                self.stage = Stage::Leave;
                if self.stop_stages.contains(Stage::Leave) {
                    return self.curr;
                }
                self.next(graph)
            }
            Stage::VisitingChild => {
                self.stage = Stage::VisitedChild;
                self.next(graph)
            }
            Stage::Leave => panic!("BUG: skip called at the leave stage"),
        }
    }

    // --- DFS state machine ---

    fn dfs_step(&mut self, graph: &mut ExprGraph) {
        let Some(node) = self.curr else { return };
        let slot = self.slot_index();
        match self.stage {
            Stage::Enter => self.select_child(graph, node),
            Stage::VisitingChild => {
                let cursor = graph.store.slot(node, slot).cursor as usize;
                let child = graph.store.get_children(node)[cursor];
                let state = graph.store.slot_mut(child, slot);
                state.cursor = 0;
                state.parent = Some(node);
                self.curr = Some(child);
                self.stage = Stage::Enter;
            }
            Stage::VisitedChild => {
                graph.store.slot_mut(node, slot).cursor += 1;
                self.select_child(graph, node);
            }
            Stage::Leave => {
                let state = graph.store.slot_mut(node, slot);
                if self.visited_tag != 0 {
                    state.visited = self.visited_tag;
                }
                self.curr = state.parent;
                self.stage = Stage::VisitedChild;
            }
        }
    }

    /// Moves the cursor of `node` to the next child not yet visited in this
    /// walk and sets the stage accordingly.
    fn select_child(&mut self, graph: &mut ExprGraph, node: NodeId) {
        let slot = self.slot_index();
        let children = graph.store.get_children(node);
        let mut cursor = graph.store.slot(node, slot).cursor as usize;
        while cursor < children.len()
            && self.visited_tag != 0
            && graph.store.slot(children[cursor], slot).visited == self.visited_tag
        {
            cursor += 1;
        }
        let has_child = cursor < children.len();
        graph.store.slot_mut(node, slot).cursor = cursor as u32;
        self.stage = if has_child { Stage::VisitingChild } else { Stage::Leave };
    }

    // --- BFS ---

    fn bfs_next(&mut self, graph: &mut ExprGraph) -> Option<NodeId> {
        self.curr = self.queue.pop_front();
        let node = self.curr?;
        for i in 0..graph.store.get_children(node).len() {
            let child = graph.store.get_children(node)[i];
            if self.is_visited(graph, child) {
                continue;
            }
            self.mark_visited(graph, child);
            self.queue.push_back(child);
        }
        self.curr
    }

    // --- Reverse topological ---

    /// Pushes `node` and its chain of first children down to a leaf or to a
    /// first child that was already reported.
    fn push_leftmost(&mut self, graph: &ExprGraph, mut node: NodeId) {
        loop {
            let children = graph.store.get_children(node);
            let Some(&first) = children.first() else {
                self.stack.push((node, 0));
                return;
            };
            self.stack.push((node, 1));
            if self.is_visited(graph, first) {
                return;
            }
            node = first;
        }
    }

    fn rtopo_next(&mut self, graph: &mut ExprGraph) -> Option<NodeId> {
        loop {
            let Some(&(node, cursor)) = self.stack.last() else {
                self.curr = None;
                return None;
            };
            let children = graph.store.get_children(node);
            if cursor as usize >= children.len() {
                self.stack.pop();
                if self.is_visited(graph, node) {
                    continue;
                }
                self.mark_visited(graph, node);
                self.curr = Some(node);
                return self.curr;
            }

            let child = children[cursor as usize];
            if let Some(top) = self.stack.last_mut() {
                top.1 += 1;
            }
            if !self.is_visited(graph, child) {
                self.push_leftmost(graph, child);
            }
        }
    }

    fn mark_visited(&self, graph: &mut ExprGraph, node: NodeId) {
        if self.visited_tag != 0 {
            let slot = self.slot_index();
            graph.store.slot_mut(node, slot).visited = self.visited_tag;
        }
    }

    // --- Queries ---

    pub fn current(&self) -> Option<NodeId> {
        self.curr
    }

    pub fn is_end(&self) -> bool {
        self.curr.is_none()
    }

    pub fn mode(&self) -> IterMode {
        self.mode
    }

    /// Current DFS stage.
    pub fn stage(&self) -> Stage {
        assert_eq!(self.mode, IterMode::Dfs, "BUG: stage of a {:?} iterator", self.mode);
        self.stage
    }

    /// Slot index leased by this iterator. Panics for revisit-allowing BFS and
    /// reverse-topological walks, which hold none.
    pub fn slot_index(&self) -> usize {
        self.lease.as_ref().map(SlotLease::index).expect("BUG: iterator holds no slot")
    }

    fn current_node(&self) -> NodeId {
        self.curr.expect("BUG: iterator is at its end")
    }

    fn assert_child_stage(&self) {
        assert!(
            self.mode == IterMode::Dfs && matches!(self.stage, Stage::VisitingChild | Stage::VisitedChild),
            "BUG: child queries need a DFS at a child stage"
        );
    }

    /// Index of the child being visited (DFS, child stages only).
    pub fn child_index(&self, graph: &ExprGraph) -> usize {
        self.assert_child_stage();
        graph.store.slot(self.current_node(), self.slot_index()).cursor as usize
    }

    pub fn current_child(&self, graph: &ExprGraph) -> NodeId {
        let index = self.child_index(graph);
        graph.children(self.current_node())[index]
    }

    /// DFS parent of the current node; `None` at the root.
    pub fn parent(&self, graph: &ExprGraph) -> Option<NodeId> {
        assert_eq!(self.mode, IterMode::Dfs, "BUG: parent of a {:?} iterator", self.mode);
        graph.store.slot(self.current_node(), self.slot_index()).parent
    }

    pub fn user_data(&self, graph: &ExprGraph) -> u64 {
        self.node_user_data(graph, self.current_node())
    }

    pub fn set_user_data(&self, graph: &mut ExprGraph, data: u64) {
        self.set_node_user_data(graph, self.current_node(), data);
    }

    pub fn child_user_data(&self, graph: &ExprGraph) -> u64 {
        self.node_user_data(graph, self.current_child(graph))
    }

    pub fn set_child_user_data(&self, graph: &mut ExprGraph, data: u64) {
        let child = self.current_child(graph);
        self.set_node_user_data(graph, child, data);
    }

    pub fn node_user_data(&self, graph: &ExprGraph, node: NodeId) -> u64 {
        graph.store.slot(node, self.slot_index()).user_data
    }

    pub fn set_node_user_data(&self, graph: &mut ExprGraph, node: NodeId, data: u64) {
        graph.store.slot_mut(node, self.slot_index()).user_data = data;
    }

    /// Whether `node` was already finished in this walk. Always `false` when
    /// revisits are allowed.
    pub fn is_visited(&self, graph: &ExprGraph, node: NodeId) -> bool {
        self.visited_tag != 0 && graph.store.slot(node, self.slot_index()).visited == self.visited_tag
    }
}
