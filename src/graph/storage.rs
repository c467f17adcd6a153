//! storage.rs
//! Columnar node arena with reference counts, cached intervals and iterator
//! scratch slots.

use crate::graph::NodeKind;
use crate::interval::Interval;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
    pub fn new(idx: usize) -> Self {
        Self(idx as u32)
    }
}

/// Per-node, per-iterator scratch state, indexed by the iterator's slot index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterSlot {
    /// Visit tag of the last iterator that finished this node in this slot.
    pub visited: u64,
    /// Next child a DFS will consider.
    pub cursor: u32,
    /// DFS parent; only meaningful while the walk that set it is running.
    pub parent: Option<NodeId>,
    pub user_data: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub kinds: Vec<NodeKind>,
    pub children: Vec<SmallVec<[NodeId; 4]>>,
    /// Zero marks a free entry.
    pub refcounts: Vec<u32>,

    // Cached numeric state
    pub activity: Vec<Interval>,
    pub activity_tag: Vec<u64>,
    pub prop_bounds: Vec<Interval>,
    pub prop_tag: Vec<u64>,
    pub in_queue: Vec<bool>,
    pub values: Vec<Option<f64>>,

    pub slots: Vec<SmallVec<[IterSlot; 2]>>,
    free: Vec<NodeId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn count(&self) -> usize {
        self.kinds.len() - self.free.len()
    }

    /// Number of entries, live or free.
    pub fn capacity(&self) -> usize {
        self.kinds.len()
    }

    #[inline(always)]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.refcounts.get(id.index()).is_some_and(|&rc| rc > 0)
    }

    /// Stores a node with reference count 1 and captures each child.
    pub fn add_node(&mut self, kind: NodeKind, children: &[NodeId]) -> NodeId {
        for &child in children {
            self.capture(child);
        }
        let children: SmallVec<[NodeId; 4]> = SmallVec::from_slice(children);

        if let Some(id) = self.free.pop() {
            let idx = id.index();
            self.kinds[idx] = kind;
            self.children[idx] = children;
            self.refcounts[idx] = 1;
            self.reset_caches(idx);
            return id;
        }

        let id = NodeId::new(self.kinds.len());
        self.kinds.push(kind);
        self.children.push(children);
        self.refcounts.push(1);
        self.activity.push(Interval::ENTIRE);
        self.activity_tag.push(0);
        self.prop_bounds.push(Interval::ENTIRE);
        self.prop_tag.push(0);
        self.in_queue.push(false);
        self.values.push(None);
        self.slots.push(SmallVec::new());
        id
    }

    fn reset_caches(&mut self, idx: usize) {
        self.activity[idx] = Interval::ENTIRE;
        self.activity_tag[idx] = 0;
        self.prop_bounds[idx] = Interval::ENTIRE;
        self.prop_tag[idx] = 0;
        self.in_queue[idx] = false;
        self.values[idx] = None;
        self.slots[idx].clear();
    }

    pub fn capture(&mut self, id: NodeId) {
        assert!(self.is_alive(id), "BUG: capture of released node {:?}", id);
        self.refcounts[id.index()] += 1;
    }

    /// Drops one reference. Nodes reaching zero are freed and their children
    /// released in turn; `on_free` sees every freed node before its entry is
    /// recycled. Uses an explicit stack, so expression depth is not bounded
    /// by the native stack.
    pub fn release(&mut self, id: NodeId, mut on_free: impl FnMut(NodeId, &NodeKind)) {
        let mut pending = vec![id];
        while let Some(node) = pending.pop() {
            assert!(self.is_alive(node), "BUG: release of released node {:?}", node);
            let idx = node.index();
            self.refcounts[idx] -= 1;
            if self.refcounts[idx] > 0 {
                continue;
            }
            on_free(node, &self.kinds[idx]);
            pending.extend(std::mem::take(&mut self.children[idx]));
            self.kinds[idx] = NodeKind::Value(0.0);
            self.reset_caches(idx);
            self.free.push(node);
        }
    }

    #[inline(always)]
    pub fn get_children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id.index()]
    }

    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.capture(child);
        self.children[parent.index()].push(child);
    }

    /// Scratch slot of `id` for iterator slot `index`; default when never written.
    #[inline]
    pub fn slot(&self, id: NodeId, index: usize) -> IterSlot {
        self.slots[id.index()].get(index).copied().unwrap_or_default()
    }

    /// Mutable scratch slot, growing the node's slot array on demand.
    #[inline]
    pub fn slot_mut(&mut self, id: NodeId, index: usize) -> &mut IterSlot {
        let slots = &mut self.slots[id.index()];
        if slots.len() <= index {
            slots.resize(index + 1, IterSlot::default());
        }
        &mut slots[index]
    }
}
