//! context.rs
//! Per-graph traversal bookkeeping: the iterator slot pool, visit tags, and
//! the epoch counter behind activity and propagation tags.

use std::cell::Cell;
use std::rc::Rc;

/// Upper bound on iterators holding a slot on one graph at the same time.
pub const MAX_ACTIVE_ITERATORS: usize = 5;

/// Monotone source of tags. Zero is never minted and means "never".
#[derive(Debug, Clone, Default)]
pub struct EpochCounter {
    last: u64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> u64 {
        self.last = self.last.checked_add(1).expect("BUG: epoch counter overflow");
        self.last
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}

/// Shared between a graph and its iterators through an `Rc`, so iterators do
/// not borrow the graph between steps.
#[derive(Debug, Default)]
pub struct IterContext {
    active: Cell<u8>,
    visit_tag: Cell<u64>,
}

impl IterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leases the lowest free slot index. Panics when all
    /// `MAX_ACTIVE_ITERATORS` slots are taken.
    pub fn activate(self: &Rc<Self>) -> SlotLease {
        let active = self.active.get();
        let index = (0..MAX_ACTIVE_ITERATORS)
            .find(|i| active & (1 << i) == 0)
            .unwrap_or_else(|| {
                panic!("BUG: more than {} active iterators on one graph", MAX_ACTIVE_ITERATORS)
            });
        self.active.set(active | (1 << index));
        SlotLease { ctx: Rc::clone(self), index }
    }

    pub fn active_count(&self) -> usize {
        self.active.get().count_ones() as usize
    }

    /// Fresh non-zero tag identifying one revisit-tracking walk.
    pub fn next_visit_tag(&self) -> u64 {
        let tag = self.visit_tag.get().checked_add(1).expect("BUG: visit tag overflow");
        self.visit_tag.set(tag);
        tag
    }

    fn deactivate(&self, index: usize) {
        let active = self.active.get();
        debug_assert!(active & (1 << index) != 0, "BUG: slot {} released twice", index);
        self.active.set(active & !(1 << index));
    }
}

/// Exclusive use of one iterator slot index; returned to the pool on drop.
#[derive(Debug)]
pub struct SlotLease {
    ctx: Rc<IterContext>,
    index: usize,
}

impl SlotLease {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.ctx.deactivate(self.index);
    }
}
