//! The variable bound store consulted and tightened by propagation.

use crate::graph::VarId;
use crate::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundChange {
    Unchanged,
    Tightened,
    /// The requested bounds do not meet the current ones.
    Infeasible,
}

/// Source of variable domains.
pub trait VarBounds {
    fn bounds(&self, var: VarId) -> Interval;

    /// Intersects the domain of `var` with `bounds`.
    fn tighten(&mut self, var: VarId, bounds: Interval) -> BoundChange;
}

/// In-memory bound store indexed by `VarId`. Unknown variables are unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundTable {
    bounds: Vec<Interval>,
    min_tightening: f64,
}

impl BoundTable {
    pub fn new(bounds: Vec<Interval>) -> Self {
        Self { bounds, min_tightening: 0.0 }
    }

    /// Changes smaller than `eps` (relative) are reported as `Unchanged` and
    /// not applied.
    pub fn with_min_tightening(mut self, eps: f64) -> Self {
        self.min_tightening = eps;
        self
    }

    pub fn set(&mut self, var: VarId, bounds: Interval) {
        if self.bounds.len() <= var.index() {
            self.bounds.resize(var.index() + 1, Interval::ENTIRE);
        }
        self.bounds[var.index()] = bounds;
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.bounds
    }
}

impl VarBounds for BoundTable {
    fn bounds(&self, var: VarId) -> Interval {
        self.bounds.get(var.index()).copied().unwrap_or(Interval::ENTIRE)
    }

    fn tighten(&mut self, var: VarId, bounds: Interval) -> BoundChange {
        let current = self.bounds(var);
        let narrowed = current.intersect(&bounds);
        if narrowed.is_empty() {
            return BoundChange::Infeasible;
        }
        if !narrowed.is_tighter_than(&current, self.min_tightening) {
            return BoundChange::Unchanged;
        }
        self.set(var, narrowed);
        BoundChange::Tightened
    }
}
