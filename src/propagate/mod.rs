//! Interval bound propagation over the expression DAG.
//!
//! Forward propagation computes node activities bottom-up; reverse
//! propagation pushes bounds on a node down to its children through a
//! worklist until nothing tightens. Every update is an intersection, so
//! shared sub-expressions only ever see their intervals shrink and the
//! worklist terminates.

mod bounds;

pub use bounds::{BoundChange, BoundTable, VarBounds};

use crate::graph::{ExprGraph, NodeId, NodeKind};
use crate::interval::Interval;
use crate::iter::{ExprIter, IterMode};
use crate::ops::Feasibility;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// `lhs ≤ root ≤ rhs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub root: NodeId,
    pub bounds: Interval,
}

impl Constraint {
    pub fn new(root: NodeId, lhs: f64, rhs: f64) -> Self {
        Self { root, bounds: Interval::new(lhs, rhs) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardResult {
    /// Activity of the root; empty when infeasible.
    pub activity: Interval,
    pub infeasible: bool,
    /// Activities narrowed by bounds propagated earlier in the round.
    pub tightenings: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TightenResult {
    pub infeasible: bool,
    pub tightenings: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReverseResult {
    pub infeasible: bool,
    pub tightenings: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationOutcome {
    pub infeasible: bool,
    pub rounds: u32,
    pub tightenings: u64,
}

/// Running counters over the lifetime of a `Propagator`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub forward_evals: u64,
    pub reverse_calls: u64,
    pub tightenings: u64,
    pub rounds: u64,
}

#[derive(Debug, Default)]
pub struct Propagator {
    queue: VecDeque<NodeId>,
    infeasible: bool,
    stats: PropagationStats,
}

impl Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &PropagationStats {
        &self.stats
    }

    pub fn is_infeasible(&self) -> bool {
        self.infeasible
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Opens a new round: bounds propagated in earlier rounds stop applying.
    pub fn begin_round(&mut self, graph: &mut ExprGraph) {
        graph.begin_round();
        self.queue.clear();
        // Flags left behind by a propagator dropped mid-queue.
        graph.store.in_queue.fill(false);
        self.infeasible = false;
    }

    fn clear_queue(&mut self, graph: &mut ExprGraph) {
        for node in self.queue.drain(..) {
            if graph.is_alive(node) {
                graph.store.in_queue[node.index()] = false;
            }
        }
    }

    /// Recomputes the activities below `root`, children first. Only nodes
    /// whose activity is stale are re-evaluated unless `force` is set.
    pub fn forward_prop(
        &mut self,
        graph: &mut ExprGraph,
        vars: &dyn VarBounds,
        root: NodeId,
        force: bool,
    ) -> ForwardResult {
        let epoch = graph.bounds_epoch();
        let mut result = ForwardResult { activity: Interval::ENTIRE, infeasible: false, tightenings: 0 };
        let mut child_activities: SmallVec<[Interval; 4]> = SmallVec::new();

        let mut it = ExprIter::new(graph);
        let mut node = it.init(graph, Some(root), IterMode::ReverseTopological, false);
        while let Some(id) = node {
            let idx = id.index();
            if force || graph.store.activity_tag[idx] != epoch {
                child_activities.clear();
                child_activities.extend(graph.store.get_children(id).iter().map(|c| graph.store.activity[c.index()]));

                let mut activity = if child_activities.iter().any(Interval::is_empty) {
                    Interval::EMPTY
                } else {
                    let kind = &graph.store.kinds[idx];
                    graph.handlers().for_kind(kind).inteval(kind, &child_activities, vars)
                };
                self.stats.forward_evals += 1;

                if let Some(bounds) = graph.prop_bounds(id) {
                    let narrowed = activity.intersect(&bounds);
                    if narrowed != activity {
                        result.tightenings += 1;
                        activity = narrowed;
                    }
                }
                graph.store.activity[idx] = activity;
                graph.store.activity_tag[idx] = epoch;
            }

            if graph.store.activity[idx].is_empty() {
                log::debug!("forward propagation: empty activity at {:?}", id);
                result.infeasible = true;
                self.infeasible = true;
                break;
            }
            node = it.next(graph);
        }

        result.activity = if result.infeasible { Interval::EMPTY } else { graph.store.activity[root.index()] };
        result
    }

    /// Bounds of `node` as far as this round knows them.
    fn current_bounds(&self, graph: &ExprGraph, vars: &dyn VarBounds, node: NodeId) -> Interval {
        let idx = node.index();
        let base = match &graph.store.kinds[idx] {
            NodeKind::Var(var) => vars.bounds(*var),
            NodeKind::Value(v) => Interval::point(*v),
            _ if graph.store.activity_tag[idx] >= graph.round_bounds_epoch() => graph.store.activity[idx],
            _ => Interval::ENTIRE,
        };
        match graph.prop_bounds(node) {
            Some(bounds) => base.intersect(&bounds),
            None => base,
        }
    }

    /// Intersects the bounds of `node` with `interval`. A strict tightening is
    /// recorded as the node's propagated bounds and then either pushed to the
    /// bound store (variables) or queued for reverse propagation.
    pub fn tighten_interval(
        &mut self,
        graph: &mut ExprGraph,
        vars: &mut dyn VarBounds,
        node: NodeId,
        interval: Interval,
    ) -> TightenResult {
        let current = self.current_bounds(graph, &*vars, node);
        let narrowed = current.intersect(&interval);
        if narrowed.is_empty() {
            log::debug!("{:?}: {} does not meet {}", node, interval, current);
            self.infeasible = true;
            return TightenResult { infeasible: true, tightenings: 0 };
        }
        if !narrowed.is_tighter_than(&current, graph.config().min_tightening) {
            return TightenResult::default();
        }

        log::trace!("{:?}: {} -> {}", node, current, narrowed);
        let idx = node.index();
        graph.store.prop_bounds[idx] = narrowed;
        graph.store.prop_tag[idx] = graph.round_epoch();
        if graph.store.activity_tag[idx] >= graph.round_bounds_epoch() {
            graph.store.activity[idx] = graph.store.activity[idx].intersect(&narrowed);
        }
        self.stats.tightenings += 1;

        match graph.store.kinds[idx] {
            NodeKind::Var(var) => match vars.tighten(var, narrowed) {
                BoundChange::Tightened => {
                    graph.bump_bounds_epoch();
                }
                BoundChange::Unchanged => {}
                BoundChange::Infeasible => {
                    self.infeasible = true;
                    return TightenResult { infeasible: true, tightenings: 1 };
                }
            },
            NodeKind::Value(_) => {}
            _ => {
                if !graph.store.in_queue[idx] {
                    graph.store.in_queue[idx] = true;
                    self.queue.push_back(node);
                }
            }
        }
        TightenResult { infeasible: false, tightenings: 1 }
    }

    /// Runs reverse propagation until the queue is empty or infeasibility is
    /// found, in which case the remaining queue is discarded.
    pub fn drain_reverse_queue(&mut self, graph: &mut ExprGraph, vars: &mut dyn VarBounds) -> ReverseResult {
        let mut result = ReverseResult::default();
        let mut child_bounds: SmallVec<[Interval; 4]> = SmallVec::new();

        'queue: while let Some(node) = self.queue.pop_front() {
            let idx = node.index();
            graph.store.in_queue[idx] = false;

            let bounds = self.current_bounds(graph, &*vars, node);
            let children: SmallVec<[NodeId; 4]> = SmallVec::from_slice(graph.store.get_children(node));
            child_bounds.clear();
            child_bounds.extend(children.iter().map(|&c| self.current_bounds(graph, &*vars, c)));

            let kind = &graph.store.kinds[idx];
            let verdict = graph.handlers().for_kind(kind).reverse_prop(kind, bounds, &mut child_bounds);
            self.stats.reverse_calls += 1;
            if verdict == Feasibility::Infeasible {
                log::debug!("reverse propagation: {:?} has no consistent children under {}", node, bounds);
                result.infeasible = true;
                break;
            }

            for (&child, &interval) in children.iter().zip(child_bounds.iter()) {
                let tightened = self.tighten_interval(graph, vars, child, interval);
                result.tightenings += tightened.tightenings;
                if tightened.infeasible {
                    result.infeasible = true;
                    break 'queue;
                }
            }
        }

        if result.infeasible {
            self.infeasible = true;
            self.clear_queue(graph);
        }
        result
    }

    /// Alternates forward and reverse propagation over `constraints` until a
    /// round leaves every variable bound unchanged, infeasibility is found, or
    /// `max_rounds` is reached.
    pub fn propagate(
        &mut self,
        graph: &mut ExprGraph,
        vars: &mut dyn VarBounds,
        constraints: &[Constraint],
    ) -> PropagationOutcome {
        let mut outcome = PropagationOutcome::default();
        let max_rounds = graph.config().max_rounds;

        while outcome.rounds < max_rounds {
            self.begin_round(graph);
            self.stats.rounds += 1;
            outcome.rounds += 1;
            let epoch_before = graph.bounds_epoch();
            let mut round_tightenings = 0u64;

            for constraint in constraints {
                let forward = self.forward_prop(graph, &*vars, constraint.root, false);
                round_tightenings += u64::from(forward.tightenings);
                if forward.infeasible {
                    outcome.infeasible = true;
                    break;
                }
                let tightened = self.tighten_interval(graph, vars, constraint.root, constraint.bounds);
                round_tightenings += u64::from(tightened.tightenings);
                if tightened.infeasible {
                    outcome.infeasible = true;
                    break;
                }
                let reverse = self.drain_reverse_queue(graph, vars);
                round_tightenings += u64::from(reverse.tightenings);
                if reverse.infeasible {
                    outcome.infeasible = true;
                    break;
                }
            }

            outcome.tightenings += round_tightenings;
            log::debug!(
                "propagation round {}: {} tightenings{}",
                outcome.rounds,
                round_tightenings,
                if outcome.infeasible { ", infeasible" } else { "" }
            );
            if outcome.infeasible || graph.bounds_epoch() == epoch_before {
                break;
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests;
