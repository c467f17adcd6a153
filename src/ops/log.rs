//! Natural logarithm. A child reaching the pole at zero is cut off at
//! `min_zero_distance` in both directions of propagation.

use super::{Curvature, ExprHandler, Feasibility, Monotonicity, PoleGuard};
use crate::config::PropagationConfig;
use crate::graph::NodeKind;
use crate::interval::{log_inverse, Interval};
use crate::propagate::VarBounds;

#[derive(Debug)]
pub struct LogHandler {
    guard: PoleGuard,
}

impl LogHandler {
    pub fn new(config: &PropagationConfig) -> Self {
        Self { guard: PoleGuard::new(config) }
    }
}

impl ExprHandler for LogHandler {
    fn name(&self) -> &'static str {
        "log"
    }

    fn eval(&self, _kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        let x = children[0];
        (x > 0.0).then(|| x.ln())
    }

    fn inteval(&self, _kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        self.guard.relax_lower("log", children[0]).ln()
    }

    fn reverse_prop(&self, _kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        children[0] = self.guard.relax_upper("log", log_inverse(bounds, children[0]));
        Feasibility::of(children)
    }

    fn curvature(&self, _kind: &NodeKind, children: &[Curvature], _activities: &[Interval]) -> Curvature {
        Curvature::compose(Curvature::Concave, Monotonicity::Increasing, children[0])
    }

    fn monotonicity(&self, _kind: &NodeKind, _child: usize, _activities: &[Interval]) -> Monotonicity {
        Monotonicity::Increasing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{assert_close, NoVars};
    use std::f64::consts::E;

    #[test]
    fn test_reverse_from_bounded_log() {
        let h = LogHandler::new(&PropagationConfig::default());
        let mut children = [Interval::new(-1.0, 7.0)];
        let verdict = h.reverse_prop(&NodeKind::Log, Interval::new(-1.0, 1.0), &mut children);
        assert_eq!(verdict, Feasibility::Feasible);
        assert_close(children[0], Interval::new(1.0 / E, E));
        assert!(!h.guard.has_warned());
    }

    #[test]
    fn test_forward_across_zero_is_relaxed() {
        let h = LogHandler::new(&PropagationConfig::default());
        let y = h.inteval(&NodeKind::Log, &[Interval::new(-1.0, 7.0)], &NoVars);
        assert_close(y, Interval::new(1e-9_f64.ln(), 7.0_f64.ln()));
        assert!(h.guard.has_warned());
    }

    #[test]
    fn test_forward_near_pole_keeps_positive_lower_bound() {
        let h = LogHandler::new(&PropagationConfig::default());
        let y = h.inteval(&NodeKind::Log, &[Interval::new(1e-12, 1.0)], &NoVars);
        assert_close(y, Interval::new(1e-12_f64.ln(), 0.0));
        assert!(!h.guard.has_warned());
    }

    #[test]
    fn test_eval_outside_domain() {
        let h = LogHandler::new(&PropagationConfig::default());
        assert_eq!(h.eval(&NodeKind::Log, &[0.0], &[]), None);
        assert_eq!(h.eval(&NodeKind::Log, &[1.0], &[]), Some(0.0));
    }
}
