use super::{Curvature, ExprHandler, Feasibility, Monotonicity};
use crate::graph::NodeKind;
use crate::interval::{exp_inverse, Interval};
use crate::propagate::VarBounds;

#[derive(Debug, Default)]
pub struct ExpHandler;

impl ExprHandler for ExpHandler {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn eval(&self, _kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        Some(children[0].exp())
    }

    fn inteval(&self, _kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        children[0].exp()
    }

    fn reverse_prop(&self, _kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        children[0] = exp_inverse(bounds, children[0]);
        Feasibility::of(children)
    }

    fn curvature(&self, _kind: &NodeKind, children: &[Curvature], _activities: &[Interval]) -> Curvature {
        Curvature::compose(Curvature::Convex, Monotonicity::Increasing, children[0])
    }

    fn monotonicity(&self, _kind: &NodeKind, _child: usize, _activities: &[Interval]) -> Monotonicity {
        Monotonicity::Increasing
    }
}
