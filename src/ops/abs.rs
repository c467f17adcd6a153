use super::{Curvature, ExprHandler, Feasibility, Monotonicity};
use crate::graph::NodeKind;
use crate::interval::{abs_inverse, Interval};
use crate::propagate::VarBounds;

#[derive(Debug, Default)]
pub struct AbsHandler;

impl ExprHandler for AbsHandler {
    fn name(&self) -> &'static str {
        "abs"
    }

    fn eval(&self, _kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        Some(children[0].abs())
    }

    fn inteval(&self, _kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        children[0].abs()
    }

    fn reverse_prop(&self, _kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        children[0] = abs_inverse(bounds, children[0]);
        Feasibility::of(children)
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], activities: &[Interval]) -> Curvature {
        Curvature::compose(Curvature::Convex, self.monotonicity(kind, 0, activities), children[0])
    }

    fn monotonicity(&self, _kind: &NodeKind, _child: usize, activities: &[Interval]) -> Monotonicity {
        let x = activities[0];
        if x.inf >= 0.0 {
            Monotonicity::Increasing
        } else if x.sup <= 0.0 {
            Monotonicity::Decreasing
        } else {
            Monotonicity::Unknown
        }
    }
}
