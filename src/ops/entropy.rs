//! Entropy term `-x ln x` on `x ≥ 0`, continuously extended with `0 ln 0 = 0`.

use super::{Curvature, ExprHandler, Feasibility, Monotonicity};
use crate::graph::NodeKind;
use crate::interval::{entropy_inverse, Interval, INV_E};
use crate::propagate::VarBounds;

#[derive(Debug, Default)]
pub struct EntropyHandler;

impl ExprHandler for EntropyHandler {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn eval(&self, _kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        match children[0] {
            x if x == 0.0 => Some(0.0),
            x if x > 0.0 => Some(-x * x.ln()),
            _ => None,
        }
    }

    fn inteval(&self, _kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        children[0].entropy()
    }

    fn reverse_prop(&self, _kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        children[0] = entropy_inverse(bounds, children[0]);
        Feasibility::of(children)
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], activities: &[Interval]) -> Curvature {
        Curvature::compose(Curvature::Concave, self.monotonicity(kind, 0, activities), children[0])
    }

    /// Rises up to `1/e`, falls after.
    fn monotonicity(&self, _kind: &NodeKind, _child: usize, activities: &[Interval]) -> Monotonicity {
        let x = activities[0];
        if x.sup <= INV_E {
            Monotonicity::Increasing
        } else if x.inf >= INV_E {
            Monotonicity::Decreasing
        } else {
            Monotonicity::Unknown
        }
    }
}
