//! Sine and cosine.

use super::{Curvature, ExprHandler, Feasibility, Monotonicity};
use crate::graph::NodeKind;
use crate::interval::{cos_inverse, sin_inverse, Interval};
use crate::propagate::VarBounds;

/// Concave where the function is non-negative, convex where non-positive.
fn curvature_from_range(range: Interval) -> Curvature {
    if range.inf >= 0.0 {
        Curvature::Concave
    } else if range.sup <= 0.0 {
        Curvature::Convex
    } else {
        Curvature::Unknown
    }
}

#[derive(Debug, Default)]
pub struct SinHandler;

impl ExprHandler for SinHandler {
    fn name(&self) -> &'static str {
        "sin"
    }

    fn eval(&self, _kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        Some(children[0].sin())
    }

    fn inteval(&self, _kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        children[0].sin()
    }

    fn reverse_prop(&self, _kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        children[0] = sin_inverse(bounds, children[0]);
        Feasibility::of(children)
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], activities: &[Interval]) -> Curvature {
        let outer = curvature_from_range(activities[0].sin());
        Curvature::compose(outer, self.monotonicity(kind, 0, activities), children[0])
    }

    /// sin' = cos
    fn monotonicity(&self, _kind: &NodeKind, _child: usize, activities: &[Interval]) -> Monotonicity {
        Monotonicity::from_factor(activities[0].cos())
    }
}

#[derive(Debug, Default)]
pub struct CosHandler;

impl ExprHandler for CosHandler {
    fn name(&self) -> &'static str {
        "cos"
    }

    fn eval(&self, _kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        Some(children[0].cos())
    }

    fn inteval(&self, _kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        children[0].cos()
    }

    fn reverse_prop(&self, _kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        children[0] = cos_inverse(bounds, children[0]);
        Feasibility::of(children)
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], activities: &[Interval]) -> Curvature {
        let outer = curvature_from_range(activities[0].cos());
        Curvature::compose(outer, self.monotonicity(kind, 0, activities), children[0])
    }

    /// cos' = -sin
    fn monotonicity(&self, _kind: &NodeKind, _child: usize, activities: &[Interval]) -> Monotonicity {
        Monotonicity::from_factor(-activities[0].sin())
    }
}
