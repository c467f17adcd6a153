use super::{Curvature, ExprHandler, Feasibility};
use crate::graph::NodeKind;
use crate::interval::Interval;
use crate::propagate::VarBounds;

#[derive(Debug, Default)]
pub struct ValueHandler;

fn value_of(kind: &NodeKind) -> f64 {
    let NodeKind::Value(v) = kind else { unreachable!("BUG: value handler on {:?}", kind) };
    *v
}

impl ExprHandler for ValueHandler {
    fn name(&self) -> &'static str {
        "value"
    }

    fn eval(&self, kind: &NodeKind, _children: &[f64], _solution: &[f64]) -> Option<f64> {
        Some(value_of(kind))
    }

    fn inteval(&self, kind: &NodeKind, _children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        Interval::point(value_of(kind))
    }

    fn reverse_prop(&self, _kind: &NodeKind, _bounds: Interval, _children: &mut [Interval]) -> Feasibility {
        Feasibility::Feasible
    }

    fn curvature(&self, _kind: &NodeKind, _children: &[Curvature], _activities: &[Interval]) -> Curvature {
        Curvature::Linear
    }

    fn simplify(&self, kind: &NodeKind, _child_constants: &[Option<f64>]) -> Option<f64> {
        Some(value_of(kind))
    }
}
