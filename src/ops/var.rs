use super::{Curvature, ExprHandler, Feasibility};
use crate::graph::NodeKind;
use crate::interval::Interval;
use crate::propagate::VarBounds;

/// Variables read their value from the solution vector and their interval
/// from the bound store.
#[derive(Debug, Default)]
pub struct VarHandler;

impl ExprHandler for VarHandler {
    fn name(&self) -> &'static str {
        "var"
    }

    fn eval(&self, kind: &NodeKind, _children: &[f64], solution: &[f64]) -> Option<f64> {
        let NodeKind::Var(var) = kind else { unreachable!("BUG: var handler on {:?}", kind) };
        solution.get(var.index()).copied()
    }

    fn inteval(&self, kind: &NodeKind, _children: &[Interval], vars: &dyn VarBounds) -> Interval {
        let NodeKind::Var(var) = kind else { unreachable!("BUG: var handler on {:?}", kind) };
        vars.bounds(*var)
    }

    fn reverse_prop(&self, _kind: &NodeKind, _bounds: Interval, _children: &mut [Interval]) -> Feasibility {
        Feasibility::Feasible
    }

    fn curvature(&self, _kind: &NodeKind, _children: &[Curvature], _activities: &[Interval]) -> Curvature {
        Curvature::Linear
    }

    fn simplify(&self, _kind: &NodeKind, _child_constants: &[Option<f64>]) -> Option<f64> {
        None
    }
}
