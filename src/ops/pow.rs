//! Powers `x^p` with a constant real exponent.
//!
//! Integral exponents are defined on the whole real line (minus zero for
//! negative ones); fractional exponents only on `x ≥ 0`. For negative
//! fractional exponents the child is kept away from the pole at zero.

use super::{Curvature, ExprHandler, Feasibility, Monotonicity, PoleGuard};
use crate::config::PropagationConfig;
use crate::graph::NodeKind;
use crate::interval::{is_integral, pow_inverse, Interval};
use crate::propagate::VarBounds;

#[derive(Debug)]
pub struct PowHandler {
    guard: PoleGuard,
}

impl PowHandler {
    pub fn new(config: &PropagationConfig) -> Self {
        Self { guard: PoleGuard::new(config) }
    }
}

fn exponent_of(kind: &NodeKind) -> f64 {
    let NodeKind::Pow { exponent } = kind else { unreachable!("BUG: pow handler on {:?}", kind) };
    *exponent
}

fn has_pole(p: f64) -> bool {
    p < 0.0 && !is_integral(p)
}

fn is_odd(p: f64) -> bool {
    is_integral(p) && (p as i64) % 2 != 0
}

impl ExprHandler for PowHandler {
    fn name(&self) -> &'static str {
        "pow"
    }

    fn eval(&self, kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        let value = children[0].powf(exponent_of(kind));
        value.is_finite().then_some(value)
    }

    fn inteval(&self, kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        let p = exponent_of(kind);
        let child = if has_pole(p) { self.guard.relax_lower("pow", children[0]) } else { children[0] };
        child.powf(p)
    }

    fn reverse_prop(&self, kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        let p = exponent_of(kind);
        let mut narrowed = pow_inverse(bounds, p, children[0]);
        if has_pole(p) {
            narrowed = self.guard.relax_upper("pow", narrowed);
        }
        children[0] = narrowed;
        Feasibility::of(children)
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], activities: &[Interval]) -> Curvature {
        let p = exponent_of(kind);
        let x = activities[0];
        let outer = if p == 0.0 || p == 1.0 {
            Curvature::Linear
        } else if !is_integral(p) {
            if p > 0.0 && p < 1.0 { Curvature::Concave } else { Curvature::Convex }
        } else if is_odd(p) {
            // x^3 and 1/x flip curvature at zero.
            if x.inf >= 0.0 {
                Curvature::Convex
            } else if x.sup <= 0.0 {
                Curvature::Concave
            } else {
                Curvature::Unknown
            }
        } else if p > 0.0 || x.inf > 0.0 || x.sup < 0.0 {
            Curvature::Convex
        } else {
            Curvature::Unknown
        };
        Curvature::compose(outer, self.monotonicity(kind, 0, activities), children[0])
    }

    fn monotonicity(&self, kind: &NodeKind, _child: usize, activities: &[Interval]) -> Monotonicity {
        let p = exponent_of(kind);
        let x = activities[0];
        if p == 0.0 {
            Monotonicity::Constant
        } else if !is_integral(p) {
            if p > 0.0 { Monotonicity::Increasing } else { Monotonicity::Decreasing }
        } else if is_odd(p) {
            if p > 0.0 {
                Monotonicity::Increasing
            } else if x.inf > 0.0 || x.sup < 0.0 {
                Monotonicity::Decreasing
            } else {
                Monotonicity::Unknown
            }
        } else {
            let even = if x.inf >= 0.0 {
                Monotonicity::Increasing
            } else if x.sup <= 0.0 {
                Monotonicity::Decreasing
            } else {
                Monotonicity::Unknown
            };
            if p < 0.0 { even.negate() } else { even }
        }
    }
}
