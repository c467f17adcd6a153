//! Operator handlers: the per-kind behaviour behind every `NodeKind`.
//!
//! Node data lives in the closed `NodeKind` enum; behaviour is looked up in an
//! `OperatorTable` indexed by `OpKind`, so a caller may swap the handler for
//! one kind (for instance to plug in a sharper reverse propagator) without
//! touching the graph.

mod abs;
mod entropy;
mod exp;
mod log;
mod pow;
mod product;
mod sum;
mod trig;
mod value;
mod var;

pub use abs::AbsHandler;
pub use entropy::EntropyHandler;
pub use exp::ExpHandler;
pub use log::LogHandler;
pub use pow::PowHandler;
pub use product::ProductHandler;
pub use sum::SumHandler;
pub use trig::{CosHandler, SinHandler};
pub use value::ValueHandler;
pub use var::VarHandler;

use crate::config::PropagationConfig;
use crate::graph::{NodeKind, OpKind};
use crate::interval::Interval;
use crate::propagate::VarBounds;
use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility {
    Feasible,
    Infeasible,
}

impl Feasibility {
    /// `Infeasible` iff any of `children` is empty.
    pub fn of(children: &[Interval]) -> Self {
        if children.iter().any(Interval::is_empty) {
            Feasibility::Infeasible
        } else {
            Feasibility::Feasible
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curvature {
    Linear,
    Convex,
    Concave,
    Unknown,
}

impl Curvature {
    pub fn negate(self) -> Self {
        match self {
            Curvature::Convex => Curvature::Concave,
            Curvature::Concave => Curvature::Convex,
            other => other,
        }
    }

    /// Curvature of `coef · f` for `f` of curvature `self`.
    pub fn scale(self, coef: f64) -> Self {
        if coef == 0.0 {
            Curvature::Linear
        } else if coef < 0.0 {
            self.negate()
        } else {
            self
        }
    }

    /// Curvature of `f + g`.
    pub fn add(self, other: Curvature) -> Self {
        match (self, other) {
            (Curvature::Linear, c) | (c, Curvature::Linear) => c,
            (a, b) if a == b => a,
            _ => Curvature::Unknown,
        }
    }

    /// Curvature of `outer(inner(x))` from the curvature and monotonicity of
    /// `outer` on the range of `inner`.
    pub fn compose(outer: Curvature, outer_mono: Monotonicity, inner: Curvature) -> Self {
        use Monotonicity::*;
        match (outer, inner) {
            (_, Curvature::Linear) => outer,
            (Curvature::Linear, _) => match outer_mono {
                Increasing => inner,
                Decreasing => inner.negate(),
                Constant => Curvature::Linear,
                Unknown => Curvature::Unknown,
            },
            (Curvature::Convex, Curvature::Convex) if outer_mono == Increasing => Curvature::Convex,
            (Curvature::Convex, Curvature::Concave) if outer_mono == Decreasing => Curvature::Convex,
            (Curvature::Concave, Curvature::Concave) if outer_mono == Increasing => Curvature::Concave,
            (Curvature::Concave, Curvature::Convex) if outer_mono == Decreasing => Curvature::Concave,
            _ if outer_mono == Constant => Curvature::Linear,
            _ => Curvature::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Monotonicity {
    Increasing,
    Decreasing,
    Constant,
    Unknown,
}

impl Monotonicity {
    pub fn negate(self) -> Self {
        match self {
            Monotonicity::Increasing => Monotonicity::Decreasing,
            Monotonicity::Decreasing => Monotonicity::Increasing,
            other => other,
        }
    }

    /// Monotonicity of `f` in a variable whose coefficient has the sign of `factor`.
    pub fn from_factor(factor: Interval) -> Self {
        if factor.inf == 0.0 && factor.sup == 0.0 {
            Monotonicity::Constant
        } else if factor.inf >= 0.0 {
            Monotonicity::Increasing
        } else if factor.sup <= 0.0 {
            Monotonicity::Decreasing
        } else {
            Monotonicity::Unknown
        }
    }
}

/// Behaviour of one operator kind.
///
/// `kind` is always of the handler's own `OpKind`; handlers may treat any
/// other variant as a bug.
pub trait ExprHandler: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Point value from the children's values, or `None` outside the domain.
    fn eval(&self, kind: &NodeKind, children: &[f64], solution: &[f64]) -> Option<f64>;

    /// Enclosure of the node's range over the children's intervals. Returns
    /// `Interval::ENTIRE` when nothing better is known.
    fn inteval(&self, kind: &NodeKind, children: &[Interval], vars: &dyn VarBounds) -> Interval;

    /// Narrows `children` in place to the values consistent with the node
    /// lying in `bounds`.
    fn reverse_prop(&self, kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility;

    fn curvature(&self, _kind: &NodeKind, _children: &[Curvature], _activities: &[Interval]) -> Curvature {
        Curvature::Unknown
    }

    fn monotonicity(&self, _kind: &NodeKind, _child: usize, _activities: &[Interval]) -> Monotonicity {
        Monotonicity::Unknown
    }

    fn hash(&self, kind: &NodeKind, child_hashes: &[u64]) -> u64 {
        let mut hasher = DefaultHasher::new();
        kind.hash_data(&mut hasher);
        child_hashes.hash(&mut hasher);
        hasher.finish()
    }

    /// Constant value of the node if its children are constant.
    fn simplify(&self, kind: &NodeKind, child_constants: &[Option<f64>]) -> Option<f64> {
        let values: Option<Vec<f64>> = child_constants.iter().copied().collect();
        self.eval(kind, &values?, &[])
    }
}

/// Handlers indexed by `OpKind`.
#[derive(Debug)]
pub struct OperatorTable {
    handlers: Vec<Box<dyn ExprHandler>>,
}

impl OperatorTable {
    pub fn new(config: &PropagationConfig) -> Self {
        let handlers = OpKind::ALL.iter().map(|&op| default_handler(op, config)).collect();
        Self { handlers }
    }

    /// Replaces the handler of `op`, returning the previous one.
    pub fn register(&mut self, op: OpKind, handler: Box<dyn ExprHandler>) -> Box<dyn ExprHandler> {
        std::mem::replace(&mut self.handlers[op.index()], handler)
    }

    #[inline(always)]
    pub fn get(&self, op: OpKind) -> &dyn ExprHandler {
        self.handlers[op.index()].as_ref()
    }

    #[inline(always)]
    pub fn for_kind(&self, kind: &NodeKind) -> &dyn ExprHandler {
        self.get(kind.op())
    }
}

fn default_handler(op: OpKind, config: &PropagationConfig) -> Box<dyn ExprHandler> {
    match op {
        OpKind::Var => Box::new(VarHandler),
        OpKind::Value => Box::new(ValueHandler),
        OpKind::Sum => Box::new(SumHandler),
        OpKind::Product => Box::new(ProductHandler),
        OpKind::Pow => Box::new(PowHandler::new(config)),
        OpKind::Exp => Box::new(ExpHandler),
        OpKind::Log => Box::new(LogHandler::new(config)),
        OpKind::Sin => Box::new(SinHandler),
        OpKind::Cos => Box::new(CosHandler),
        OpKind::Abs => Box::new(AbsHandler),
        OpKind::Entropy => Box::new(EntropyHandler),
    }
}

/// Keeps a child away from a pole at zero: forward evaluation of a child
/// reaching zero or below starts at `min_zero_distance` instead, and reverse
/// propagation never pushes a child entirely below it.
#[derive(Debug)]
pub(crate) struct PoleGuard {
    min_zero_distance: f64,
    warn: bool,
    warned: Cell<bool>,
}

impl PoleGuard {
    pub(crate) fn new(config: &PropagationConfig) -> Self {
        Self {
            min_zero_distance: config.min_zero_distance,
            warn: config.warn_on_pole,
            warned: Cell::new(false),
        }
    }

    pub(crate) fn relax_lower(&self, op: &str, child: Interval) -> Interval {
        let mzd = self.min_zero_distance;
        if !child.is_empty() && child.inf <= 0.0 && child.sup > 0.0 {
            self.warn_once(op, "child lower bound raised");
            return Interval::new(mzd.min(child.sup), child.sup);
        }
        child
    }

    pub(crate) fn relax_upper(&self, op: &str, child: Interval) -> Interval {
        let mzd = self.min_zero_distance;
        if !child.is_empty() && child.sup < mzd {
            self.warn_once(op, "child upper bound relaxed");
            return Interval::new(child.inf, mzd);
        }
        child
    }

    fn warn_once(&self, op: &str, what: &str) {
        if self.warn && !self.warned.replace(true) {
            ::log::warn!(
                "{}: {} to min_zero_distance {} to stay clear of the pole at zero",
                op,
                what,
                self.min_zero_distance
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn has_warned(&self) -> bool {
        self.warned.get()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_kind() {
        let table = OperatorTable::new(&PropagationConfig::default());
        let names: Vec<_> = OpKind::ALL.iter().map(|&op| table.get(op).name()).collect();
        assert_eq!(names, ["var", "value", "sum", "prod", "pow", "exp", "log", "sin", "cos", "abs", "entropy"]);
    }

    #[test]
    fn test_register_replaces_handler() {
        #[derive(Debug)]
        struct Clamp;
        impl ExprHandler for Clamp {
            fn name(&self) -> &'static str {
                "clamped-exp"
            }
            fn eval(&self, _: &NodeKind, c: &[f64], _: &[f64]) -> Option<f64> {
                Some(c[0].exp().min(1.0))
            }
            fn inteval(&self, _: &NodeKind, _: &[Interval], _: &dyn VarBounds) -> Interval {
                Interval::new(0.0, 1.0)
            }
            fn reverse_prop(&self, _: &NodeKind, _: Interval, _: &mut [Interval]) -> Feasibility {
                Feasibility::Feasible
            }
        }

        let mut table = OperatorTable::new(&PropagationConfig::default());
        let old = table.register(OpKind::Exp, Box::new(Clamp));
        assert_eq!(old.name(), "exp");
        assert_eq!(table.for_kind(&NodeKind::Exp).name(), "clamped-exp");
        // The default `simplify` routes through `eval`.
        assert_eq!(table.get(OpKind::Exp).simplify(&NodeKind::Exp, &[Some(5.0)]), Some(1.0));
        assert_eq!(table.get(OpKind::Exp).simplify(&NodeKind::Exp, &[None]), None);
    }

    #[test]
    fn test_curvature_composition() {
        use Curvature::{Concave, Convex, Linear};
        use Monotonicity::{Decreasing, Increasing};
        assert_eq!(Curvature::compose(Convex, Increasing, Convex), Convex);
        assert_eq!(Curvature::compose(Convex, Decreasing, Concave), Convex);
        assert_eq!(Curvature::compose(Concave, Increasing, Convex), Curvature::Unknown);
        assert_eq!(Curvature::compose(Concave, Monotonicity::Unknown, Linear), Concave);
        assert_eq!(Convex.add(Linear), Convex);
        assert_eq!(Convex.add(Concave), Curvature::Unknown);
        assert_eq!(Convex.scale(-2.0), Concave);
    }

    #[test]
    fn test_pole_guard_warns_once() {
        let guard = PoleGuard::new(&PropagationConfig::default());
        let relaxed = guard.relax_lower("log", Interval::new(-1.0, 7.0));
        assert_eq!(relaxed, Interval::new(1e-9, 7.0));
        assert!(guard.has_warned());
        assert_eq!(guard.relax_lower("log", Interval::new(2.0, 7.0)), Interval::new(2.0, 7.0));
        // Strictly positive children are already clear of the pole.
        let tiny = Interval::new(1e-12, 1.0);
        assert_eq!(guard.relax_lower("log", tiny), tiny);
        assert_eq!(guard.relax_upper("log", Interval::new(-1.0, 0.0)), Interval::new(-1.0, 1e-9));
    }
}
