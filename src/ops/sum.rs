//! Weighted sums `constant + Σ coefs[i] · x[i]`.

use super::{Curvature, ExprHandler, Feasibility, Monotonicity};
use crate::graph::NodeKind;
use crate::interval::Interval;
use crate::propagate::VarBounds;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Default)]
pub struct SumHandler;

fn parts(kind: &NodeKind) -> (&[f64], f64) {
    let NodeKind::Sum { coefs, constant } = kind else { unreachable!("BUG: sum handler on {:?}", kind) };
    (coefs.as_slice(), *constant)
}

impl ExprHandler for SumHandler {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn eval(&self, kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        let (coefs, constant) = parts(kind);
        Some(constant + coefs.iter().zip(children).map(|(c, x)| c * x).sum::<f64>())
    }

    fn inteval(&self, kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        let (coefs, constant) = parts(kind);
        coefs
            .iter()
            .zip(children)
            .fold(Interval::point(constant), |acc, (&c, child)| acc + child.scale(c))
    }

    /// Children are narrowed one after another, each against the already
    /// narrowed intervals of its siblings.
    fn reverse_prop(&self, kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        let (coefs, constant) = parts(kind);
        if children.is_empty() {
            return if bounds.contains(constant) { Feasibility::Feasible } else { Feasibility::Infeasible };
        }
        let target = bounds - Interval::point(constant);

        for i in 0..children.len() {
            if coefs[i] == 0.0 {
                continue;
            }
            let rest = children
                .iter()
                .zip(coefs)
                .enumerate()
                .filter(|(j, _)| *j != i)
                .fold(Interval::point(0.0), |acc, (_, (child, &c))| acc + child.scale(c));
            let narrowed = (target - rest).scale(1.0 / coefs[i]);
            children[i] = children[i].intersect(&narrowed);
            if children[i].is_empty() {
                return Feasibility::Infeasible;
            }
        }
        Feasibility::Feasible
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], _activities: &[Interval]) -> Curvature {
        let (coefs, _) = parts(kind);
        coefs
            .iter()
            .zip(children)
            .fold(Curvature::Linear, |acc, (&c, child)| acc.add(child.scale(c)))
    }

    fn monotonicity(&self, kind: &NodeKind, child: usize, _activities: &[Interval]) -> Monotonicity {
        let (coefs, _) = parts(kind);
        Monotonicity::from_factor(Interval::point(coefs[child]))
    }

    /// Insensitive to the order of the terms.
    fn hash(&self, kind: &NodeKind, child_hashes: &[u64]) -> u64 {
        let (coefs, _) = parts(kind);
        let mut terms: Vec<(u64, u64)> =
            child_hashes.iter().zip(coefs).map(|(&h, c)| (h, c.to_bits())).collect();
        terms.sort_unstable();

        let mut hasher = DefaultHasher::new();
        kind.hash_data(&mut hasher);
        terms.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::NoVars;
    use smallvec::smallvec;

    fn kind(coefs: &[f64], constant: f64) -> NodeKind {
        NodeKind::Sum { coefs: coefs.into(), constant }
    }

    #[test]
    fn test_linear_reverse_propagation() {
        // 2x - y + 0.5 in [0.5, 1.5]
        let k = kind(&[2.0, -1.0], 0.5);
        let mut children = [Interval::new(-2.0, 2.0), Interval::new(-3.0, 1.0)];
        assert_eq!(SumHandler.inteval(&k, &children, &NoVars), Interval::new(-4.5, 7.5));

        let verdict = SumHandler.reverse_prop(&k, Interval::new(0.5, 1.5), &mut children);
        assert_eq!(verdict, Feasibility::Feasible);
        assert_eq!(children, [Interval::new(-1.5, 1.0), Interval::new(-3.0, 1.0)]);
    }

    #[test]
    fn test_unreachable_bounds_are_infeasible() {
        let k = kind(&[1.0, 1.0], 0.0);
        let mut children = [Interval::new(0.0, 1.0), Interval::new(0.0, 1.0)];
        let verdict = SumHandler.reverse_prop(&k, Interval::new(3.0, 4.0), &mut children);
        assert_eq!(verdict, Feasibility::Infeasible);
    }

    #[test]
    fn test_hash_ignores_term_order() {
        let a = NodeKind::Sum { coefs: smallvec![1.0, 2.0], constant: 0.0 };
        let b = NodeKind::Sum { coefs: smallvec![2.0, 1.0], constant: 0.0 };
        assert_eq!(SumHandler.hash(&a, &[10, 20]), SumHandler.hash(&b, &[20, 10]));
        assert_ne!(SumHandler.hash(&a, &[10, 20]), SumHandler.hash(&b, &[10, 20]));
    }

    #[test]
    fn test_curvature_follows_coefficient_signs() {
        let k = kind(&[1.0, -1.0], 0.0);
        let c = SumHandler.curvature(&k, &[Curvature::Convex, Curvature::Concave], &[]);
        assert_eq!(c, Curvature::Convex);
        assert_eq!(SumHandler.monotonicity(&k, 1, &[]), Monotonicity::Decreasing);
    }
}
