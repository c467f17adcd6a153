//! Products `coef · Π x[i]`.

use super::{Curvature, ExprHandler, Feasibility, Monotonicity};
use crate::graph::NodeKind;
use crate::interval::{solve_product, Interval};
use crate::propagate::VarBounds;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Default)]
pub struct ProductHandler;

fn coef_of(kind: &NodeKind) -> f64 {
    let NodeKind::Product { coef } = kind else { unreachable!("BUG: product handler on {:?}", kind) };
    *coef
}

fn product_except(children: &[Interval], skip: usize) -> Interval {
    children
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != skip)
        .fold(Interval::point(1.0), |acc, (_, &child)| acc * child)
}

impl ExprHandler for ProductHandler {
    fn name(&self) -> &'static str {
        "prod"
    }

    fn eval(&self, kind: &NodeKind, children: &[f64], _solution: &[f64]) -> Option<f64> {
        Some(coef_of(kind) * children.iter().product::<f64>())
    }

    fn inteval(&self, kind: &NodeKind, children: &[Interval], _vars: &dyn VarBounds) -> Interval {
        children.iter().fold(Interval::point(1.0), |acc, &child| acc * child).scale(coef_of(kind))
    }

    fn reverse_prop(&self, kind: &NodeKind, bounds: Interval, children: &mut [Interval]) -> Feasibility {
        let coef = coef_of(kind);
        if coef == 0.0 || children.is_empty() {
            return if bounds.contains(coef) || (coef == 0.0 && bounds.contains_zero()) {
                Feasibility::Feasible
            } else {
                Feasibility::Infeasible
            };
        }
        let target = bounds.scale(1.0 / coef);

        for i in 0..children.len() {
            let others = product_except(children, i);
            children[i] = solve_product(target, others, children[i]);
            if children[i].is_empty() {
                return Feasibility::Infeasible;
            }
        }
        Feasibility::Feasible
    }

    fn curvature(&self, kind: &NodeKind, children: &[Curvature], _activities: &[Interval]) -> Curvature {
        match children {
            [] => Curvature::Linear,
            [only] => only.scale(coef_of(kind)),
            _ => Curvature::Unknown,
        }
    }

    fn monotonicity(&self, kind: &NodeKind, child: usize, activities: &[Interval]) -> Monotonicity {
        Monotonicity::from_factor(product_except(activities, child).scale(coef_of(kind)))
    }

    /// Insensitive to the order of the factors.
    fn hash(&self, kind: &NodeKind, child_hashes: &[u64]) -> u64 {
        let mut sorted = child_hashes.to_vec();
        sorted.sort_unstable();

        let mut hasher = DefaultHasher::new();
        kind.hash_data(&mut hasher);
        sorted.hash(&mut hasher);
        hasher.finish()
    }
}
