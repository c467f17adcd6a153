use super::*;
use crate::graph::VarId;
use std::f64::consts::E;

const INF: f64 = f64::INFINITY;

fn iv(inf: f64, sup: f64) -> Interval {
    Interval::new(inf, sup)
}

fn assert_close(actual: Interval, expected: Interval) {
    let close = |a: f64, b: f64| a == b || (a - b).abs() < 1e-9;
    assert!(
        close(actual.inf, expected.inf) && close(actual.sup, expected.sup),
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_linear_sum() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let y = g.var(VarId(1));
    let root = g.sum(&[x, y], &[2.0, -1.0], 0.5).unwrap();
    let mut vars = BoundTable::new(vec![iv(-2.0, 2.0), iv(-3.0, 1.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    let forward = p.forward_prop(&mut g, &vars, root, false);
    assert!(!forward.infeasible);
    assert_eq!(forward.activity, iv(-4.5, 7.5));

    let tightened = p.tighten_interval(&mut g, &mut vars, root, iv(0.5, 1.5));
    assert_eq!(tightened, TightenResult { infeasible: false, tightenings: 1 });
    assert_eq!(p.queue_len(), 1);

    let reverse = p.drain_reverse_queue(&mut g, &mut vars);
    assert_eq!(reverse, ReverseResult { infeasible: false, tightenings: 1 });
    assert_eq!(vars.bounds(VarId(0)), iv(-1.5, 1.0));
    assert_eq!(vars.bounds(VarId(1)), iv(-3.0, 1.0));
    assert_eq!(p.queue_len(), 0);
}

#[test]
fn test_logarithm() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let root = g.log(x);
    let mut vars = BoundTable::new(vec![iv(-1.0, 7.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    let forward = p.forward_prop(&mut g, &vars, root, false);
    // The pole at zero is relaxed, so the activity stays bounded below.
    assert_close(forward.activity, iv(1e-9_f64.ln(), 7.0_f64.ln()));

    p.tighten_interval(&mut g, &mut vars, root, iv(-1.0, 1.0));
    let reverse = p.drain_reverse_queue(&mut g, &mut vars);
    assert!(!reverse.infeasible);
    assert_close(vars.bounds(VarId(0)), iv(1.0 / E, E));
}

#[test]
fn test_trilinear_product() {
    let mut g = ExprGraph::new();
    let vars_ids: Vec<NodeId> = (0..3).map(|i| g.var(VarId(i))).collect();
    let root = g.product(&vars_ids, 1.0).unwrap();
    let mut vars = BoundTable::new(vec![iv(-1.0, 1.0), iv(0.0, 2.0), iv(0.0, 3.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    assert_eq!(p.forward_prop(&mut g, &vars, root, false).activity, iv(-6.0, 6.0));
    p.tighten_interval(&mut g, &mut vars, root, iv(1.0, 8.0));
    let reverse = p.drain_reverse_queue(&mut g, &mut vars);

    assert!(!reverse.infeasible);
    assert_eq!(reverse.tightenings, 3);
    assert_close(vars.bounds(VarId(0)), iv(1.0 / 6.0, 1.0));
    assert_close(vars.bounds(VarId(1)), iv(1.0 / 3.0, 2.0));
    assert_close(vars.bounds(VarId(2)), iv(0.5, 3.0));
}

/// `x² ≥ 0.5` and `x² · y ≤ 1` share the `x²` node.
fn shared_square() -> (ExprGraph, NodeId, NodeId, BoundTable) {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let y = g.var(VarId(1));
    let sq = g.pow(x, 2.0);
    let prod = g.product(&[sq, y], 1.0).unwrap();
    let vars = BoundTable::new(vec![iv(-2.0, 2.0), iv(1.0, 3.0)]);
    (g, sq, prod, vars)
}

#[test]
fn test_shared_subexpression_keeps_propagated_bound() {
    let (mut g, sq, prod, mut vars) = shared_square();
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    assert_eq!(p.forward_prop(&mut g, &vars, sq, false).activity, iv(0.0, 4.0));
    p.tighten_interval(&mut g, &mut vars, sq, iv(0.5, INF));
    assert!(!p.drain_reverse_queue(&mut g, &mut vars).infeasible);
    // Both branches of the square root survive, so x is unchanged.
    assert_eq!(vars.bounds(VarId(0)), iv(-2.0, 2.0));

    let forward = p.forward_prop(&mut g, &vars, prod, false);
    assert_eq!(g.activity(sq).inf, 0.5);
    assert_eq!(forward.activity, iv(0.5, 12.0));

    p.tighten_interval(&mut g, &mut vars, prod, iv(-INF, 1.0));
    assert!(!p.drain_reverse_queue(&mut g, &mut vars).infeasible);
    assert_eq!(vars.bounds(VarId(1)), iv(1.0, 2.0));
    let x = vars.bounds(VarId(0));
    assert!(x.inf >= -1.0 - 1e-9 && x.sup <= 1.0 + 1e-9, "x = {x}");
}

#[test]
fn test_propagation_driver_reaches_fixpoint() {
    let (mut g, sq, prod, mut vars) = shared_square();
    let constraints = [Constraint::new(sq, 0.5, INF), Constraint::new(prod, -INF, 1.0)];
    let mut p = Propagator::new();

    let outcome = p.propagate(&mut g, &mut vars, &constraints);
    assert!(!outcome.infeasible);
    assert!(outcome.rounds >= 2 && outcome.rounds < g.config().max_rounds);
    assert_eq!(vars.bounds(VarId(1)), iv(1.0, 2.0));
    assert_eq!(p.stats().rounds, u64::from(outcome.rounds));

    // Nothing left to do on a second call.
    let again = p.propagate(&mut g, &mut vars, &constraints);
    assert_eq!(again.rounds, 1);
}

#[test]
fn test_tightening_is_idempotent() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let y = g.var(VarId(1));
    let root = g.sum(&[x, y], &[1.0, 1.0], 0.0).unwrap();
    let mut vars = BoundTable::new(vec![iv(0.0, 4.0), iv(0.0, 4.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    p.forward_prop(&mut g, &vars, root, false);
    let first = p.tighten_interval(&mut g, &mut vars, root, iv(1.0, 2.0));
    let second = p.tighten_interval(&mut g, &mut vars, root, iv(1.0, 2.0));
    assert_eq!(first.tightenings, 1);
    assert_eq!(second, TightenResult::default());
    assert_eq!(p.queue_len(), 1);
    assert_eq!(p.stats().tightenings, 1);

    // A looser request is a no-op as well.
    assert_eq!(p.tighten_interval(&mut g, &mut vars, root, iv(0.0, 3.0)).tightenings, 0);
    assert_eq!(g.prop_bounds(root), Some(iv(1.0, 2.0)));
}

#[test]
fn test_empty_intersection_is_infeasible() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let y = g.var(VarId(1));
    let root = g.sum(&[x, y], &[1.0, 1.0], 0.0).unwrap();
    let mut vars = BoundTable::new(vec![iv(0.0, 1.0), iv(0.0, 1.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    p.forward_prop(&mut g, &vars, root, false);
    let result = p.tighten_interval(&mut g, &mut vars, root, iv(5.0, 6.0));
    assert!(result.infeasible);
    assert!(p.is_infeasible());
    assert_eq!(p.queue_len(), 0);

    // A touching interval is still feasible.
    p.begin_round(&mut g);
    assert!(!p.tighten_interval(&mut g, &mut vars, root, iv(2.0, 6.0)).infeasible);
}

#[test]
fn test_empty_variable_domain_makes_forward_infeasible() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let root = g.exp(x);
    let vars = BoundTable::new(vec![Interval::EMPTY]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    let forward = p.forward_prop(&mut g, &vars, root, false);
    assert!(forward.infeasible);
    assert!(forward.activity.is_empty());
}

#[test]
fn test_reverse_infeasibility_clears_queue() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let sq = g.pow(x, 2.0);
    let root = g.sum(&[sq], &[1.0], 0.0).unwrap();
    let mut vars = BoundTable::new(vec![iv(-1.0, 1.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    // Skip the forward pass: the sum knows nothing and accepts [-2, -1].
    p.tighten_interval(&mut g, &mut vars, root, iv(-2.0, -1.0));
    let reverse = p.drain_reverse_queue(&mut g, &mut vars);
    assert!(reverse.infeasible);
    assert_eq!(p.queue_len(), 0);
    assert_eq!(vars.bounds(VarId(0)), iv(-1.0, 1.0));
}

#[test]
fn test_constant_node_cannot_be_moved() {
    let mut g = ExprGraph::new();
    let c = g.value(3.0);
    let mut vars = BoundTable::default();
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    assert!(!p.tighten_interval(&mut g, &mut vars, c, iv(0.0, 5.0)).infeasible);
    assert!(p.tighten_interval(&mut g, &mut vars, c, iv(0.0, 1.0)).infeasible);
}

#[test]
fn test_only_stale_activities_are_recomputed() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let e = g.exp(x);
    let root = g.abs(e);
    let mut vars = BoundTable::new(vec![iv(0.0, 1.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    p.forward_prop(&mut g, &vars, root, false);
    assert_eq!(p.stats().forward_evals, 3);
    p.forward_prop(&mut g, &vars, root, false);
    assert_eq!(p.stats().forward_evals, 3);
    p.forward_prop(&mut g, &vars, root, true);
    assert_eq!(p.stats().forward_evals, 6);

    // Bounds changed outside the propagator: callers bump the epoch.
    vars.set(VarId(0), iv(0.0, 0.0));
    g.bump_bounds_epoch();
    let forward = p.forward_prop(&mut g, &vars, root, false);
    assert_eq!(forward.activity, iv(1.0, 1.0));
}

#[test]
fn test_variable_tightening_bumps_bounds_epoch() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let mut vars = BoundTable::new(vec![iv(0.0, 10.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    let before = g.bounds_epoch();
    p.tighten_interval(&mut g, &mut vars, x, iv(2.0, 3.0));
    assert!(g.bounds_epoch() > before);
    assert_eq!(vars.bounds(VarId(0)), iv(2.0, 3.0));

    // Propagated bounds expire with the round; the store keeps the change.
    p.begin_round(&mut g);
    assert_eq!(g.prop_bounds(x), None);
    assert_eq!(p.tighten_interval(&mut g, &mut vars, x, iv(2.0, 3.0)).tightenings, 0);
}

#[test]
fn test_logarithm_near_pole_stays_feasible() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let root = g.log(x);
    let mut vars = BoundTable::new(vec![iv(1e-12, 1.0)]);
    let mut p = Propagator::new();

    p.begin_round(&mut g);
    let forward = p.forward_prop(&mut g, &vars, root, false);
    assert_close(forward.activity, iv(1e-12_f64.ln(), 0.0));

    let outcome = p.propagate(&mut g, &mut vars, &[Constraint::new(root, -25.0, -22.0)]);
    assert!(!outcome.infeasible);
    let x_bounds = vars.bounds(VarId(0));
    assert!(x_bounds.contains((-23.0_f64).exp()), "{x_bounds}");
    assert!(x_bounds.inf > 1e-12);
}

#[test]
fn test_negative_fractional_power_near_pole_stays_feasible() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let root = g.pow(x, -0.5);
    let mut vars = BoundTable::new(vec![iv(1e-12, 1.0)]);
    let mut p = Propagator::new();

    let outcome = p.propagate(&mut g, &mut vars, &[Constraint::new(root, 1e5, 1e6)]);
    assert!(!outcome.infeasible);
    let x_bounds = vars.bounds(VarId(0));
    assert!(x_bounds.contains(1e-11), "{x_bounds}");
    assert!(x_bounds.sup < 1.0);
}

#[test]
fn test_activity_freshness_follows_bounds_epoch() {
    let mut g = ExprGraph::new();
    let x = g.var(VarId(0));
    let root = g.exp(x);
    let vars = BoundTable::new(vec![iv(0.0, 1.0)]);
    let mut p = Propagator::new();

    assert!(!g.is_activity_fresh(root));
    p.begin_round(&mut g);
    p.forward_prop(&mut g, &vars, root, false);
    assert!(g.is_activity_fresh(root) && g.is_activity_fresh(x));

    g.bump_bounds_epoch();
    assert!(!g.is_activity_fresh(root));
    assert_close(g.activity(root), iv(1.0, 1.0_f64.exp()));
}
