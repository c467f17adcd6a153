//! Elementary functions over intervals and the inverse relations used by
//! reverse propagation.
//!
//! Every `*_inverse(bounds, within)` returns the hull of the points of `within`
//! whose image lies in `bounds`, or an empty interval when there are none.

use super::{hull_all, Interval};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// `1/e`, location and value of the maximum of `-x ln x`.
pub(crate) const INV_E: f64 = 0.367_879_441_171_442_33;

/// Relative outward widening applied to bounds computed through libm calls.
const NUDGE: f64 = 1e-12;

const BISECTION_STEPS: usize = 200;

#[inline]
fn nudge_down(v: f64) -> f64 {
    if v.is_finite() { v - NUDGE * v.abs().max(1.0) } else { v }
}

#[inline]
fn nudge_up(v: f64) -> f64 {
    if v.is_finite() { v + NUDGE * v.abs().max(1.0) } else { v }
}

fn entropy_at(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else if x.is_infinite() {
        f64::NEG_INFINITY
    } else {
        -x * x.ln()
    }
}

pub(crate) fn is_integral(p: f64) -> bool {
    p.fract() == 0.0 && p.abs() < f64::from(i32::MAX)
}

impl Interval {
    pub fn exp(self) -> Interval {
        if self.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(self.inf.exp(), self.sup.exp())
    }

    /// Natural logarithm of the part of `self` inside `x > 0`.
    pub fn ln(self) -> Interval {
        let x = self.intersect(&Interval::NONNEGATIVE);
        if x.is_empty() || x.sup == 0.0 {
            return Interval::EMPTY;
        }
        Interval::new(x.inf.ln(), x.sup.ln())
    }

    /// `x^p`. Integral exponents use the whole real line as domain, fractional
    /// exponents only `x ≥ 0`.
    pub fn powf(self, p: f64) -> Interval {
        if self.is_empty() {
            return Interval::EMPTY;
        }
        if p == 0.0 {
            return Interval::point(1.0);
        }
        if is_integral(p) {
            let n = p as i32;
            if n < 0 {
                return self.powf(-p).recip();
            }
            if n % 2 == 0 {
                let lo = if self.contains_zero() { 0.0 } else { self.inf.abs().min(self.sup.abs()) };
                let hi = self.inf.abs().max(self.sup.abs());
                return Interval::new(lo.powi(n), hi.powi(n));
            }
            return Interval::new(self.inf.powi(n), self.sup.powi(n));
        }
        let x = self.intersect(&Interval::NONNEGATIVE);
        if x.is_empty() {
            return Interval::EMPTY;
        }
        if p > 0.0 {
            Interval::new(x.inf.powf(p), x.sup.powf(p))
        } else {
            Interval::new(x.sup.powf(p), x.inf.powf(p))
        }
    }

    pub fn sin(self) -> Interval {
        trig_range(self, f64::sin, FRAC_PI_2, -FRAC_PI_2)
    }

    pub fn cos(self) -> Interval {
        trig_range(self, f64::cos, 0.0, PI)
    }

    pub fn abs(self) -> Interval {
        if self.is_empty() {
            return Interval::EMPTY;
        }
        if self.inf >= 0.0 {
            self
        } else if self.sup <= 0.0 {
            -self
        } else {
            Interval::new(0.0, (-self.inf).max(self.sup))
        }
    }

    /// `-x ln x` on the part of `self` inside `x ≥ 0`.
    pub fn entropy(self) -> Interval {
        let x = self.intersect(&Interval::NONNEGATIVE);
        if x.is_empty() {
            return Interval::EMPTY;
        }
        let (a, b) = (entropy_at(x.inf), entropy_at(x.sup));
        let hi = if x.contains(INV_E) { INV_E } else { a.max(b) };
        Interval::new(nudge_down(a.min(b)), nudge_up(hi))
    }
}

/// Range of a `2π`-periodic function with maxima at `peak + 2kπ` and minima at
/// `trough + 2kπ`.
fn trig_range(x: Interval, f: fn(f64) -> f64, peak: f64, trough: f64) -> Interval {
    if x.is_empty() {
        return Interval::EMPTY;
    }
    if !x.is_bounded() || x.sup - x.inf >= TAU {
        return Interval::new(-1.0, 1.0);
    }
    let (a, b) = (f(x.inf), f(x.sup));
    let lo = if hits_period(x, trough) { -1.0 } else { nudge_down(a.min(b)).max(-1.0) };
    let hi = if hits_period(x, peak) { 1.0 } else { nudge_up(a.max(b)).min(1.0) };
    Interval::new(lo, hi)
}

fn hits_period(x: Interval, base: f64) -> bool {
    let k = ((x.inf - base) / TAU).ceil();
    base + k * TAU <= x.sup
}

/// Hull of `{x ∈ within : x·d ∈ bounds for some d ∈ factor}`.
///
/// When `factor` touches zero and `bounds` excludes it, the solution set is a
/// pair of rays; each ray is clipped to `within` before taking the hull.
pub fn solve_product(bounds: Interval, factor: Interval, within: Interval) -> Interval {
    if bounds.is_empty() || factor.is_empty() || within.is_empty() {
        return Interval::EMPTY;
    }
    if bounds.contains_zero() && factor.contains_zero() {
        return within;
    }
    if factor.inf == 0.0 && factor.sup == 0.0 {
        return Interval::EMPTY;
    }
    if !factor.contains_zero() {
        return (bounds / factor).intersect(&within);
    }

    let (lo, hi) = (factor.inf, factor.sup);
    let (left, right) = if bounds.inf > 0.0 {
        let a = bounds.inf;
        (
            (lo < 0.0).then(|| Interval::new(f64::NEG_INFINITY, a / lo)),
            (hi > 0.0).then(|| Interval::new(a / hi, f64::INFINITY)),
        )
    } else {
        let b = bounds.sup;
        (
            (hi > 0.0).then(|| Interval::new(f64::NEG_INFINITY, b / hi)),
            (lo < 0.0).then(|| Interval::new(b / lo, f64::INFINITY)),
        )
    };
    hull_all(left.into_iter().chain(right).map(|ray| ray.intersect(&within)))
}

/// Inverse of `x ↦ x^p`.
pub fn pow_inverse(bounds: Interval, p: f64, within: Interval) -> Interval {
    if bounds.is_empty() || within.is_empty() {
        return Interval::EMPTY;
    }
    if p == 0.0 {
        return if bounds.contains(1.0) { within } else { Interval::EMPTY };
    }
    if p < 0.0 {
        // x^p = 1 / x^|p|
        let base = solve_product(Interval::point(1.0), bounds, Interval::ENTIRE);
        return pow_inverse(base, -p, within);
    }

    let root = |v: f64| v.signum() * v.abs().powf(1.0 / p);
    if is_integral(p) && (p as i32) % 2 != 0 {
        let x = Interval::new(nudge_down(root(bounds.inf)), nudge_up(root(bounds.sup)));
        return x.intersect(&within);
    }

    let b = bounds.intersect(&Interval::NONNEGATIVE);
    if b.is_empty() {
        return Interval::EMPTY;
    }
    let positive = Interval::new(nudge_down(root(b.inf)).max(0.0), nudge_up(root(b.sup)));
    if is_integral(p) {
        hull_all([positive.intersect(&within), (-positive).intersect(&within)])
    } else {
        positive.intersect(&within)
    }
}

/// Inverse of `exp`: empty when `bounds` holds no positive value.
pub fn exp_inverse(bounds: Interval, within: Interval) -> Interval {
    if bounds.is_empty() || bounds.sup <= 0.0 {
        return Interval::EMPTY;
    }
    let lo = if bounds.inf <= 0.0 { f64::NEG_INFINITY } else { nudge_down(bounds.inf.ln()) };
    Interval::new(lo, nudge_up(bounds.sup.ln())).intersect(&within)
}

/// Inverse of `ln`.
pub fn log_inverse(bounds: Interval, within: Interval) -> Interval {
    if bounds.is_empty() {
        return Interval::EMPTY;
    }
    let lo = nudge_down(bounds.inf.exp()).max(0.0);
    Interval::new(lo, nudge_up(bounds.sup.exp())).intersect(&within)
}

pub fn abs_inverse(bounds: Interval, within: Interval) -> Interval {
    let b = bounds.intersect(&Interval::NONNEGATIVE);
    if b.is_empty() {
        return Interval::EMPTY;
    }
    hull_all([b.intersect(&within), (-b).intersect(&within)])
}

pub fn sin_inverse(bounds: Interval, within: Interval) -> Interval {
    periodic_inverse(bounds, within, 0.0)
}

/// `cos x = sin(x + π/2)`.
pub fn cos_inverse(bounds: Interval, within: Interval) -> Interval {
    periodic_inverse(bounds, within, FRAC_PI_2)
}

fn periodic_inverse(bounds: Interval, within: Interval, shift: f64) -> Interval {
    let b = bounds.intersect(&Interval::new(-1.0, 1.0));
    if b.is_empty() || within.is_empty() {
        return Interval::EMPTY;
    }
    if (b.inf <= -1.0 && b.sup >= 1.0) || !within.is_bounded() {
        return within;
    }
    let (lo, hi) = (within.inf + shift, within.sup + shift);
    let first = first_sine_hit(lo, b);
    if first > hi {
        return Interval::EMPTY;
    }
    // sin(-y) = -sin(y): the last hit below `hi` mirrors the first above `-hi`.
    let last = -first_sine_hit(-hi, -b);
    Interval::new(
        nudge_down(first - shift).max(within.inf),
        nudge_up(last - shift).min(within.sup),
    )
}

/// Smallest `x ≥ start` with `sin x ∈ b`, where `b ⊆ [-1, 1]` is non-empty.
fn first_sine_hit(start: f64, b: Interval) -> f64 {
    if b.contains(start.sin()) {
        return start;
    }
    let mut best = f64::INFINITY;
    for level in [b.inf, b.sup] {
        let base = level.asin();
        for root in [base, PI - base] {
            let k = ((start - root) / TAU).ceil();
            let x = root + k * TAU;
            if x >= start && x < best {
                best = x;
            }
        }
    }
    best
}

/// Inverse of `x ↦ -x ln x` over `x ≥ 0`, which rises on `[0, 1/e]` and falls
/// on `[1/e, ∞)`.
pub fn entropy_inverse(bounds: Interval, within: Interval) -> Interval {
    let within = within.intersect(&Interval::NONNEGATIVE);
    if bounds.is_empty() || within.is_empty() || bounds.inf > INV_E {
        return Interval::EMPTY;
    }
    let (a, b) = (bounds.inf, bounds.sup);

    let rising = if b < 0.0 {
        Interval::EMPTY
    } else {
        let lo = if a <= 0.0 { 0.0 } else { bisect(entropy_at, 0.0, INV_E, a, true).0 };
        let hi = if b >= INV_E { INV_E } else { bisect(entropy_at, 0.0, INV_E, b, true).1 };
        Interval::new(lo, hi)
    };

    let falling = {
        let lo = if b >= INV_E { INV_E } else { falling_bracket(b).0 };
        let hi = if a == f64::NEG_INFINITY { f64::INFINITY } else { falling_bracket(a).1 };
        Interval::new(lo, hi)
    };

    hull_all([rising.intersect(&within), falling.intersect(&within)])
}

fn falling_bracket(target: f64) -> (f64, f64) {
    let mut hi = 1.0_f64;
    while entropy_at(hi) > target && hi.is_finite() {
        hi *= 2.0;
    }
    if !hi.is_finite() {
        return (INV_E, f64::INFINITY);
    }
    bisect(entropy_at, INV_E, hi, target, false)
}

/// Bracket `(lo, hi)` around the point where the monotone `f` crosses `target`.
fn bisect(f: fn(f64) -> f64, mut lo: f64, mut hi: f64, target: f64, increasing: bool) -> (f64, f64) {
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        let before_crossing = if increasing { f(mid) < target } else { f(mid) > target };
        if before_crossing {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo, hi)
}
