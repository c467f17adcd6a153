//! Closed real intervals with extended (±∞) endpoints.
//!
//! An interval whose infimum exceeds its supremum is empty. All operations are
//! enclosures: the result contains every value the operation can produce on
//! members of the operands. Rounding is not directed, so the enclosure is sound
//! up to floating point error only.

mod functions;

pub use functions::{
    abs_inverse, cos_inverse, entropy_inverse, exp_inverse, log_inverse, pow_inverse,
    sin_inverse, solve_product,
};
pub(crate) use functions::{is_integral, INV_E};

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub inf: f64,
    pub sup: f64,
}

impl Interval {
    pub const ENTIRE: Interval = Interval { inf: f64::NEG_INFINITY, sup: f64::INFINITY };
    pub const EMPTY: Interval = Interval { inf: f64::INFINITY, sup: f64::NEG_INFINITY };
    pub const NONNEGATIVE: Interval = Interval { inf: 0.0, sup: f64::INFINITY };

    pub fn new(inf: f64, sup: f64) -> Self {
        debug_assert!(!inf.is_nan() && !sup.is_nan(), "BUG: NaN interval bound");
        Self { inf, sup }
    }

    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inf > self.sup
    }

    pub fn is_entire(&self) -> bool {
        self.inf == f64::NEG_INFINITY && self.sup == f64::INFINITY
    }

    pub fn is_bounded(&self) -> bool {
        self.inf.is_finite() && self.sup.is_finite()
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.inf <= value && value <= self.sup
    }

    #[inline]
    pub fn contains_zero(&self) -> bool {
        self.contains(0.0)
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.sup - self.inf }
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        let result = Interval { inf: self.inf.max(other.inf), sup: self.sup.min(other.sup) };
        if result.is_empty() { Interval::EMPTY } else { result }
    }

    /// Smallest interval containing both operands.
    pub fn hull(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval { inf: self.inf.min(other.inf), sup: self.sup.max(other.sup) }
    }

    pub fn is_subset_of(&self, other: &Interval) -> bool {
        self.is_empty() || (other.inf <= self.inf && self.sup <= other.sup)
    }

    /// Whether `self` improves on `old` at either end by more than the relative
    /// threshold `eps` (scaled by `max(1, |bound|)`). Any finite bound improves
    /// an infinite one.
    pub fn is_tighter_than(&self, old: &Interval, eps: f64) -> bool {
        let lower = self.inf != f64::NEG_INFINITY
            && (old.inf == f64::NEG_INFINITY || self.inf > old.inf + eps * old.inf.abs().max(1.0));
        let upper = self.sup != f64::INFINITY
            && (old.sup == f64::INFINITY || self.sup < old.sup - eps * old.sup.abs().max(1.0));
        lower || upper
    }

    /// Multiplication by a scalar. `0 · [−∞, ∞]` is `[0, 0]`.
    pub fn scale(self, factor: f64) -> Interval {
        if self.is_empty() {
            return Interval::EMPTY;
        }
        if factor == 0.0 {
            return Interval::point(0.0);
        }
        if factor > 0.0 {
            Interval::new(self.inf * factor, self.sup * factor)
        } else {
            Interval::new(self.sup * factor, self.inf * factor)
        }
    }

    /// Enclosure of `{1/x : x ∈ self, x ≠ 0}`.
    pub fn recip(self) -> Interval {
        if self.is_empty() || (self.inf == 0.0 && self.sup == 0.0) {
            return Interval::EMPTY;
        }
        if self.inf < 0.0 && self.sup > 0.0 {
            return Interval::ENTIRE;
        }
        if self.inf == 0.0 {
            return Interval::new(1.0 / self.sup, f64::INFINITY);
        }
        if self.sup == 0.0 {
            return Interval::new(f64::NEG_INFINITY, 1.0 / self.inf);
        }
        Interval::new(1.0 / self.sup, 1.0 / self.inf)
    }
}

/// Bound product with `0 · ±∞ = 0`.
#[inline]
fn mul_bound(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 { 0.0 } else { a * b }
}

/// Hull of every non-empty interval in `parts`.
pub(crate) fn hull_all(parts: impl IntoIterator<Item = Interval>) -> Interval {
    parts.into_iter().fold(Interval::EMPTY, |acc, part| acc.hull(&part))
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(self.inf + rhs.inf, self.sup + rhs.sup)
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(self.inf - rhs.sup, self.sup - rhs.inf)
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        if self.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(-self.sup, -self.inf)
    }
}

impl Mul for Interval {
    type Output = Interval;

    fn mul(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::EMPTY;
        }
        let products = [
            mul_bound(self.inf, rhs.inf),
            mul_bound(self.inf, rhs.sup),
            mul_bound(self.sup, rhs.inf),
            mul_bound(self.sup, rhs.sup),
        ];
        let inf = products.iter().copied().fold(f64::INFINITY, f64::min);
        let sup = products.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Interval::new(inf, sup)
    }
}

impl Div for Interval {
    type Output = Interval;

    fn div(self, rhs: Interval) -> Interval {
        self * rhs.recip()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}, {}]", self.inf, self.sup)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INF: f64 = f64::INFINITY;

    fn iv(inf: f64, sup: f64) -> Interval {
        Interval::new(inf, sup)
    }

    #[rstest]
    #[case(iv(-1.0, 1.0), iv(0.0, 2.0), iv(-2.0, 2.0))]
    #[case(iv(0.0, 0.0), Interval::ENTIRE, iv(0.0, 0.0))]
    #[case(iv(0.0, 1.0), iv(2.0, INF), iv(0.0, INF))]
    #[case(iv(-1.0, 1.0), iv(0.0, 2.0) * iv(0.0, 3.0), iv(-6.0, 6.0))]
    #[case(iv(1.0, 8.0), iv(1.0 / 6.0, INF), iv(1.0 / 6.0, INF))]
    fn test_multiplication_handles_infinities(
        #[case] a: Interval,
        #[case] b: Interval,
        #[case] expected: Interval,
    ) {
        assert_eq!(a * b, expected);
    }

    #[rstest]
    #[case(iv(1.0, 8.0), iv(0.0, 6.0), iv(1.0 / 6.0, INF))]
    #[case(iv(1.0, 2.0), iv(-1.0, 1.0), Interval::ENTIRE)]
    #[case(iv(-4.0, -2.0), iv(-2.0, 0.0), iv(1.0, INF))]
    #[case(iv(1.0, 2.0), iv(0.0, 0.0), Interval::EMPTY)]
    fn test_division(#[case] a: Interval, #[case] b: Interval, #[case] expected: Interval) {
        let result = a / b;
        if expected.is_empty() {
            assert!(result.is_empty());
        } else {
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_sum_and_difference_with_unbounded_operands() {
        let unbounded = iv(f64::NEG_INFINITY, 3.0);
        assert_eq!(iv(1.0, 2.0) + unbounded, iv(f64::NEG_INFINITY, 5.0));
        assert_eq!(iv(0.5, 1.5) - Interval::ENTIRE, Interval::ENTIRE);
        assert_eq!(-iv(-3.0, 1.0), iv(-1.0, 3.0));
    }

    #[test]
    fn test_scale_by_zero_is_point() {
        assert_eq!(Interval::ENTIRE.scale(0.0), Interval::point(0.0));
        assert_eq!(iv(-2.0, 2.0).scale(-0.5), iv(-1.0, 1.0));
    }

    #[test]
    fn test_intersection_and_hull() {
        assert!(iv(0.0, 1.0).intersect(&iv(2.0, 3.0)).is_empty());
        assert_eq!(iv(0.0, 2.0).intersect(&iv(1.0, 3.0)), iv(1.0, 2.0));
        assert_eq!(Interval::EMPTY.hull(&iv(1.0, 2.0)), iv(1.0, 2.0));
        assert!(iv(1.0, 2.0).is_subset_of(&iv(0.0, 2.0)));
        assert!(Interval::EMPTY.is_subset_of(&iv(0.0, 0.0)));
    }

    #[test]
    fn test_width() {
        assert_eq!(iv(-1.0, 2.5).width(), 3.5);
        assert_eq!(Interval::EMPTY.width(), 0.0);
        assert_eq!(iv(0.0, INF).width(), INF);
    }

    #[test]
    fn test_tightness_threshold() {
        let old = iv(-2.0, 2.0);
        assert!(iv(-1.5, 2.0).is_tighter_than(&old, 1e-9));
        assert!(!iv(-2.0, 2.0).is_tighter_than(&old, 1e-9));
        assert!(!iv(-2.0 + 1e-12, 2.0).is_tighter_than(&old, 1e-9));
        assert!(iv(0.0, INF).is_tighter_than(&Interval::ENTIRE, 1e-9));
        assert!(!Interval::ENTIRE.is_tighter_than(&old, 1e-9));
    }

    #[test]
    fn test_display() {
        assert_eq!(iv(-1.0, 2.5).to_string(), "[-1, 2.5]");
        assert_eq!(Interval::EMPTY.to_string(), "[empty]");
    }
}
