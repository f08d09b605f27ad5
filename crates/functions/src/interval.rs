//! Numeric intervals for bound propagation.
//!
//! A known number is the point interval `[n, n]`; a refined unknown carries
//! whatever bounds its refinement declares; anything else is unbounded.

use bigdecimal::num_bigint::Sign;
use bigdecimal::{BigDecimal, Zero};

use cty_core::{NumberBound, Refinement, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Interval {
    pub lower: Option<NumberBound>,
    pub upper: Option<NumberBound>,
}

impl Interval {
    pub fn point(n: BigDecimal) -> Self {
        Interval {
            lower: Some(NumberBound::inclusive(n.clone())),
            upper: Some(NumberBound::inclusive(n)),
        }
    }

    pub fn unbounded() -> Self {
        Interval::default()
    }

    /// The interval a number-typed value is known to lie in. Nulls have no
    /// interval.
    pub fn of(value: &Value) -> Option<Self> {
        if let Some(n) = value.as_number() {
            return Some(Interval::point(n.clone()));
        }
        if !value.is_unknown() {
            return None;
        }
        Some(match value.refinement() {
            Some(r) => Interval {
                lower: r.number_lower_bound.clone(),
                upper: r.number_upper_bound.clone(),
            },
            None => Interval::unbounded(),
        })
    }

    /// Like [`Interval::of`], treating a null as unbounded.
    pub fn bounds_of(value: &Value) -> Self {
        Interval::of(value).unwrap_or_default()
    }

    pub fn add(&self, other: &Interval) -> Interval {
        Interval {
            lower: combine(&self.lower, &other.lower, |a, b| a + b),
            upper: combine(&self.upper, &other.upper, |a, b| a + b),
        }
    }

    /// `self - other`: the smallest result pairs our lower bound with their
    /// upper bound.
    pub fn sub(&self, other: &Interval) -> Interval {
        Interval {
            lower: combine(&self.lower, &other.upper, |a, b| a - b),
            upper: combine(&self.upper, &other.lower, |a, b| a - b),
        }
    }

    /// Scale by a known non-zero factor.
    pub fn scale(&self, k: &BigDecimal) -> Interval {
        self.map_monotonic(k.sign() == Sign::Minus, |b| b * k)
    }

    /// Divide by a known non-zero divisor. Quotients that do not terminate
    /// are rounded the same way known division rounds them.
    pub fn divide(&self, k: &BigDecimal) -> Interval {
        self.map_monotonic(k.sign() == Sign::Minus, |b| b / k)
    }

    pub fn negate(&self) -> Interval {
        Interval {
            lower: self.upper.as_ref().map(|b| NumberBound::new(-&b.value, b.inclusive)),
            upper: self.lower.as_ref().map(|b| NumberBound::new(-&b.value, b.inclusive)),
        }
    }

    pub fn abs(&self) -> Interval {
        let zero = BigDecimal::zero();
        match (&self.lower, &self.upper) {
            (Some(lo), _) if lo.value >= zero => self.clone(),
            (_, Some(hi)) if hi.value <= zero => self.negate(),
            (Some(lo), Some(hi)) => Interval {
                lower: Some(NumberBound::inclusive(zero)),
                upper: Some(NumberBound::inclusive(lo.value.abs().max(hi.value.abs()))),
            },
            _ => Interval {
                lower: Some(NumberBound::inclusive(zero)),
                upper: None,
            },
        }
    }

    /// Whether every point of `self` is below every point of `other`.
    /// `None` when the intervals overlap.
    pub fn less_than(&self, other: &Interval) -> Option<bool> {
        if let (Some(hi), Some(lo)) = (&self.upper, &other.lower) {
            if hi.value < lo.value || (hi.value == lo.value && !(hi.inclusive && lo.inclusive)) {
                return Some(true);
            }
        }
        if let (Some(lo), Some(hi)) = (&self.lower, &other.upper) {
            if lo.value >= hi.value {
                return Some(false);
            }
        }
        None
    }

    pub fn less_than_or_equal(&self, other: &Interval) -> Option<bool> {
        if let (Some(hi), Some(lo)) = (&self.upper, &other.lower) {
            if hi.value <= lo.value {
                return Some(true);
            }
        }
        if let (Some(lo), Some(hi)) = (&self.lower, &other.upper) {
            if lo.value > hi.value || (lo.value == hi.value && !(lo.inclusive && hi.inclusive)) {
                return Some(false);
            }
        }
        None
    }

    /// Apply the bounds to a fresh refinement.
    pub fn into_refinement(self) -> Refinement {
        let mut r = Refinement::new();
        r.number_lower_bound = self.lower;
        r.number_upper_bound = self.upper;
        r
    }

    fn map_monotonic(&self, flips: bool, f: impl Fn(&BigDecimal) -> BigDecimal) -> Interval {
        let apply = |b: &Option<NumberBound>| {
            b.as_ref().map(|b| NumberBound::new(f(&b.value), b.inclusive))
        };
        if flips {
            Interval {
                lower: apply(&self.upper),
                upper: apply(&self.lower),
            }
        } else {
            Interval {
                lower: apply(&self.lower),
                upper: apply(&self.upper),
            }
        }
    }
}

/// Combine two bounds; the result is inclusive only if both inputs are.
fn combine(
    a: &Option<NumberBound>,
    b: &Option<NumberBound>,
    op: fn(&BigDecimal, &BigDecimal) -> BigDecimal,
) -> Option<NumberBound> {
    let (a, b) = (a.as_ref()?, b.as_ref()?);
    Some(NumberBound::new(op(&a.value, &b.value), a.inclusive && b.inclusive))
}
