//! Arithmetic over numbers that may be unknown.
//!
//! Known operands compute exactly. When an operand is unknown the result is
//! unknown too, refined with whatever bounds follow from the operands'
//! bounds. A null operand gives an unrefined unknown number.

use bigdecimal::{BigDecimal, Zero};

use cty_core::{CtyError, Value};

use crate::interval::Interval;
use crate::{check_number, known_number, operand_marks, unknown_number};

pub fn add(a: &Value, b: &Value) -> Result<Value, CtyError> {
    binary("add", a, b, |x, y| x + y, Interval::add)
}

pub fn subtract(a: &Value, b: &Value) -> Result<Value, CtyError> {
    binary("subtract", a, b, |x, y| x - y, Interval::sub)
}

/// A known zero on either side wins, even against an unknown.
pub fn multiply(a: &Value, b: &Value) -> Result<Value, CtyError> {
    const NAME: &str = "multiply";
    check_number(NAME, 1, a)?;
    check_number(NAME, 2, b)?;
    let marks = operand_marks(&[a, b]);
    if a.is_null() || b.is_null() {
        return Ok(unknown_number(Interval::unbounded(), marks));
    }
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => Ok(known_number(x * y, marks)),
        (Some(k), _) | (_, Some(k)) if k.is_zero() => {
            Ok(known_number(BigDecimal::zero(), marks))
        }
        (Some(k), None) => Ok(unknown_number(Interval::bounds_of(b).scale(k), marks)),
        (None, Some(k)) => Ok(unknown_number(Interval::bounds_of(a).scale(k), marks)),
        (None, None) => Ok(unknown_number(Interval::unbounded(), marks)),
    }
}

/// Dividing by a known zero is an error whatever the dividend is. Quotients
/// that do not terminate are rounded to the default precision of
/// [`BigDecimal`] division.
pub fn divide(a: &Value, b: &Value) -> Result<Value, CtyError> {
    const NAME: &str = "divide";
    check_number(NAME, 1, a)?;
    check_number(NAME, 2, b)?;
    if b.as_number().is_some_and(BigDecimal::is_zero) {
        return Err(CtyError::function(NAME, "divide by zero"));
    }
    let marks = operand_marks(&[a, b]);
    if a.is_null() || b.is_null() {
        return Ok(unknown_number(Interval::unbounded(), marks));
    }
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => Ok(known_number(x / y, marks)),
        (None, Some(k)) => Ok(unknown_number(Interval::bounds_of(a).divide(k), marks)),
        _ => Ok(unknown_number(Interval::unbounded(), marks)),
    }
}

pub fn negate(a: &Value) -> Result<Value, CtyError> {
    unary("negate", a, |n| -n, Interval::negate)
}

/// The result of `abs` on an unknown is always refined to be non-negative.
pub fn abs(a: &Value) -> Result<Value, CtyError> {
    unary("abs", a, BigDecimal::abs, Interval::abs)
}

fn binary(
    name: &str,
    a: &Value,
    b: &Value,
    op: fn(&BigDecimal, &BigDecimal) -> BigDecimal,
    bounds: fn(&Interval, &Interval) -> Interval,
) -> Result<Value, CtyError> {
    check_number(name, 1, a)?;
    check_number(name, 2, b)?;
    let marks = operand_marks(&[a, b]);
    let (Some(x), Some(y)) = (Interval::of(a), Interval::of(b)) else {
        return Ok(unknown_number(Interval::unbounded(), marks));
    };
    match (a.as_number(), b.as_number()) {
        (Some(l), Some(r)) => Ok(known_number(op(l, r), marks)),
        _ => Ok(unknown_number(bounds(&x, &y), marks)),
    }
}

fn unary(
    name: &str,
    a: &Value,
    op: fn(&BigDecimal) -> BigDecimal,
    bounds: fn(&Interval) -> Interval,
) -> Result<Value, CtyError> {
    check_number(name, 1, a)?;
    let marks = operand_marks(&[a]);
    match (a.as_number(), Interval::of(a)) {
        (Some(n), _) => Ok(known_number(op(n), marks)),
        (None, Some(x)) => Ok(unknown_number(bounds(&x), marks)),
        (None, None) => Ok(unknown_number(Interval::unbounded(), marks)),
    }
}
