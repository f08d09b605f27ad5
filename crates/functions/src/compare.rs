use bigdecimal::BigDecimal;

use cty_core::{CtyError, NumberBound, Type, Value};

use crate::interval::Interval;
use crate::{check_number, known_number, operand_marks, unknown_number};

// ──────────────────────────────────────────────
// Ordering
// ──────────────────────────────────────────────

/// Known operands act as point intervals, so a comparison against an
/// unknown resolves whenever the intervals do not overlap.
pub fn less_than(a: &Value, b: &Value) -> Result<Value, CtyError> {
    ordering("less_than", a, b, |x, y| x.less_than(y))
}

pub fn less_than_or_equal_to(a: &Value, b: &Value) -> Result<Value, CtyError> {
    ordering("less_than_or_equal_to", a, b, |x, y| x.less_than_or_equal(y))
}

pub fn greater_than(a: &Value, b: &Value) -> Result<Value, CtyError> {
    ordering("greater_than", a, b, |x, y| y.less_than(x))
}

pub fn greater_than_or_equal_to(a: &Value, b: &Value) -> Result<Value, CtyError> {
    ordering("greater_than_or_equal_to", a, b, |x, y| y.less_than_or_equal(x))
}

fn ordering(
    name: &str,
    a: &Value,
    b: &Value,
    decide: fn(&Interval, &Interval) -> Option<bool>,
) -> Result<Value, CtyError> {
    check_number(name, 1, a)?;
    check_number(name, 2, b)?;
    if a.is_null() || b.is_null() {
        return Err(CtyError::function(name, "cannot compare a null value"));
    }
    let marks = operand_marks(&[a, b]);
    let result = match decide(&Interval::bounds_of(a), &Interval::bounds_of(b)) {
        Some(r) => Value::bool(r),
        None => Value::unknown(Type::Bool),
    };
    Ok(result.with_marks(marks))
}

// ──────────────────────────────────────────────
// Equality
// ──────────────────────────────────────────────

/// Unknown when either side is unknown, unless the unknown is refined as
/// non-null and the other side is null.
pub fn equal(a: &Value, b: &Value) -> Value {
    let marks = operand_marks(&[a, b]);
    match equality(a, b) {
        Some(eq) => Value::bool(eq),
        None => Value::unknown(Type::Bool),
    }
    .with_marks(marks)
}

pub fn not_equal(a: &Value, b: &Value) -> Value {
    let marks = operand_marks(&[a, b]);
    match equality(a, b) {
        Some(eq) => Value::bool(!eq),
        None => Value::unknown(Type::Bool),
    }
    .with_marks(marks)
}

fn equality(a: &Value, b: &Value) -> Option<bool> {
    match (a.is_unknown(), b.is_unknown()) {
        (true, true) => return None,
        (true, false) => return null_ruled_out(a, b),
        (false, true) => return null_ruled_out(b, a),
        (false, false) => {}
    }
    if a.is_null() || b.is_null() {
        return Some(a.is_null() && b.is_null());
    }
    if !a.is_wholly_known() || !b.is_wholly_known() {
        return None;
    }
    Some(a.concrete() == b.concrete())
}

fn null_ruled_out(unknown: &Value, other: &Value) -> Option<bool> {
    let not_null = unknown.refinement().and_then(|r| r.is_known_null) == Some(false);
    (not_null && other.is_null()).then_some(false)
}

// ──────────────────────────────────────────────
// Extremes
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

impl Extreme {
    /// Work in the orientation where the extreme is a maximum.
    fn orient(self, interval: Interval) -> Interval {
        match self {
            Extreme::Max => interval,
            Extreme::Min => interval.negate(),
        }
    }

    fn pick(self, a: BigDecimal, b: BigDecimal) -> BigDecimal {
        match self {
            Extreme::Max => a.max(b),
            Extreme::Min => a.min(b),
        }
    }
}

pub fn min(values: &[Value]) -> Result<Value, CtyError> {
    extreme("min", Extreme::Min, values)
}

pub fn max(values: &[Value]) -> Result<Value, CtyError> {
    extreme("max", Extreme::Max, values)
}

/// Nulls are skipped. Unknowns whose bounds keep them from beating the
/// best known value drop out; if nothing unknown is left the result is
/// known.
fn extreme(name: &str, which: Extreme, values: &[Value]) -> Result<Value, CtyError> {
    if values.is_empty() {
        return Err(CtyError::function(name, "at least one argument is required"));
    }
    for (i, v) in values.iter().enumerate() {
        if let Err(e) = check_number(name, i + 1, v) {
            if values.iter().any(|o| o.concrete().ty() == &Type::Number) {
                return Err(CtyError::function(
                    name,
                    format!(
                        "all arguments must have the same type, got number and {}",
                        v.concrete().ty()
                    ),
                ));
            }
            return Err(e);
        }
    }

    let operands: Vec<&Value> = values.iter().collect();
    let marks = operand_marks(&operands);
    let present: Vec<&Value> = operands.into_iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return Ok(Value::null(Type::Number).with_marks(marks));
    }

    let best = present
        .iter()
        .filter_map(|v| v.as_number().cloned())
        .reduce(|a, b| which.pick(a, b));
    let best_interval = best.clone().map(|k| which.orient(Interval::point(k)));
    let pending: Vec<&Value> = present
        .iter()
        .copied()
        .filter(|v| v.is_unknown())
        .filter(|v| match &best_interval {
            Some(known) => {
                which
                    .orient(Interval::bounds_of(v))
                    .less_than_or_equal(known)
                    != Some(true)
            }
            None => true,
        })
        .collect();

    match (best, pending.as_slice()) {
        (Some(k), []) => return Ok(known_number(k, marks)),
        (None, [only]) => return Ok((*only).clone().with_marks(marks)),
        _ => {}
    }

    let mut intervals: Vec<Interval> = pending
        .iter()
        .map(|v| which.orient(Interval::bounds_of(v)))
        .collect();
    intervals.extend(best_interval);
    Ok(unknown_number(which.orient(envelope(&intervals)), marks))
}

/// Bounds on the maximum of values drawn from `intervals`. Any lower bound
/// holds for the maximum; an upper bound needs one from every interval.
fn envelope(intervals: &[Interval]) -> Interval {
    let lower = intervals
        .iter()
        .filter_map(|i| i.lower.clone())
        .reduce(|a, b| larger(a, b, false));
    let upper = intervals
        .iter()
        .map(|i| i.upper.clone())
        .collect::<Option<Vec<_>>>()
        .and_then(|uppers| uppers.into_iter().reduce(|a, b| larger(a, b, true)));
    Interval { lower, upper }
}

/// The larger bound; on a tie, inclusive only if `loose` allows either.
fn larger(a: NumberBound, b: NumberBound, loose: bool) -> NumberBound {
    if a.value == b.value {
        let inclusive = if loose {
            a.inclusive || b.inclusive
        } else {
            a.inclusive && b.inclusive
        };
        return NumberBound::new(a.value, inclusive);
    }
    if a.value > b.value {
        a
    } else {
        b
    }
}
