//! cty-functions: operations over CTY values that keep track of what is
//! known about unknown results.
//!
//! Every function accepts unknown arguments. Where the arguments' refinements
//! pin the result down, the result is known; otherwise it is an unknown
//! refined as tightly as the inputs allow.
//!
//! # Public API
//!
//! - [`add`], [`subtract`], [`multiply`], [`divide`], [`negate`], [`abs`] -- arithmetic
//! - [`less_than`], [`less_than_or_equal_to`], [`greater_than`],
//!   [`greater_than_or_equal_to`] -- ordering through interval bounds
//! - [`equal`], [`not_equal`] -- equality, unknown when either side is
//! - [`min`], [`max`] -- extremes over several numbers
//! - [`length`] -- collection, structural or grapheme length
//! - [`to_string`], [`to_number`], [`to_bool`] -- conversion wrappers

mod arithmetic;
mod collection;
mod compare;
mod conversion;
mod interval;

pub use arithmetic::{abs, add, divide, multiply, negate, subtract};
pub use collection::length;
pub use compare::{
    equal, greater_than, greater_than_or_equal_to, less_than, less_than_or_equal_to, max, min,
    not_equal,
};
pub use conversion::{to_bool, to_number, to_string};

use bigdecimal::BigDecimal;

use cty_core::{CtyError, Marks, Type, Value};

use crate::interval::Interval;

// ──────────────────────────────────────────────
// Shared argument handling
// ──────────────────────────────────────────────

/// Numbers, plus nulls and unknowns that have not settled on a type yet.
pub(crate) fn check_number(name: &str, position: usize, value: &Value) -> Result<(), CtyError> {
    let concrete = value.concrete();
    let ok = match concrete.ty() {
        Type::Number => true,
        Type::Dynamic => concrete.is_unknown() || concrete.is_null(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(CtyError::function(
            name,
            format!("argument {} must be a number, got {}", position, concrete.ty()),
        ))
    }
}

/// Marks of every operand, including marks on values inside dynamic slots.
pub(crate) fn operand_marks(values: &[&Value]) -> Marks {
    values
        .iter()
        .flat_map(|v| v.marks().iter().chain(v.concrete().marks().iter()))
        .cloned()
        .collect()
}

pub(crate) fn known_number(n: BigDecimal, marks: Marks) -> Value {
    Value::number(n).with_marks(marks)
}

pub(crate) fn unknown_number(bounds: Interval, marks: Marks) -> Value {
    Value::unknown_refined(Type::Number, bounds.into_refinement()).with_marks(marks)
}
