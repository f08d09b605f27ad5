use bigdecimal::{BigDecimal, Zero};
use unicode_segmentation::UnicodeSegmentation;

use cty_core::{CtyError, NumberBound, Refinement, Type, Value};

use crate::interval::Interval;
use crate::{known_number, operand_marks, unknown_number};

const NAME: &str = "length";

/// Length of a collection, a structural value or a string.
///
/// Strings count grapheme clusters. Tuples and objects have a length fixed
/// by their type, so even unknown ones give a known result. For other
/// unknowns the result is an unknown number bounded by the refinement.
pub fn length(value: &Value) -> Result<Value, CtyError> {
    let marks = operand_marks(&[value]);
    let v = value.concrete();
    if v.is_null() {
        return Err(CtyError::function(NAME, "argument must not be null"));
    }

    let known = |n: usize| Ok(known_number(BigDecimal::from(n as u64), marks.clone()));
    match v.ty() {
        Type::Tuple(elements) => return known(elements.len()),
        Type::Object(obj) => return known(obj.attributes().len()),
        _ => {}
    }
    if let Some(s) = v.as_str() {
        return known(s.graphemes(true).count());
    }
    if let Some(items) = v.elements() {
        return known(items.len());
    }
    if let Some(entries) = v.entries() {
        return known(entries.len());
    }

    if v.is_unknown() {
        let refined = v.refinement().cloned().unwrap_or_default();
        let bounds = match v.ty() {
            Type::String => string_bounds(&refined),
            Type::List(_) | Type::Set(_) | Type::Map(_) => {
                if let Some(n) = refined.exact_length() {
                    return Ok(known_number(BigDecimal::from(n), marks));
                }
                length_bounds(&refined)
            }
            Type::Dynamic => non_negative(),
            other => return Err(unsupported(other)),
        };
        return Ok(unknown_number(bounds, marks));
    }
    Err(unsupported(v.ty()))
}

fn length_bounds(refined: &Refinement) -> Interval {
    let lower = refined.collection_length_lower_bound.unwrap_or(0);
    Interval {
        lower: Some(NumberBound::inclusive(BigDecimal::from(lower))),
        upper: refined
            .collection_length_upper_bound
            .map(|n| NumberBound::inclusive(BigDecimal::from(n))),
    }
}

/// A known prefix gives a lower bound, less one grapheme: the prefix's last
/// cluster may combine with whatever follows it.
fn string_bounds(refined: &Refinement) -> Interval {
    let from_prefix = refined
        .string_prefix
        .as_deref()
        .map(|p| p.graphemes(true).count().saturating_sub(1))
        .unwrap_or(0);
    Interval {
        lower: Some(NumberBound::inclusive(BigDecimal::from(from_prefix as u64))),
        upper: None,
    }
}

fn non_negative() -> Interval {
    Interval {
        lower: Some(NumberBound::inclusive(BigDecimal::zero())),
        upper: None,
    }
}

fn unsupported(ty: &Type) -> CtyError {
    CtyError::function(
        NAME,
        format!(
            "argument must be a string, a collection or a structural value, got {}",
            ty
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::One;
    use cty_core::ErrorKind;

    fn num(n: i64) -> Value {
        Value::number(n)
    }

    #[test]
    fn known_lengths() {
        let list = Value::list(Type::Number, vec![num(1), num(2), num(3)]).unwrap();
        assert_eq!(length(&list).unwrap(), num(3));
        assert_eq!(length(&Value::string("héllo")).unwrap(), num(5));
        assert_eq!(length(&Value::tuple(vec![num(1), Value::string("a")])).unwrap(), num(2));
    }

    #[test]
    fn graphemes_not_code_points() {
        // family emoji: seven code points, one cluster
        let s = Value::string("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}\u{200D}\u{1F466}");
        assert_eq!(length(&s).unwrap(), num(1));
    }

    #[test]
    fn unknown_tuple_has_known_length() {
        let ty = Type::tuple(vec![Type::String, Type::Number]);
        assert_eq!(length(&Value::unknown(ty)).unwrap(), num(2));
    }

    #[test]
    fn exact_length_bounds_resolve() {
        let v = Value::unknown_refined(
            Type::list(Type::String),
            Refinement::new()
                .with_collection_length_lower_bound(4)
                .with_collection_length_upper_bound(4),
        );
        assert_eq!(length(&v).unwrap(), num(4));
    }

    #[test]
    fn length_bounds_carry_over() {
        let v = Value::unknown_refined(
            Type::set(Type::Number),
            Refinement::new()
                .with_collection_length_lower_bound(1)
                .with_collection_length_upper_bound(10),
        );
        let r = length(&v).unwrap();
        let refined = r.refinement().unwrap();
        assert_eq!(
            refined.number_lower_bound,
            Some(NumberBound::inclusive(BigDecimal::one()))
        );
        assert_eq!(
            refined.number_upper_bound,
            Some(NumberBound::inclusive(BigDecimal::from(10)))
        );
    }

    #[test]
    fn unknown_string_with_prefix() {
        let v = Value::unknown_refined(Type::String, Refinement::new().with_string_prefix("arn:"));
        let r = length(&v).unwrap();
        assert_eq!(
            r.refinement().unwrap().number_lower_bound,
            Some(NumberBound::inclusive(BigDecimal::from(3)))
        );
    }

    #[test]
    fn rejects_numbers_and_nulls() {
        assert_eq!(length(&num(1)).unwrap_err().kind(), ErrorKind::Function);
        assert!(length(&Value::null(Type::list(Type::String))).is_err());
    }
}
