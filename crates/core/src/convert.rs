//! Explicit conversion between types.
//!
//! Unlike validation, conversion is allowed to change a value's type:
//! numbers and booleans become strings, strings parse to numbers and
//! booleans, and collections convert element-wise.

use std::collections::BTreeMap;

use crate::error::CtyError;
use crate::path::PathStep;
use crate::text::{number_to_string, parse_number};
use crate::types::{ObjectType, Type};
use crate::values::{Payload, Value, ValueState};

/// Convert `value` to `target`. The value's own marks are kept.
pub fn convert(value: &Value, target: &Type) -> Result<Value, CtyError> {
    if target.is_dynamic() || value.ty() == target {
        return Ok(value.clone());
    }
    let marks = value.marks().iter().cloned();
    match value.state() {
        ValueState::Null => return Ok(Value::null(target.clone()).with_marks(marks)),
        ValueState::Unknown(_) => return Ok(Value::unknown(target.clone()).with_marks(marks)),
        ValueState::Known(_) => {}
    }
    let inner = value.concrete();
    if !std::ptr::eq(inner, value) {
        return Ok(convert(inner, target)?.with_marks(marks));
    }
    Ok(convert_known(value, target)?.with_marks(marks))
}

fn convert_known(value: &Value, target: &Type) -> Result<Value, CtyError> {
    let payload = value.payload().ok_or_else(|| unsupported(value.ty(), target))?;
    match (payload, target) {
        (Payload::Number(n), Type::String) => Ok(Value::string(number_to_string(n))),
        (Payload::Bool(b), Type::String) => Ok(Value::string(b.to_string())),
        (Payload::String(s), Type::Number) => parse_number(s)
            .map(Value::number)
            .ok_or_else(|| CtyError::conversion(format!("a number is required, got \"{}\"", s))),
        (Payload::String(s), Type::Bool) => {
            if s.eq_ignore_ascii_case("true") {
                Ok(Value::bool(true))
            } else if s.eq_ignore_ascii_case("false") {
                Ok(Value::bool(false))
            } else {
                Err(CtyError::conversion(format!(
                    "a bool is required, got \"{}\"",
                    s
                )))
            }
        }
        (Payload::List(items) | Payload::Set(items) | Payload::Tuple(items), Type::List(e)) => {
            Value::list(e.as_ref().clone(), convert_elements(items, |_| e.as_ref())?)
        }
        (Payload::List(items) | Payload::Set(items) | Payload::Tuple(items), Type::Set(e)) => {
            Value::set(e.as_ref().clone(), convert_elements(items, |_| e.as_ref())?)
        }
        (Payload::List(items) | Payload::Tuple(items), Type::Tuple(elems)) => {
            if items.len() != elems.len() {
                return Err(CtyError::conversion(format!(
                    "a tuple of {} elements is required, got {}",
                    elems.len(),
                    items.len()
                )));
            }
            Ok(Value::tuple(convert_elements(items, |i| &elems[i])?))
        }
        (Payload::Map(entries) | Payload::Object(entries), Type::Map(e)) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries.iter() {
                let converted = convert(v, e).map_err(|err| err.at(PathStep::Key(k.clone())))?;
                out.insert(k.clone(), converted);
            }
            Value::map(e.as_ref().clone(), out)
        }
        (Payload::Map(entries) | Payload::Object(entries), Type::Object(obj)) => {
            convert_to_object(entries, obj)
        }
        (Payload::Capsule(host), _) => match value.ty() {
            Type::Capsule(capsule) => capsule
                .convert_value(host, target)
                .ok_or_else(|| unsupported(value.ty(), target)),
            _ => Err(unsupported(value.ty(), target)),
        },
        _ => Err(unsupported(value.ty(), target)),
    }
}

fn convert_elements<'a>(
    items: &[Value],
    element_type: impl Fn(usize) -> &'a Type,
) -> Result<Vec<Value>, CtyError> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| convert(v, element_type(i)).map_err(|e| e.at(PathStep::Index(i))))
        .collect()
}

fn convert_to_object(
    entries: &BTreeMap<String, Value>,
    obj: &ObjectType,
) -> Result<Value, CtyError> {
    if let Some(extra) = entries.keys().find(|k| !obj.has_attribute(k)) {
        return Err(CtyError::conversion(format!(
            "unsupported attribute \"{}\"",
            extra
        )));
    }
    let mut attrs = BTreeMap::new();
    for (name, attr_ty) in obj.attributes() {
        match entries.get(name) {
            Some(v) => {
                let converted =
                    convert(v, attr_ty).map_err(|e| e.at(PathStep::Attr(name.clone())))?;
                attrs.insert(name.clone(), converted);
            }
            None if obj.is_optional(name) => {}
            None => {
                return Err(CtyError::conversion(format!(
                    "attribute \"{}\" is required",
                    name
                )))
            }
        }
    }
    Value::object_typed(obj.clone(), attrs)
}

fn unsupported(from: &Type, to: &Type) -> CtyError {
    CtyError::conversion(format!("cannot convert {} to {}", from, to))
}
