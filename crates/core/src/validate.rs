//! The validation engine: raw input in, typed [`Value`] out.
//!
//! A [`Validator`] owns all per-call traversal state: the current depth,
//! the set of raw containers on the current descent path, and the
//! inference scope used for dynamic slots. Nothing is shared between
//! validators, so concurrent calls are isolated by construction.
//!
//! Exceeding the depth limit or re-entering a container that is already
//! being validated (a reference cycle) is not an error: that subtree
//! becomes an unknown value of the expected type.

use std::collections::{BTreeMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use bigdecimal::{BigDecimal, One, Zero};

use crate::config::CtyConfig;
use crate::error::{CtyError, ErrorKind};
use crate::infer::InferenceScope;
use crate::path::PathStep;
use crate::raw::Raw;
use crate::text::{float_to_number, nfc, parse_number};
use crate::types::{CapsuleType, ObjectType, Type};
use crate::values::{
    canonical_set, ensure_hashable, missing_attribute, unknown_attributes, Payload, Value,
    ValueState,
};

#[derive(Debug)]
pub struct Validator {
    max_depth: usize,
    depth: usize,
    active: HashSet<usize>,
    inference: InferenceScope,
}

impl Default for Validator {
    fn default() -> Self {
        Validator::new()
    }
}

/// Scoped descent. Dropping it undoes the depth increment and releases the
/// container identity, on every exit path.
struct Descent<'a> {
    validator: &'a mut Validator,
    node: Option<usize>,
}

impl Drop for Descent<'_> {
    fn drop(&mut self) {
        self.validator.depth -= 1;
        if let Some(id) = self.node {
            self.validator.active.remove(&id);
        }
    }
}

impl Deref for Descent<'_> {
    type Target = Validator;

    fn deref(&self) -> &Validator {
        self.validator
    }
}

impl DerefMut for Descent<'_> {
    fn deref_mut(&mut self) -> &mut Validator {
        self.validator
    }
}

impl Validator {
    pub fn new() -> Self {
        let config = CtyConfig::current();
        Validator {
            max_depth: config.max_validation_depth,
            depth: 0,
            active: HashSet::new(),
            inference: InferenceScope::with_cache(config.enable_type_inference_cache),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn validate(&mut self, ty: &Type, raw: &Raw) -> Result<Value, CtyError> {
        self.descend(ty, raw)
    }

    fn descend(&mut self, ty: &Type, raw: &Raw) -> Result<Value, CtyError> {
        self.depth += 1;
        let mut scope = Descent {
            validator: self,
            node: None,
        };

        if scope.depth > scope.max_depth {
            tracing::warn!(
                depth = scope.depth,
                max_depth = scope.max_depth,
                ty = %ty,
                "validation depth exceeded, subtree treated as unknown"
            );
            return Ok(Value::unknown(ty.clone()));
        }

        if let Some(id) = raw.identity() {
            if !scope.active.insert(id) {
                tracing::debug!(ty = %ty, "reference cycle, subtree treated as unknown");
                return Ok(Value::unknown(ty.clone()));
            }
            scope.node = Some(id);
        }

        scope.validate_node(ty, raw)
    }

    fn validate_node(&mut self, ty: &Type, raw: &Raw) -> Result<Value, CtyError> {
        match raw {
            Raw::Null => return Ok(Value::null(ty.clone())),
            Raw::Unknown => return Ok(Value::unknown(ty.clone())),
            Raw::Value(v) => return accept_value(ty, v),
            _ => {}
        }

        match ty {
            Type::Bool => validate_bool(raw),
            Type::Number => validate_number(raw),
            Type::String => validate_string(raw),
            Type::List(element) => self.validate_list(element, raw),
            Type::Set(element) => self.validate_set(element, raw),
            Type::Tuple(elements) => self.validate_tuple(elements, raw),
            Type::Map(element) => self.validate_map(element, raw),
            Type::Object(obj) => self.validate_object(obj, raw),
            Type::Dynamic => self.validate_dynamic(raw),
            Type::Capsule(capsule) => validate_capsule(capsule, raw),
        }
    }

    fn validate_elements(&mut self, element: &Type, raw: &Raw) -> Result<Vec<Value>, CtyError> {
        let seq = match raw {
            Raw::List(seq) | Raw::Tuple(seq) | Raw::Set(seq) => seq,
            other => {
                return Err(CtyError::new(
                    ErrorKind::ListValidation,
                    format!("Input must be a list, tuple, or set, got {}.", other.kind_name()),
                ))
            }
        };
        let children = seq.items();
        let mut items = Vec::with_capacity(children.len());
        for (i, child) in children.iter().enumerate() {
            if matches!(child, Raw::Null) && !element.is_dynamic() {
                return Err(CtyError::new(
                    ErrorKind::ListValidation,
                    format!("List elements cannot be null for element type {}", element),
                )
                .at(PathStep::Index(i)));
            }
            let item = self
                .descend(element, child)
                .map_err(|e| e.at(PathStep::Index(i)))?;
            items.push(item);
        }
        Ok(items)
    }

    fn validate_list(&mut self, element: &Type, raw: &Raw) -> Result<Value, CtyError> {
        let items = self.validate_elements(element, raw)?;
        Ok(Value::known(
            Type::list(element.clone()),
            Payload::List(Arc::new(items)),
        ))
    }

    fn validate_set(&mut self, element: &Type, raw: &Raw) -> Result<Value, CtyError> {
        let items = self
            .validate_elements(element, raw)
            .map_err(|e| match e.kind() {
                ErrorKind::ListValidation if e.path().steps().len() <= 1 => {
                    CtyError::new(ErrorKind::SetValidation, e.message().to_string())
                        .with_path(e.path().clone())
                }
                _ => e,
            })?;
        for (i, item) in items.iter().enumerate() {
            if item.is_known() && !item.is_null() {
                ensure_hashable(item).map_err(|e| e.at(PathStep::Index(i)))?;
            }
        }
        Ok(Value::known(
            Type::set(element.clone()),
            Payload::Set(Arc::new(canonical_set(items))),
        ))
    }

    fn validate_tuple(&mut self, elements: &[Type], raw: &Raw) -> Result<Value, CtyError> {
        let seq = match raw {
            Raw::List(seq) | Raw::Tuple(seq) => seq,
            other => {
                return Err(CtyError::new(
                    ErrorKind::TupleValidation,
                    format!("Input must be a list or tuple, got {}.", other.kind_name()),
                ))
            }
        };
        let children = seq.items();
        if children.len() != elements.len() {
            return Err(CtyError::new(
                ErrorKind::TupleValidation,
                format!(
                    "Expected {} elements, got {}",
                    elements.len(),
                    children.len()
                ),
            ));
        }
        let mut items = Vec::with_capacity(children.len());
        for (i, (ty, child)) in elements.iter().zip(children.iter()).enumerate() {
            items.push(self.descend(ty, child).map_err(|e| e.at(PathStep::Index(i)))?);
        }
        Ok(Value::known(
            Type::Tuple(elements.to_vec()),
            Payload::Tuple(Arc::new(items)),
        ))
    }

    fn validate_map(&mut self, element: &Type, raw: &Raw) -> Result<Value, CtyError> {
        let dict = match raw {
            Raw::Dict(dict) => dict,
            other => {
                return Err(CtyError::new(
                    ErrorKind::MapValidation,
                    format!("Input must be a dictionary, got {}.", other.kind_name()),
                ))
            }
        };
        let mut entries = BTreeMap::new();
        for (key, child) in dict.entries() {
            let key = match key {
                Raw::String(k) => nfc(&k),
                other => {
                    return Err(CtyError::new(
                        ErrorKind::MapValidation,
                        format!(
                            "Map keys must be strings, but got key of type {}",
                            other.kind_name()
                        ),
                    ))
                }
            };
            let value = self
                .descend(element, &child)
                .map_err(|e| e.at(PathStep::Key(key.clone())))?;
            entries.insert(key, value);
        }
        Ok(Value::known(
            Type::map(element.clone()),
            Payload::Map(Arc::new(entries)),
        ))
    }

    fn validate_object(&mut self, obj: &ObjectType, raw: &Raw) -> Result<Value, CtyError> {
        let dict = match raw {
            Raw::Dict(dict) => dict,
            other => {
                return Err(CtyError::new(
                    ErrorKind::AttributeValidation,
                    format!("Input must be a dictionary, got {}.", other.kind_name()),
                ))
            }
        };

        let mut given = BTreeMap::new();
        for (key, child) in dict.entries() {
            match key {
                Raw::String(k) => {
                    given.insert(nfc(&k), child);
                }
                other => {
                    return Err(CtyError::new(
                        ErrorKind::AttributeValidation,
                        format!(
                            "Attribute names must be strings, but got key of type {}",
                            other.kind_name()
                        ),
                    ))
                }
            }
        }

        let unknown: Vec<&String> = given.keys().filter(|k| !obj.has_attribute(k)).collect();
        if !unknown.is_empty() {
            return Err(unknown_attributes(unknown.into_iter()));
        }

        let mut attrs = BTreeMap::new();
        for (name, attr_ty) in obj.attributes() {
            let value = match given.get(name) {
                None | Some(Raw::Null) if obj.is_optional(name) => Value::null(attr_ty.clone()),
                None => return Err(missing_attribute(name)),
                Some(Raw::Null) if !attr_ty.is_dynamic() => {
                    return Err(CtyError::new(
                        ErrorKind::AttributeValidation,
                        "Attribute cannot be null",
                    )
                    .at(PathStep::Attr(name.clone())))
                }
                Some(child) => self
                    .descend(attr_ty, child)
                    .map_err(|e| e.at(PathStep::Attr(name.clone())))?,
            };
            attrs.insert(name.clone(), value);
        }
        Ok(Value::known(
            Type::Object(obj.clone()),
            Payload::Object(Arc::new(attrs)),
        ))
    }

    fn validate_dynamic(&mut self, raw: &Raw) -> Result<Value, CtyError> {
        let inferred = self.inference.infer(raw);
        if inferred.is_dynamic() {
            return Err(CtyError::new(
                ErrorKind::TypeMismatch,
                format!("Cannot infer a concrete type for {}", raw.kind_name()),
            ));
        }
        let concrete = self.validate_node(&inferred, raw)?;
        Ok(Value::dynamic(concrete))
    }
}

/// An already-typed value is accepted when its type matches exactly, when
/// the slot is dynamic, or when it is a dynamic wrapper around a match.
fn accept_value(ty: &Type, v: &Value) -> Result<Value, CtyError> {
    if v.ty() == ty {
        return Ok(v.clone());
    }
    if ty.is_dynamic() {
        return Ok(Value::dynamic(v.clone()));
    }
    if v.ty().is_dynamic() {
        let marks = v.marks().iter().cloned();
        return match v.state() {
            ValueState::Null => Ok(Value::null(ty.clone()).with_marks(marks)),
            ValueState::Unknown(_) => Ok(Value::unknown(ty.clone()).with_marks(marks)),
            ValueState::Known(_) => Ok(accept_value(ty, v.concrete())?.with_marks(marks)),
        };
    }
    Err(CtyError::type_mismatch(ty, v.ty()))
}

fn validate_bool(raw: &Raw) -> Result<Value, CtyError> {
    let b = match raw {
        Raw::Bool(b) => Some(*b),
        Raw::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Raw::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        Raw::Int(1) => Some(true),
        Raw::Int(0) => Some(false),
        Raw::Float(f) if *f == 1.0 => Some(true),
        Raw::Float(f) if *f == 0.0 => Some(false),
        Raw::Number(d) if d.is_one() => Some(true),
        Raw::Number(d) if d.is_zero() => Some(false),
        _ => None,
    };
    b.map(Value::bool).ok_or_else(|| {
        CtyError::new(
            ErrorKind::BoolValidation,
            format!("Cannot convert {} to bool", raw.kind_name()),
        )
    })
}

fn validate_number(raw: &Raw) -> Result<Value, CtyError> {
    let unrepresentable = |text: &str| {
        CtyError::new(
            ErrorKind::NumberValidation,
            format!("Cannot represent {} value '{}' as Decimal", raw.kind_name(), text),
        )
    };
    let n = match raw {
        Raw::Int(i) => BigDecimal::from(*i),
        Raw::Number(d) => d.clone(),
        Raw::Bool(b) => BigDecimal::from(u8::from(*b)),
        Raw::Float(f) => float_to_number(*f).ok_or_else(|| unrepresentable(&f.to_string()))?,
        Raw::String(s) => parse_number(s).ok_or_else(|| unrepresentable(s))?,
        Raw::Bytes(b) => {
            let text = String::from_utf8_lossy(b);
            parse_number(&text).ok_or_else(|| unrepresentable(&text))?
        }
        other => {
            return Err(CtyError::new(
                ErrorKind::NumberValidation,
                format!("Cannot convert {} to number", other.kind_name()),
            ))
        }
    };
    Ok(Value::number(n))
}

fn validate_string(raw: &Raw) -> Result<Value, CtyError> {
    match raw {
        Raw::String(s) => Ok(Value::string(s)),
        Raw::Bytes(b) => std::str::from_utf8(b).map(Value::string).map_err(|e| {
            CtyError::new(
                ErrorKind::StringValidation,
                format!("Bytes are not valid UTF-8: {}", e),
            )
        }),
        other => Err(CtyError::new(
            ErrorKind::StringValidation,
            format!("Cannot convert {} to string", other.kind_name()),
        )),
    }
}

fn validate_capsule(capsule: &CapsuleType, raw: &Raw) -> Result<Value, CtyError> {
    match raw {
        Raw::Capsule(host) => Value::capsule(capsule, host.clone()),
        other => Err(CtyError::new(
            ErrorKind::CapsuleValidation,
            format!(
                "Value is not an instance of {}, got {}",
                capsule.host_type_name(),
                other.kind_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn bool_inputs() {
        assert_eq!(Type::Bool.validate(true).unwrap(), Value::bool(true));
        assert_eq!(Type::Bool.validate("TRUE").unwrap(), Value::bool(true));
        assert_eq!(Type::Bool.validate("False").unwrap(), Value::bool(false));
        assert_eq!(Type::Bool.validate(1).unwrap(), Value::bool(true));
        assert_eq!(Type::Bool.validate(0.0).unwrap(), Value::bool(false));
    }

    #[test]
    fn bool_rejects() {
        for raw in [Raw::from("not a bool"), Raw::from(123), Raw::from(-1), Raw::from(2.0)] {
            let err = Type::Bool.validate(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BoolValidation);
        }
        let err = Type::Bool.validate(Raw::list([])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Boolean validation error: Cannot convert list to bool"
        );
    }

    #[test]
    fn number_inputs() {
        assert_eq!(Type::Number.validate(42).unwrap(), Value::number(42));
        assert_eq!(Type::Number.validate("123.45").unwrap(), Value::number(dec("123.45")));
        assert_eq!(Type::Number.validate(true).unwrap(), Value::number(1));
        assert_eq!(
            Type::Number.validate(Raw::Bytes(b"123.456789".to_vec())).unwrap(),
            Value::number(dec("123.456789"))
        );
        assert_eq!(Type::Number.validate(0.5).unwrap(), Value::number(dec("0.5")));
    }

    #[test]
    fn number_keeps_precision() {
        let v = Type::Number.validate("1234567890123456789.123456789").unwrap();
        assert_eq!(v.as_number().unwrap().to_string(), "1234567890123456789.123456789");
    }

    #[test]
    fn numbers_beyond_machine_width() {
        for text in [
            "1267650600228229401496703205376",
            "340282366920938463463374607431768211456",
            "-340282366920938463463374607431768211456.5",
        ] {
            let v = Type::Number.validate(text).unwrap();
            assert_eq!(v.to_string(), text);
            assert_eq!(v, Value::number(dec(text)));
        }
        let from_u64 = Type::Number.validate(u64::MAX).unwrap();
        assert_eq!(from_u64.to_string(), "18446744073709551615");
    }

    #[test]
    fn number_rejects_text() {
        let err = Type::Number.validate("x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Number validation error: Cannot represent str value 'x' as Decimal"
        );
        assert!(Type::Number.validate(f64::NAN).is_err());
    }

    #[test]
    fn string_inputs() {
        assert_eq!(Type::String.validate("hi").unwrap(), Value::string("hi"));
        assert_eq!(
            Type::String.validate(Raw::Bytes("héllo".as_bytes().to_vec())).unwrap(),
            Value::string("héllo")
        );
        assert_eq!(
            Type::String.validate(Raw::Bytes(vec![0xff, 0xfe])).unwrap_err().kind(),
            ErrorKind::StringValidation
        );
        assert_eq!(
            Type::String.validate(5).unwrap_err().kind(),
            ErrorKind::StringValidation
        );
    }

    #[test]
    fn null_and_unknown_raw_become_typed() {
        for ty in [Type::Bool, Type::list(Type::String), Type::Dynamic] {
            let null = ty.validate(Raw::Null).unwrap();
            assert!(null.is_null());
            assert_eq!(null.ty(), &ty);
            let unknown = ty.validate(Raw::Unknown).unwrap();
            assert!(unknown.is_unknown());
            assert_eq!(unknown.ty(), &ty);
        }
    }

    #[test]
    fn typed_values_are_strict() {
        let err = Type::String.validate(Value::number(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let null = Value::null(Type::String);
        assert_eq!(Type::String.validate(null.clone()).unwrap(), null);

        let wrapped = Type::Dynamic.validate(Value::number(1)).unwrap();
        assert_eq!(wrapped.ty(), &Type::Dynamic);
        assert_eq!(Type::Number.validate(wrapped).unwrap(), Value::number(1));
    }

    #[test]
    fn marks_survive_validation() {
        let v = Value::string("s").mark("sensitive");
        let list = Type::list(Type::String)
            .validate(Raw::list([Raw::from(v)]))
            .unwrap();
        assert!(list.elements().unwrap()[0].marks().contains_name("sensitive"));
    }

    #[test]
    fn depth_limit_yields_unknown() {
        let mut raw = Raw::from("leaf");
        let mut ty = Type::String;
        for _ in 0..20 {
            raw = Raw::list([raw]);
            ty = Type::list(ty);
        }
        let mut validator = Validator::new().with_max_depth(10);
        let v = validator.validate(&ty, &raw).unwrap();
        assert!(v.is_known());
        assert!(!v.is_wholly_known());
        assert_eq!(validator.depth, 0);
        assert!(validator.active.is_empty());
    }

    #[test]
    fn state_is_released_after_errors() {
        let mut validator = Validator::new();
        let ty = Type::list(Type::list(Type::Number));
        let raw = Raw::from(serde_json::json!([[1], ["x"]]));
        let err = validator.validate(&ty, &raw).unwrap_err();
        assert_eq!(err.path().to_string(), "[1][0]");
        assert_eq!(validator.depth, 0);
        assert!(validator.active.is_empty());

        let ok = validator.validate(&ty, &Raw::from(serde_json::json!([[1]])));
        assert!(ok.is_ok());
    }
}
