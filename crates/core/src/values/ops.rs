use std::sync::Arc;

use bigdecimal::ToPrimitive;

use crate::error::{CtyError, ErrorKind};
use crate::path::{step_error, PathStep};
use crate::raw::Raw;
use crate::text::{nfc, number_to_string};
use crate::types::Type;
use crate::values::{Payload, Value, ValueState};

// ──────────────────────────────────────────────
// Navigation
// ──────────────────────────────────────────────

impl Value {
    /// Number of elements of a collection, tuple or object. Null values
    /// have length zero; unknown values have no length.
    pub fn len(&self) -> Result<usize, CtyError> {
        let v = self.concrete();
        match &v.state {
            ValueState::Unknown(_) => Err(CtyError::new(
                ErrorKind::TypeMismatch,
                "Cannot take the length of an unknown value",
            )),
            ValueState::Null => Ok(0),
            ValueState::Known(p) => match p {
                Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => Ok(items.len()),
                Payload::Map(entries) | Payload::Object(entries) => Ok(entries.len()),
                _ => Err(CtyError::new(
                    ErrorKind::TypeMismatch,
                    format!("Value of type {} has no length", v.ty),
                )),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.len(), Ok(0))
    }

    /// Attribute of an object. The object's marks carry over to the result.
    pub fn get_attr(&self, name: &str) -> Result<Value, CtyError> {
        let v = self.concrete();
        let obj = match &v.ty {
            Type::Object(obj) => obj,
            other => {
                return Err(step_error(
                    &PathStep::Attr(name.to_string()),
                    format!("Cannot get attribute '{}' of {}", name, other),
                ))
            }
        };
        let name = nfc(name);
        let attr_ty = obj.attribute_type(&name).ok_or_else(|| {
            CtyError::new(
                ErrorKind::AttributeValidation,
                format!("Object has no attribute '{}'", name),
            )
        })?;
        let out = match &v.state {
            ValueState::Null => Value::null(attr_ty.clone()),
            ValueState::Unknown(_) => Value::unknown(attr_ty.clone()),
            ValueState::Known(_) => v
                .entries()
                .and_then(|entries| entries.get(&name))
                .cloned()
                .unwrap_or_else(|| Value::null(attr_ty.clone())),
        };
        Ok(out.with_marks(self.marks.iter().cloned()))
    }

    /// Element of a list or tuple.
    pub fn index(&self, i: usize) -> Result<Value, CtyError> {
        let v = self.concrete();
        let elem_ty = match &v.ty {
            Type::List(e) => e.as_ref().clone(),
            Type::Tuple(elems) => elems.get(i).cloned().ok_or_else(|| out_of_range(i, elems.len()))?,
            other => {
                return Err(step_error(
                    &PathStep::Index(i),
                    format!("Cannot index into {}", other),
                ))
            }
        };
        let out = match &v.state {
            ValueState::Null => {
                return Err(CtyError::new(
                    ErrorKind::ListValidation,
                    "Cannot index into a null value",
                ))
            }
            ValueState::Unknown(_) => Value::unknown(elem_ty),
            ValueState::Known(_) => {
                let items = v.elements().unwrap_or_default();
                items.get(i).cloned().ok_or_else(|| out_of_range(i, items.len()))?
            }
        };
        Ok(out.with_marks(self.marks.iter().cloned()))
    }

    /// Element of a map. An absent key yields a null of the element type.
    pub fn get_key(&self, key: &str) -> Result<Value, CtyError> {
        let v = self.concrete();
        let elem_ty = match &v.ty {
            Type::Map(e) => e.as_ref().clone(),
            other => {
                return Err(step_error(
                    &PathStep::Key(key.to_string()),
                    format!("Cannot look up key '{}' in {}", key, other),
                ))
            }
        };
        let out = match &v.state {
            ValueState::Null => Value::null(elem_ty),
            ValueState::Unknown(_) => Value::unknown(elem_ty),
            ValueState::Known(_) => v
                .entries()
                .and_then(|entries| entries.get(&nfc(key)))
                .cloned()
                .unwrap_or_else(|| Value::null(elem_ty)),
        };
        Ok(out.with_marks(self.marks.iter().cloned()))
    }
}

fn out_of_range(i: usize, len: usize) -> CtyError {
    CtyError::new(
        ErrorKind::ListValidation,
        format!("Index {} out of range for length {}", i, len),
    )
}

// ──────────────────────────────────────────────
// Functional updates
// ──────────────────────────────────────────────

impl Value {
    /// A new map with `key` set to `value`, validated against the element
    /// type.
    pub fn with_key(&self, key: &str, value: impl Into<Raw>) -> Result<Value, CtyError> {
        let (elem_ty, entries) = self.known_map("with_key")?;
        let key = nfc(key);
        let value = elem_ty
            .validate(value)
            .map_err(|e| e.at(PathStep::Key(key.clone())))?;
        let mut entries = entries.as_ref().clone();
        entries.insert(key, value);
        Ok(self.rebuild(Payload::Map(Arc::new(entries))))
    }

    pub fn without_key(&self, key: &str) -> Result<Value, CtyError> {
        let (_, entries) = self.known_map("without_key")?;
        let mut entries = entries.as_ref().clone();
        entries.remove(&nfc(key));
        Ok(self.rebuild(Payload::Map(Arc::new(entries))))
    }

    pub fn append(&self, value: impl Into<Raw>) -> Result<Value, CtyError> {
        let (elem_ty, items) = self.known_list("append")?;
        let mut items = items.as_ref().clone();
        let value = validate_list_element(elem_ty, value.into(), items.len())?;
        items.push(value);
        Ok(self.rebuild(Payload::List(Arc::new(items))))
    }

    pub fn with_element_at(&self, index: usize, value: impl Into<Raw>) -> Result<Value, CtyError> {
        let (elem_ty, items) = self.known_list("with_element_at")?;
        if index >= items.len() {
            return Err(out_of_range(index, items.len()));
        }
        let value = validate_list_element(elem_ty, value.into(), index)?;
        let mut items = items.as_ref().clone();
        items[index] = value;
        Ok(self.rebuild(Payload::List(Arc::new(items))))
    }

    fn known_map(&self, op: &str) -> Result<(&Type, &Arc<std::collections::BTreeMap<String, Value>>), CtyError> {
        match (&self.ty, &self.state) {
            (Type::Map(e), ValueState::Known(Payload::Map(entries))) => Ok((e, entries)),
            _ => Err(CtyError::new(
                ErrorKind::MapValidation,
                format!("{} requires a known map, got {}", op, self.describe()),
            )),
        }
    }

    fn known_list(&self, op: &str) -> Result<(&Type, &Arc<Vec<Value>>), CtyError> {
        match (&self.ty, &self.state) {
            (Type::List(e), ValueState::Known(Payload::List(items))) => Ok((e, items)),
            _ => Err(CtyError::new(
                ErrorKind::ListValidation,
                format!("{} requires a known list, got {}", op, self.describe()),
            )),
        }
    }

    fn rebuild(&self, payload: Payload) -> Value {
        Value {
            ty: self.ty.clone(),
            state: ValueState::Known(payload),
            marks: self.marks.clone(),
        }
    }

    fn describe(&self) -> String {
        match self.state {
            ValueState::Null => format!("null {}", self.ty),
            ValueState::Unknown(_) => format!("unknown {}", self.ty),
            ValueState::Known(_) => self.ty.to_string(),
        }
    }
}

fn validate_list_element(elem_ty: &Type, raw: Raw, index: usize) -> Result<Value, CtyError> {
    if matches!(raw, Raw::Null) && !elem_ty.is_dynamic() {
        return Err(CtyError::new(
            ErrorKind::ListValidation,
            format!("List elements cannot be null for element type {}", elem_ty),
        )
        .at(PathStep::Index(index)));
    }
    elem_ty
        .validate(raw)
        .map_err(|e| e.at(PathStep::Index(index)))
}

// ──────────────────────────────────────────────
// Native conversion
// ──────────────────────────────────────────────

impl Value {
    /// Convert to native JSON. This is the only place numbers leave the
    /// exact decimal representation.
    pub fn to_json(&self) -> Result<serde_json::Value, CtyError> {
        let payload = match &self.state {
            ValueState::Null => return Ok(serde_json::Value::Null),
            ValueState::Unknown(_) => {
                return Err(CtyError::conversion(
                    "Unknown values cannot be converted to native data",
                ))
            }
            ValueState::Known(p) => p,
        };
        Ok(match payload {
            Payload::Bool(b) => serde_json::Value::Bool(*b),
            Payload::Number(n) => {
                if n.is_integer() {
                    if let Some(i) = n.to_i64() {
                        return Ok(serde_json::Value::from(i));
                    }
                    if let Some(u) = n.to_u64() {
                        return Ok(serde_json::Value::from(u));
                    }
                }
                n.to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| {
                        CtyError::conversion(format!(
                            "Number {} has no native form",
                            number_to_string(n)
                        ))
                    })?
            }
            Payload::String(s) => serde_json::Value::String(s.clone()),
            Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => {
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v.to_json().map_err(|e| e.at(PathStep::Index(i))))
                    .collect::<Result<Vec<_>, _>>()?;
                serde_json::Value::Array(items)
            }
            Payload::Map(entries) | Payload::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries.iter() {
                    map.insert(
                        k.clone(),
                        v.to_json().map_err(|e| e.at(PathStep::Key(k.clone())))?,
                    );
                }
                serde_json::Value::Object(map)
            }
            Payload::Dynamic(inner) => inner.to_json()?,
            Payload::Capsule(_) => {
                return Err(CtyError::conversion(format!(
                    "{} values have no JSON form",
                    self.ty
                )))
            }
        })
    }
}
