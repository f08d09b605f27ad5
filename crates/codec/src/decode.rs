use std::collections::BTreeMap;

use rmpv::Value as Wire;

use cty_core::{nfc, parse_type_spec, CtyError, ObjectType, PathStep, Type, Value};

use crate::{number, refinement, EXT_REFINED_UNKNOWN, EXT_UNKNOWN};

/// Decode msgpack bytes against the schema type `ty`.
///
/// Empty input is a null of `ty`. Otherwise the whole input must be
/// consumed; trailing bytes are an error.
pub fn decode(bytes: &[u8], ty: &Type) -> Result<Value, CtyError> {
    if bytes.is_empty() {
        return Ok(Value::null(ty.clone()));
    }
    let mut rd = bytes;
    let wire = rmpv::decode::read_value(&mut rd)
        .map_err(|e| CtyError::deserialization(format!("Invalid msgpack: {}", e)))?;
    if !rd.is_empty() {
        return Err(CtyError::deserialization(format!(
            "{} trailing bytes after the value",
            rd.len()
        )));
    }
    let value = read_value(&wire, ty)?;
    tracing::trace!(ty = %ty, bytes = bytes.len(), "decoded value");
    Ok(value)
}

fn read_value(wire: &Wire, ty: &Type) -> Result<Value, CtyError> {
    match wire {
        Wire::Nil => return Ok(Value::null(ty.clone())),
        Wire::Ext(code, payload) => return read_unknown(*code, payload, ty),
        _ => {}
    }

    match ty {
        Type::Dynamic => read_dynamic(wire),
        Type::Bool => match wire {
            Wire::Boolean(b) => Ok(Value::bool(*b)),
            other => Err(unexpected("a bool", other, ty)),
        },
        Type::Number => number::from_wire(wire).map(Value::number),
        Type::String => read_string(wire)
            .map(Value::string)
            .ok_or_else(|| unexpected("a string", wire, ty)),
        Type::List(element) => {
            let items = read_items(wire, ty, |_| element.as_ref())?;
            Value::list(element.as_ref().clone(), items)
        }
        Type::Set(element) => {
            let items = read_items(wire, ty, |_| element.as_ref())?;
            Value::set(element.as_ref().clone(), items)
        }
        Type::Tuple(elements) => {
            if let Wire::Array(items) = wire {
                if items.len() != elements.len() {
                    return Err(CtyError::deserialization(format!(
                        "Expected {} tuple elements, got {}",
                        elements.len(),
                        items.len()
                    )));
                }
            }
            let items = read_items(wire, ty, |i| &elements[i])?;
            Ok(Value::tuple(items))
        }
        Type::Map(element) => {
            let mut entries = BTreeMap::new();
            for (key, item) in read_entries(wire, ty)? {
                let value =
                    read_value(item, element).map_err(|e| e.at(PathStep::Key(key.clone())))?;
                entries.insert(key, value);
            }
            Value::map(element.as_ref().clone(), entries)
        }
        Type::Object(obj) => read_object(wire, ty, obj),
        Type::Capsule(capsule) => Err(CtyError::deserialization(format!(
            "Capsule type {} cannot be deserialized",
            capsule.name()
        ))),
    }
}

fn read_unknown(code: i8, payload: &[u8], ty: &Type) -> Result<Value, CtyError> {
    match code {
        EXT_REFINED_UNKNOWN => {
            let refined = refinement::decode(payload)?;
            Ok(Value::unknown_refined(ty.clone(), refined))
        }
        EXT_UNKNOWN => Ok(Value::unknown(ty.clone())),
        other => {
            tracing::debug!(code = other, ty = %ty, "unrecognised extension, decoding as unknown");
            Ok(Value::unknown(ty.clone()))
        }
    }
}

/// `[type-spec-json, value]`. A bad type spec or a value that does not fit
/// it fails; there is no fallback.
fn read_dynamic(wire: &Wire) -> Result<Value, CtyError> {
    let pair = match wire {
        Wire::Array(pair) if pair.len() == 2 => pair,
        other => {
            return Err(CtyError::deserialization(format!(
                "Dynamic value must be a [type, value] pair, got {}",
                other
            )))
        }
    };
    let spec = match &pair[0] {
        Wire::Binary(bytes) => bytes.as_slice(),
        Wire::String(s) => s.as_bytes(),
        other => {
            return Err(CtyError::deserialization(format!(
                "Dynamic type spec must be JSON bytes, got {}",
                other
            )))
        }
    };
    let ty = parse_type_spec(spec)?;
    let concrete = read_value(&pair[1], &ty)?;
    Ok(Value::dynamic(concrete))
}

fn read_string(wire: &Wire) -> Option<String> {
    match wire {
        Wire::String(s) => s.as_str().map(nfc),
        Wire::Binary(b) => std::str::from_utf8(b).ok().map(nfc),
        _ => None,
    }
}

fn read_items<'t>(
    wire: &Wire,
    ty: &Type,
    element_type: impl Fn(usize) -> &'t Type,
) -> Result<Vec<Value>, CtyError> {
    let Wire::Array(items) = wire else {
        return Err(unexpected("an array", wire, ty));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| read_value(item, element_type(i)).map_err(|e| e.at(PathStep::Index(i))))
        .collect()
}

fn read_entries<'w>(wire: &'w Wire, ty: &Type) -> Result<Vec<(String, &'w Wire)>, CtyError> {
    let Wire::Map(entries) = wire else {
        return Err(unexpected("a map", wire, ty));
    };
    entries
        .iter()
        .map(|(key, item)| {
            read_string(key)
                .map(|k| (k, item))
                .ok_or_else(|| CtyError::deserialization(format!("Map key {} is not a string", key)))
        })
        .collect()
}

/// go-cty omits null optional attributes; those come back as typed nulls.
fn read_object(wire: &Wire, ty: &Type, obj: &ObjectType) -> Result<Value, CtyError> {
    let mut attrs = BTreeMap::new();
    for (name, item) in read_entries(wire, ty)? {
        let attr_ty = obj.attribute_type(&name).ok_or_else(|| {
            CtyError::deserialization(format!("Unexpected attribute '{}' for {}", name, ty))
        })?;
        let value = read_value(item, attr_ty).map_err(|e| e.at(PathStep::Attr(name.clone())))?;
        attrs.insert(name, value);
    }
    Value::object_typed(obj.clone(), attrs)
}

fn unexpected(expected: &str, wire: &Wire, ty: &Type) -> CtyError {
    CtyError::deserialization(format!(
        "Expected {} for {}, got {}",
        expected, ty, wire
    ))
}
