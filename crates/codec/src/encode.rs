use rmp::encode as mp;

use cty_core::{CtyError, Payload, PathStep, Refinement, Type, Value, ValueState};

use crate::{number, refinement, EXT_REFINED_UNKNOWN, EXT_UNKNOWN};

/// Encode `value` as msgpack against the schema type `ty`.
///
/// Marks are not representable on the wire and are dropped.
pub fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, CtyError> {
    let mut buf = Vec::new();
    write_value(&mut buf, value, ty)?;
    tracing::trace!(ty = %ty, bytes = buf.len(), "encoded value");
    Ok(buf)
}

fn write_value(buf: &mut Vec<u8>, value: &Value, ty: &Type) -> Result<(), CtyError> {
    match value.state() {
        ValueState::Null => return mp::write_nil(buf).map_err(write_error),
        ValueState::Unknown(refined) => return write_unknown(buf, refined.as_ref()),
        ValueState::Known(_) => {}
    }

    if ty.is_dynamic() {
        return write_dynamic(buf, value.concrete());
    }

    let value = value.concrete();
    if value.ty() != ty {
        return Err(CtyError::serialization(format!(
            "Cannot encode a value of type {} as {}",
            value.ty(),
            ty
        )));
    }
    let Some(payload) = value.payload() else {
        return Err(CtyError::serialization(format!(
            "Value of type {} has no payload",
            ty
        )));
    };

    match (payload, ty) {
        (Payload::Bool(b), _) => mp::write_bool(buf, *b).map_err(write_error),
        (Payload::Number(n), _) => write_wire(buf, &number::to_wire(n)),
        (Payload::String(s), _) => mp::write_str(buf, s).map_err(write_error),
        (Payload::List(items) | Payload::Set(items), _) => {
            let element = ty.element_type().unwrap_or(&Type::Dynamic);
            write_array_len(buf, items.len())?;
            for (i, item) in items.iter().enumerate() {
                write_value(buf, item, element).map_err(|e| e.at(PathStep::Index(i)))?;
            }
            Ok(())
        }
        (Payload::Tuple(items), Type::Tuple(elements)) => {
            write_array_len(buf, items.len())?;
            for (i, (item, element)) in items.iter().zip(elements).enumerate() {
                write_value(buf, item, element).map_err(|e| e.at(PathStep::Index(i)))?;
            }
            Ok(())
        }
        (Payload::Map(entries), _) => {
            let element = ty.element_type().unwrap_or(&Type::Dynamic);
            write_map_len(buf, entries.len())?;
            for (key, item) in entries.iter() {
                mp::write_str(buf, key).map_err(write_error)?;
                write_value(buf, item, element).map_err(|e| e.at(PathStep::Key(key.clone())))?;
            }
            Ok(())
        }
        (Payload::Object(attrs), Type::Object(obj)) => {
            write_map_len(buf, obj.attributes().len())?;
            for (name, attr_ty) in obj.attributes() {
                mp::write_str(buf, name).map_err(write_error)?;
                match attrs.get(name) {
                    Some(item) => write_value(buf, item, attr_ty)
                        .map_err(|e| e.at(PathStep::Attr(name.clone())))?,
                    None => mp::write_nil(buf).map_err(write_error)?,
                }
            }
            Ok(())
        }
        (Payload::Capsule(_), _) => Err(CtyError::serialization(format!(
            "Capsule values of type {} cannot be serialized",
            ty
        ))),
        _ => Err(CtyError::serialization(format!(
            "Cannot encode a value of type {}",
            ty
        ))),
    }
}

/// `[type-spec-json, value]`, with the type spec as a bin of UTF-8 JSON.
fn write_dynamic(buf: &mut Vec<u8>, concrete: &Value) -> Result<(), CtyError> {
    let ty = concrete.ty().clone();
    let spec = ty.to_wire_bytes()?;
    write_array_len(buf, 2)?;
    mp::write_bin(buf, &spec).map_err(write_error)?;
    write_value(buf, concrete, &ty)
}

fn write_unknown(buf: &mut Vec<u8>, refined: Option<&Refinement>) -> Result<(), CtyError> {
    match refined.filter(|r| !r.is_empty()) {
        Some(r) => {
            let payload = refinement::encode(r)?;
            mp::write_ext_meta(buf, wire_len(payload.len())?, EXT_REFINED_UNKNOWN)
                .map_err(write_error)?;
            buf.extend_from_slice(&payload);
            Ok(())
        }
        None => mp::write_ext_meta(buf, 0, EXT_UNKNOWN)
            .map(|_| ())
            .map_err(write_error),
    }
}

fn write_wire(buf: &mut Vec<u8>, wire: &rmpv::Value) -> Result<(), CtyError> {
    rmpv::encode::write_value(buf, wire).map_err(write_error)
}

fn write_array_len(buf: &mut Vec<u8>, len: usize) -> Result<(), CtyError> {
    mp::write_array_len(buf, wire_len(len)?)
        .map(|_| ())
        .map_err(write_error)
}

fn write_map_len(buf: &mut Vec<u8>, len: usize) -> Result<(), CtyError> {
    mp::write_map_len(buf, wire_len(len)?)
        .map(|_| ())
        .map_err(write_error)
}

fn wire_len(len: usize) -> Result<u32, CtyError> {
    u32::try_from(len)
        .map_err(|_| CtyError::serialization(format!("Length {} exceeds the msgpack limit", len)))
}

fn write_error(e: impl std::fmt::Display) -> CtyError {
    CtyError::serialization(format!("msgpack write failed: {}", e))
}
