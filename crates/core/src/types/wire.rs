//! Wire JSON type specifications.
//!
//! `"string"`, `["list","number"]`, `["object",{"name":"string"}]`,
//! `["object",{...},["optional-name"]]`, `["tuple",[...]]`.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use crate::error::CtyError;
use crate::types::{ObjectType, Type};

/// Parse a wire JSON type specification from UTF-8 JSON bytes.
pub fn parse_type_spec(bytes: &[u8]) -> Result<Type, CtyError> {
    let spec: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
        CtyError::type_parse(format!("Type specification is not valid JSON: {}", e))
    })?;
    Type::from_wire_json(&spec)
}

impl Type {
    pub fn to_wire_json(&self) -> Result<serde_json::Value, CtyError> {
        Ok(match self {
            Type::Bool | Type::Number | Type::String | Type::Dynamic => json!(self.kind_name()),
            Type::List(e) | Type::Map(e) | Type::Set(e) => {
                json!([self.kind_name(), e.to_wire_json()?])
            }
            Type::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(Type::to_wire_json)
                    .collect::<Result<Vec<_>, _>>()?;
                json!(["tuple", elems])
            }
            Type::Object(obj) => {
                let mut attrs = serde_json::Map::new();
                for (name, ty) in obj.attributes() {
                    attrs.insert(name.clone(), ty.to_wire_json()?);
                }
                if obj.optional_attributes().is_empty() {
                    json!(["object", attrs])
                } else {
                    let optional: Vec<&String> = obj.optional_attributes().iter().collect();
                    json!(["object", attrs, optional])
                }
            }
            Type::Capsule(c) => {
                return Err(CtyError::serialization(format!(
                    "capsule type {} has no wire representation",
                    c.name()
                )))
            }
        })
    }

    /// Compact UTF-8 JSON bytes, as used in dynamic payload headers.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, CtyError> {
        serde_json::to_vec(&self.to_wire_json()?)
            .map_err(|e| CtyError::serialization(e.to_string()))
    }

    pub fn from_wire_json(spec: &serde_json::Value) -> Result<Type, CtyError> {
        if let Some(name) = spec.as_str() {
            return match name {
                "bool" => Ok(Type::Bool),
                "number" => Ok(Type::Number),
                "string" => Ok(Type::String),
                "dynamic" => Ok(Type::Dynamic),
                other => Err(CtyError::type_parse(format!(
                    "Unknown primitive type name: '{}'",
                    other
                ))),
            };
        }

        let invalid = || CtyError::type_parse(format!("Invalid type specification: {}", spec));
        let parts = spec.as_array().ok_or_else(invalid)?;
        let kind = parts.first().and_then(|k| k.as_str()).ok_or_else(invalid)?;

        match (kind, parts.len()) {
            ("list", 2) => Ok(Type::list(Type::from_wire_json(&parts[1])?)),
            ("map", 2) => Ok(Type::map(Type::from_wire_json(&parts[1])?)),
            ("set", 2) => Ok(Type::set(Type::from_wire_json(&parts[1])?)),
            ("tuple", 2) => {
                let elems = parts[1].as_array().ok_or_else(invalid)?;
                let elems = elems
                    .iter()
                    .map(Type::from_wire_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Tuple(elems))
            }
            ("object", 2) | ("object", 3) => {
                let attrs = parts[1].as_object().ok_or_else(invalid)?;
                let mut parsed = Vec::with_capacity(attrs.len());
                for (name, ty) in attrs {
                    parsed.push((name.as_str(), Type::from_wire_json(ty)?));
                }
                let obj = ObjectType::new(parsed);
                let obj = match parts.get(2) {
                    None => obj,
                    Some(optional) => {
                        let names = optional
                            .as_array()
                            .ok_or_else(invalid)?
                            .iter()
                            .map(|n| n.as_str().ok_or_else(invalid))
                            .collect::<Result<Vec<_>, _>>()?;
                        obj.with_optional(names)
                            .map_err(|e| CtyError::type_parse(e.message().to_string()))?
                    }
                };
                Ok(Type::Object(obj))
            }
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = serde_json::Value::deserialize(deserializer)?;
        Type::from_wire_json(&spec).map_err(D::Error::custom)
    }
}
