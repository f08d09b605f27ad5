//! The closed catalog of CTY types.
//!
//! Types are immutable and compare structurally. [`Type::usable_as`] is the
//! one-way subtyping relation used by conversion and path navigation.

mod capsule;
mod object;
mod wire;

pub use capsule::{CapsuleBuilder, CapsuleOps, CapsuleType, HostValue};
pub use object::ObjectType;
pub use wire::parse_type_spec;

use std::fmt;

use crate::error::CtyError;
use crate::raw::Raw;
use crate::validate::Validator;
use crate::values::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Number,
    String,
    List(Box<Type>),
    Map(Box<Type>),
    Set(Box<Type>),
    Tuple(Vec<Type>),
    Object(ObjectType),
    /// Wildcard; the concrete type travels with the value.
    Dynamic,
    Capsule(CapsuleType),
}

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn map(element: Type) -> Type {
        Type::Map(Box::new(element))
    }

    pub fn set(element: Type) -> Type {
        Type::Set(Box::new(element))
    }

    pub fn tuple(elements: Vec<Type>) -> Type {
        Type::Tuple(elements)
    }

    pub fn object<I, K>(attributes: I) -> Type
    where
        I: IntoIterator<Item = (K, Type)>,
        K: AsRef<str>,
    {
        Type::Object(ObjectType::new(attributes))
    }

    /// Object type with optional attributes. Fails if an optional name is
    /// not among the attributes.
    pub fn object_with_optional<I, K, O, N>(attributes: I, optional: O) -> Result<Type, CtyError>
    where
        I: IntoIterator<Item = (K, Type)>,
        K: AsRef<str>,
        O: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        Ok(Type::Object(ObjectType::new(attributes).with_optional(optional)?))
    }

    /// Validate raw input against this type with a fresh [`Validator`].
    pub fn validate(&self, raw: impl Into<Raw>) -> Result<Value, CtyError> {
        Validator::new().validate(self, &raw.into())
    }

    pub fn equal(&self, other: &Type) -> bool {
        self == other
    }

    pub fn usable_as(&self, other: &Type) -> bool {
        match (self, other) {
            (_, Type::Dynamic) => true,
            (Type::List(a), Type::List(b))
            | (Type::Map(a), Type::Map(b))
            | (Type::Set(a), Type::Set(b)) => a.usable_as(b),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.usable_as(y))
            }
            (Type::Object(a), Type::Object(b)) => a.usable_as(b),
            _ => self == other,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Bool | Type::Number | Type::String)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Type::List(_) | Type::Map(_) | Type::Set(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    /// Element type of a list, map or set.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::List(e) | Type::Map(e) | Type::Set(e) => Some(e),
            _ => None,
        }
    }

    /// Values of this type may be placed in a set.
    pub fn is_hashable(&self) -> bool {
        match self {
            Type::List(_) | Type::Map(_) | Type::Set(_) | Type::Object(_) => false,
            Type::Tuple(elems) => elems.iter().all(Type::is_hashable),
            _ => true,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Bool => "bool",
            Type::Number => "number",
            Type::String => "string",
            Type::List(_) => "list",
            Type::Map(_) => "map",
            Type::Set(_) => "set",
            Type::Tuple(_) => "tuple",
            Type::Object(_) => "object",
            Type::Dynamic => "dynamic",
            Type::Capsule(_) => "capsule",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool | Type::Number | Type::String | Type::Dynamic => {
                write!(f, "{}", self.kind_name())
            }
            Type::List(e) => write!(f, "list({})", e),
            Type::Map(e) => write!(f, "map({})", e),
            Type::Set(e) => write!(f, "set({})", e),
            Type::Tuple(elems) => {
                write!(f, "tuple([")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "])")
            }
            Type::Object(obj) => {
                write!(f, "object({{")?;
                for (i, (name, ty)) in obj.attributes().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if obj.is_optional(name) {
                        write!(f, "{}=optional({})", name, ty)?;
                    } else {
                        write!(f, "{}={}", name, ty)?;
                    }
                }
                write!(f, "}})")
            }
            Type::Capsule(c) => write!(f, "capsule({})", c.name()),
        }
    }
}
