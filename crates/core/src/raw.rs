//! Untyped native input.
//!
//! [`Raw`] is what the validation and inference engines consume. Container
//! nodes are shared and interior-mutable so that callers can build graphs
//! where one node appears twice, or contains itself. A node's identity is
//! its allocation address.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use bigdecimal::BigDecimal;

use crate::types::HostValue;
use crate::values::Value;

#[derive(Debug, Clone)]
pub enum Raw {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Number(BigDecimal),
    String(String),
    Bytes(Vec<u8>),
    List(RawSeq),
    Tuple(RawSeq),
    Set(RawSeq),
    Dict(RawDict),
    /// Already-typed value.
    Value(Value),
    /// Unknown of whatever type it is validated against.
    Unknown,
    /// Opaque host object.
    Capsule(HostValue),
}

impl Raw {
    pub fn list(items: impl IntoIterator<Item = Raw>) -> Raw {
        Raw::List(RawSeq::new(items))
    }

    pub fn tuple(items: impl IntoIterator<Item = Raw>) -> Raw {
        Raw::Tuple(RawSeq::new(items))
    }

    pub fn set(items: impl IntoIterator<Item = Raw>) -> Raw {
        Raw::Set(RawSeq::new(items))
    }

    pub fn dict<K: Into<Raw>>(entries: impl IntoIterator<Item = (K, Raw)>) -> Raw {
        Raw::Dict(RawDict::new(entries.into_iter().map(|(k, v)| (k.into(), v))))
    }

    /// Identity of a container node, used for cycle detection.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Raw::List(s) | Raw::Tuple(s) | Raw::Set(s) => Some(s.id()),
            Raw::Dict(d) => Some(d.id()),
            _ => None,
        }
    }

    /// Short name of the input kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Raw::Null => "null",
            Raw::Bool(_) => "bool",
            Raw::Int(_) => "int",
            Raw::Float(_) => "float",
            Raw::Number(_) => "decimal",
            Raw::String(_) => "str",
            Raw::Bytes(_) => "bytes",
            Raw::List(_) => "list",
            Raw::Tuple(_) => "tuple",
            Raw::Set(_) => "set",
            Raw::Dict(_) => "dict",
            Raw::Value(_) => "value",
            Raw::Unknown => "unknown",
            Raw::Capsule(_) => "object",
        }
    }
}

/// Shared sequence node.
#[derive(Clone, Default)]
pub struct RawSeq(Arc<RwLock<Vec<Raw>>>);

impl RawSeq {
    pub fn new(items: impl IntoIterator<Item = Raw>) -> Self {
        RawSeq(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn push(&self, item: Raw) {
        self.0.write().push(item);
    }

    pub fn len(&self) -> usize {
        self.0.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shallow copy of the current items. Children are shared nodes, so
    /// this never copies a subtree.
    pub fn items(&self) -> Vec<Raw> {
        self.0.read_recursive().clone()
    }
}

/// Shared dictionary node. Keys are raw so that non-string keys can be
/// represented and reported.
#[derive(Clone, Default)]
pub struct RawDict(Arc<RwLock<Vec<(Raw, Raw)>>>);

impl RawDict {
    pub fn new(entries: impl IntoIterator<Item = (Raw, Raw)>) -> Self {
        RawDict(Arc::new(RwLock::new(entries.into_iter().collect())))
    }

    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Insert or replace the entry with an equal string key.
    pub fn insert(&self, key: impl Into<Raw>, value: Raw) {
        let key = key.into();
        let mut entries = self.0.write();
        if let Raw::String(k) = &key {
            if let Some(slot) = entries
                .iter_mut()
                .find(|(existing, _)| matches!(existing, Raw::String(e) if e == k))
            {
                slot.1 = value;
                return;
            }
        }
        entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.0.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<(Raw, Raw)> {
        self.0.read_recursive().clone()
    }
}

// Nodes may be cyclic, so Debug never descends.
impl fmt::Debug for RawSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSeq(#{:x}, {} items)", self.id(), self.len())
    }
}

impl fmt::Debug for RawDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawDict(#{:x}, {} entries)", self.id(), self.len())
    }
}

// ──────────────────────────────────────────────
// Conversions
// ──────────────────────────────────────────────

impl From<bool> for Raw {
    fn from(b: bool) -> Self {
        Raw::Bool(b)
    }
}

impl From<i32> for Raw {
    fn from(i: i32) -> Self {
        Raw::Int(i as i64)
    }
}

impl From<i64> for Raw {
    fn from(i: i64) -> Self {
        Raw::Int(i)
    }
}

impl From<u32> for Raw {
    fn from(i: u32) -> Self {
        Raw::Int(i as i64)
    }
}

impl From<u64> for Raw {
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(i) => Raw::Int(i),
            Err(_) => Raw::Number(BigDecimal::from(i)),
        }
    }
}

impl From<f64> for Raw {
    fn from(f: f64) -> Self {
        Raw::Float(f)
    }
}

impl From<BigDecimal> for Raw {
    fn from(d: BigDecimal) -> Self {
        Raw::Number(d)
    }
}

impl From<&str> for Raw {
    fn from(s: &str) -> Self {
        Raw::String(s.to_string())
    }
}

impl From<String> for Raw {
    fn from(s: String) -> Self {
        Raw::String(s)
    }
}

impl From<Vec<u8>> for Raw {
    fn from(b: Vec<u8>) -> Self {
        Raw::Bytes(b)
    }
}

impl From<Value> for Raw {
    fn from(v: Value) -> Self {
        Raw::Value(v)
    }
}

impl From<&Value> for Raw {
    fn from(v: &Value) -> Self {
        Raw::Value(v.clone())
    }
}

impl<T: Into<Raw>> From<Option<T>> for Raw {
    fn from(v: Option<T>) -> Self {
        v.map_or(Raw::Null, Into::into)
    }
}

impl From<Vec<Raw>> for Raw {
    fn from(items: Vec<Raw>) -> Self {
        Raw::list(items)
    }
}

impl From<Vec<Value>> for Raw {
    fn from(items: Vec<Value>) -> Self {
        Raw::list(items.into_iter().map(Raw::Value))
    }
}

/// JSON numbers are kept exact: integers stay integers and everything else
/// goes through the decimal parser on the number's source text.
impl From<serde_json::Value> for Raw {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Raw::Null,
            serde_json::Value::Bool(b) => Raw::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Raw::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Raw::Number(BigDecimal::from(u))
                } else {
                    BigDecimal::from_str(&n.to_string())
                        .map(Raw::Number)
                        .unwrap_or_else(|_| Raw::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Raw::String(s),
            serde_json::Value::Array(items) => Raw::list(items.into_iter().map(Raw::from)),
            serde_json::Value::Object(map) => Raw::Dict(RawDict::new(
                map.into_iter().map(|(k, v)| (Raw::String(k), Raw::from(v))),
            )),
        }
    }
}
