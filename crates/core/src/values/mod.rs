//! Typed CTY values.
//!
//! A [`Value`] is a type plus one of three states: known (with a payload),
//! null, or unknown (optionally refined). Every value carries a set of
//! marks. Values are immutable; container payloads sit behind `Arc` so the
//! update helpers in `ops` share untouched children.

mod marks;
mod ops;
mod refinement;

pub use marks::{Mark, Marks};
pub use refinement::{NumberBound, Refinement};

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::error::{CtyError, ErrorKind};
use crate::path::PathStep;
use crate::text::{nfc, number_to_string};
use crate::types::{CapsuleType, HostValue, ObjectType, Type};

#[derive(Debug, Clone)]
pub enum Payload {
    Bool(bool),
    Number(BigDecimal),
    String(String),
    List(Arc<Vec<Value>>),
    Set(Arc<Vec<Value>>),
    Tuple(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
    Object(Arc<BTreeMap<String, Value>>),
    /// A concrete value sitting in a dynamic slot.
    Dynamic(Box<Value>),
    Capsule(HostValue),
}

#[derive(Debug, Clone)]
pub enum ValueState {
    Known(Payload),
    Null,
    Unknown(Option<Refinement>),
}

#[derive(Debug, Clone)]
pub struct Value {
    ty: Type,
    state: ValueState,
    marks: Marks,
}

// ──────────────────────────────────────────────
// Construction
// ──────────────────────────────────────────────

impl Value {
    pub(crate) fn known(ty: Type, payload: Payload) -> Value {
        Value {
            ty,
            state: ValueState::Known(payload),
            marks: Marks::new(),
        }
    }

    pub fn bool(b: bool) -> Value {
        Value::known(Type::Bool, Payload::Bool(b))
    }

    pub fn number(n: impl Into<BigDecimal>) -> Value {
        Value::known(Type::Number, Payload::Number(n.into()))
    }

    /// A string value, normalized to NFC.
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::known(Type::String, Payload::String(nfc(s.as_ref())))
    }

    pub fn null(ty: Type) -> Value {
        Value {
            ty,
            state: ValueState::Null,
            marks: Marks::new(),
        }
    }

    pub fn unknown(ty: Type) -> Value {
        Value {
            ty,
            state: ValueState::Unknown(None),
            marks: Marks::new(),
        }
    }

    /// An unknown carrying `refinement`; an empty refinement gives a plain
    /// unknown.
    pub fn unknown_refined(ty: Type, refinement: Refinement) -> Value {
        let refinement = if refinement.is_empty() {
            None
        } else {
            Some(refinement)
        };
        Value {
            ty,
            state: ValueState::Unknown(refinement),
            marks: Marks::new(),
        }
    }

    /// Place a value in a dynamic slot. Null and unknown values become
    /// null or unknown of type dynamic; the wrapped value's marks move to
    /// the wrapper in that case.
    pub fn dynamic(inner: Value) -> Value {
        if inner.ty.is_dynamic() {
            return inner;
        }
        if let ValueState::Known(_) = inner.state {
            return Value::known(Type::Dynamic, Payload::Dynamic(Box::new(inner)));
        }
        Value {
            ty: Type::Dynamic,
            state: inner.state,
            marks: inner.marks,
        }
    }

    pub fn list(element: Type, items: Vec<Value>) -> Result<Value, CtyError> {
        let items = coerce_all(&element, items)?;
        Ok(Value::known(Type::list(element), Payload::List(Arc::new(items))))
    }

    /// A set value. Duplicates are dropped and elements are kept in
    /// canonical order.
    pub fn set(element: Type, items: Vec<Value>) -> Result<Value, CtyError> {
        let items = coerce_all(&element, items)?;
        for (i, item) in items.iter().enumerate() {
            ensure_hashable(item).map_err(|e| e.at(PathStep::Index(i)))?;
        }
        Ok(Value::known(
            Type::set(element),
            Payload::Set(Arc::new(canonical_set(items))),
        ))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        let ty = Type::Tuple(items.iter().map(|v| v.ty.clone()).collect());
        Value::known(ty, Payload::Tuple(Arc::new(items)))
    }

    pub fn map<K: AsRef<str>>(
        element: Type,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Value, CtyError> {
        let mut out = BTreeMap::new();
        for (k, v) in entries {
            let key = nfc(k.as_ref());
            let v = coerce_element(&element, v).map_err(|e| e.at(PathStep::Key(key.clone())))?;
            out.insert(key, v);
        }
        Ok(Value::known(Type::map(element), Payload::Map(Arc::new(out))))
    }

    /// An object whose type is taken from its attribute values.
    pub fn object<K: AsRef<str>>(attributes: impl IntoIterator<Item = (K, Value)>) -> Value {
        let attrs: BTreeMap<String, Value> = attributes
            .into_iter()
            .map(|(k, v)| (nfc(k.as_ref()), v))
            .collect();
        let ty = ObjectType::new(attrs.iter().map(|(k, v)| (k.as_str(), v.ty.clone())));
        Value::known(Type::Object(ty), Payload::Object(Arc::new(attrs)))
    }

    /// An object of a declared type. Absent optional attributes become
    /// typed nulls.
    pub fn object_typed<K: AsRef<str>>(
        ty: ObjectType,
        attributes: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Value, CtyError> {
        let mut given: BTreeMap<String, Value> = attributes
            .into_iter()
            .map(|(k, v)| (nfc(k.as_ref()), v))
            .collect();
        let mut out = BTreeMap::new();
        for (name, attr_ty) in ty.attributes() {
            let v = match given.remove(name) {
                Some(v) => coerce_element(attr_ty, v)
                    .map_err(|e| e.at(PathStep::Attr(name.clone())))?,
                None if ty.is_optional(name) => Value::null(attr_ty.clone()),
                None => return Err(missing_attribute(name)),
            };
            out.insert(name.clone(), v);
        }
        if !given.is_empty() {
            return Err(unknown_attributes(given.keys()));
        }
        Ok(Value::known(Type::Object(ty), Payload::Object(Arc::new(out))))
    }

    pub fn capsule(ty: &CapsuleType, host: HostValue) -> Result<Value, CtyError> {
        if !ty.accepts(&host) {
            return Err(CtyError::new(
                ErrorKind::CapsuleValidation,
                format!("Value is not an instance of {}", ty.host_type_name()),
            ));
        }
        Ok(Value::known(Type::Capsule(ty.clone()), Payload::Capsule(host)))
    }
}

fn coerce_element(element: &Type, item: Value) -> Result<Value, CtyError> {
    if &item.ty == element {
        Ok(item)
    } else if element.is_dynamic() {
        Ok(Value::dynamic(item))
    } else {
        Err(CtyError::type_mismatch(element, &item.ty))
    }
}

fn coerce_all(element: &Type, items: Vec<Value>) -> Result<Vec<Value>, CtyError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| coerce_element(element, v).map_err(|e| e.at(PathStep::Index(i))))
        .collect()
}

pub(crate) fn ensure_hashable(item: &Value) -> Result<(), CtyError> {
    let ty = item.concrete().ty();
    if ty.is_hashable() {
        Ok(())
    } else {
        Err(CtyError::new(
            ErrorKind::SetValidation,
            format!("Set elements must be hashable, got {}", ty),
        ))
    }
}

pub(crate) fn missing_attribute(name: &str) -> CtyError {
    CtyError::new(
        ErrorKind::AttributeValidation,
        format!("Missing required attribute: {}", name),
    )
}

pub(crate) fn unknown_attributes<'a>(names: impl Iterator<Item = &'a String>) -> CtyError {
    let names: Vec<&str> = names.map(String::as_str).collect();
    CtyError::new(
        ErrorKind::AttributeValidation,
        format!("Unknown attributes: {}", names.join(", ")),
    )
}

/// Deduplicate and sort set elements.
pub(crate) fn canonical_set(items: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut out: Vec<Value> = items.into_iter().filter(|v| seen.insert(v.clone())).collect();
    out.sort_by(canonical_cmp);
    out
}

/// Ordering of set elements: known before unknown before null. Known
/// payloads order by kind (bool, number, string, then containers) and then
/// by value, containers element by element. Remaining ties fall back to the
/// type and finally the hash.
pub(crate) fn canonical_cmp(a: &Value, b: &Value) -> Ordering {
    let (a, b) = (a.concrete(), b.concrete());
    state_rank(a)
        .cmp(&state_rank(b))
        .then_with(|| match (a.payload(), b.payload()) {
            (Some(x), Some(y)) => payload_cmp(x, y),
            _ => Ordering::Equal,
        })
        .then_with(|| {
            if a.ty == b.ty {
                Ordering::Equal
            } else {
                a.ty.to_string().cmp(&b.ty.to_string())
            }
        })
        .then_with(|| hash_of(a).cmp(&hash_of(b)))
}

fn state_rank(v: &Value) -> u8 {
    match v.state {
        ValueState::Known(_) => 0,
        ValueState::Unknown(_) => 1,
        ValueState::Null => 2,
    }
}

fn kind_rank(p: &Payload) -> u8 {
    match p {
        Payload::Bool(_) => 0,
        Payload::Number(_) => 1,
        Payload::String(_) => 2,
        Payload::List(_) => 3,
        Payload::Set(_) => 4,
        Payload::Tuple(_) => 5,
        Payload::Map(_) => 6,
        Payload::Object(_) => 7,
        Payload::Dynamic(_) => 8,
        Payload::Capsule(_) => 9,
    }
}

fn payload_cmp(a: &Payload, b: &Payload) -> Ordering {
    match (a, b) {
        (Payload::Bool(x), Payload::Bool(y)) => x.cmp(y),
        (Payload::Number(x), Payload::Number(y)) => x.cmp(y),
        (Payload::String(x), Payload::String(y)) => x.cmp(y),
        (Payload::List(x), Payload::List(y))
        | (Payload::Set(x), Payload::Set(y))
        | (Payload::Tuple(x), Payload::Tuple(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(v, w)| canonical_cmp(v, w))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Payload::Map(x), Payload::Map(y)) | (Payload::Object(x), Payload::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((k, v), (l, w))| k.cmp(l).then_with(|| canonical_cmp(v, w)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Payload::Dynamic(x), Payload::Dynamic(y)) => canonical_cmp(x, y),
        (Payload::Capsule(_), Payload::Capsule(_)) => Ordering::Equal,
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn hash_of(v: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    v.hash(&mut hasher);
    hasher.finish()
}

// ──────────────────────────────────────────────
// Inspection
// ──────────────────────────────────────────────

impl Value {
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn state(&self) -> &ValueState {
        &self.state
    }

    pub fn is_null(&self) -> bool {
        matches!(self.state, ValueState::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.state, ValueState::Unknown(_))
    }

    /// Known or null.
    pub fn is_known(&self) -> bool {
        !self.is_unknown()
    }

    /// Known all the way down.
    pub fn is_wholly_known(&self) -> bool {
        match &self.state {
            ValueState::Unknown(_) => false,
            ValueState::Null => true,
            ValueState::Known(p) => match p {
                Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => {
                    items.iter().all(Value::is_wholly_known)
                }
                Payload::Map(entries) | Payload::Object(entries) => {
                    entries.values().all(Value::is_wholly_known)
                }
                Payload::Dynamic(inner) => inner.is_wholly_known(),
                _ => true,
            },
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.state {
            ValueState::Known(p) => Some(p),
            _ => None,
        }
    }

    pub fn refinement(&self) -> Option<&Refinement> {
        match &self.state {
            ValueState::Unknown(r) => r.as_ref(),
            _ => None,
        }
    }

    /// The value with any dynamic wrapping removed.
    pub fn concrete(&self) -> &Value {
        match &self.state {
            ValueState::Known(Payload::Dynamic(inner)) => inner.concrete(),
            _ => self,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.concrete().payload() {
            Some(Payload::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&BigDecimal> {
        match self.concrete().payload() {
            Some(Payload::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.concrete().payload() {
            Some(Payload::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Elements of a known list, set or tuple.
    pub fn elements(&self) -> Option<&[Value]> {
        match self.concrete().payload() {
            Some(Payload::List(items) | Payload::Set(items) | Payload::Tuple(items)) => {
                Some(items.as_slice())
            }
            _ => None,
        }
    }

    /// Entries of a known map or object.
    pub fn entries(&self) -> Option<&BTreeMap<String, Value>> {
        match self.concrete().payload() {
            Some(Payload::Map(entries) | Payload::Object(entries)) => Some(entries),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostValue> {
        match self.concrete().payload() {
            Some(Payload::Capsule(h)) => Some(h),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.as_bool() == Some(true)
    }

    pub fn is_false(&self) -> bool {
        self.as_bool() == Some(false)
    }
}

// ──────────────────────────────────────────────
// Marks
// ──────────────────────────────────────────────

impl Value {
    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    pub fn mark(mut self, mark: impl Into<Mark>) -> Value {
        self.marks.insert(mark.into());
        self
    }

    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Value {
        self.marks.extend(marks);
        self
    }

    /// Split off this value's own marks. Nested marks stay in place.
    pub fn unmark(mut self) -> (Value, Marks) {
        let marks = std::mem::take(&mut self.marks);
        (self, marks)
    }

    /// Remove marks at every level.
    pub fn unmark_deep(&self) -> Value {
        let state = match &self.state {
            ValueState::Known(p) => ValueState::Known(match p {
                Payload::List(items) => Payload::List(Arc::new(unmark_all(items))),
                Payload::Set(items) => Payload::Set(Arc::new(unmark_all(items))),
                Payload::Tuple(items) => Payload::Tuple(Arc::new(unmark_all(items))),
                Payload::Map(entries) => Payload::Map(Arc::new(unmark_entries(entries))),
                Payload::Object(entries) => Payload::Object(Arc::new(unmark_entries(entries))),
                Payload::Dynamic(inner) => Payload::Dynamic(Box::new(inner.unmark_deep())),
                other => other.clone(),
            }),
            other => other.clone(),
        };
        Value {
            ty: self.ty.clone(),
            state,
            marks: Marks::new(),
        }
    }

    /// Equality that also compares marks at every level.
    pub fn raw_equals(&self, other: &Value) -> bool {
        if self != other || self.marks != other.marks {
            return false;
        }
        match (self.payload(), other.payload()) {
            (
                Some(Payload::List(a) | Payload::Set(a) | Payload::Tuple(a)),
                Some(Payload::List(b) | Payload::Set(b) | Payload::Tuple(b)),
            ) => a.iter().zip(b.iter()).all(|(x, y)| x.raw_equals(y)),
            (
                Some(Payload::Map(a) | Payload::Object(a)),
                Some(Payload::Map(b) | Payload::Object(b)),
            ) => a.values().zip(b.values()).all(|(x, y)| x.raw_equals(y)),
            (Some(Payload::Dynamic(a)), Some(Payload::Dynamic(b))) => a.raw_equals(b),
            _ => true,
        }
    }
}

fn unmark_all(items: &[Value]) -> Vec<Value> {
    items.iter().map(Value::unmark_deep).collect()
}

fn unmark_entries(entries: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), v.unmark_deep()))
        .collect()
}

// ──────────────────────────────────────────────
// Equality and hashing (marks ignored)
// ──────────────────────────────────────────────

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.ty != other.ty {
            return false;
        }
        match (&self.state, &other.state) {
            (ValueState::Null, ValueState::Null) => true,
            (ValueState::Unknown(a), ValueState::Unknown(b)) => a == b,
            (ValueState::Known(a), ValueState::Known(b)) => payload_eq(&self.ty, a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

fn payload_eq(ty: &Type, a: &Payload, b: &Payload) -> bool {
    match (a, b) {
        (Payload::Bool(x), Payload::Bool(y)) => x == y,
        (Payload::Number(x), Payload::Number(y)) => x == y,
        (Payload::String(x), Payload::String(y)) => x == y,
        (Payload::List(x), Payload::List(y))
        | (Payload::Set(x), Payload::Set(y))
        | (Payload::Tuple(x), Payload::Tuple(y)) => x == y,
        (Payload::Map(x), Payload::Map(y)) | (Payload::Object(x), Payload::Object(y)) => x == y,
        (Payload::Dynamic(x), Payload::Dynamic(y)) => x == y,
        (Payload::Capsule(x), Payload::Capsule(y)) => match ty {
            Type::Capsule(c) => c.values_equal(x, y),
            _ => false,
        },
        _ => false,
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        match &self.state {
            ValueState::Null => 0u8.hash(state),
            ValueState::Unknown(r) => {
                1u8.hash(state);
                r.hash(state);
            }
            ValueState::Known(p) => {
                2u8.hash(state);
                match p {
                    Payload::Bool(b) => b.hash(state),
                    Payload::Number(n) => n.normalized().hash(state),
                    Payload::String(s) => s.hash(state),
                    Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => {
                        items.hash(state)
                    }
                    Payload::Map(entries) | Payload::Object(entries) => entries.hash(state),
                    Payload::Dynamic(inner) => inner.hash(state),
                    Payload::Capsule(host) => {
                        if let Type::Capsule(c) = &self.ty {
                            c.hash_value(host).hash(state);
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.state {
            ValueState::Null => return write!(f, "null"),
            ValueState::Unknown(_) => return write!(f, "(unknown {})", self.ty),
            ValueState::Known(p) => p,
        };
        match payload {
            Payload::Bool(b) => write!(f, "{}", b),
            Payload::Number(n) => f.write_str(&number_to_string(n)),
            Payload::String(s) => write!(f, "{:?}", s),
            Payload::List(items) | Payload::Set(items) | Payload::Tuple(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Payload::Map(entries) | Payload::Object(entries) => {
                let quote = matches!(payload, Payload::Map(_));
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if quote {
                        write!(f, "{:?} = {}", k, v)?;
                    } else {
                        write!(f, "{} = {}", k, v)?;
                    }
                }
                write!(f, "}}")
            }
            Payload::Dynamic(inner) => write!(f, "{}", inner),
            Payload::Capsule(_) => write!(f, "{}", self.ty),
        }
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
    fn equality_ignores_marks() {
        let plain = Value::string("secret");
        let marked = Value::string("secret").mark("sensitive");
        assert_eq!(plain, marked);
        assert!(!plain.raw_equals(&marked));
        assert!(marked.has_mark(&Mark::new("sensitive")));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(Value::number(dec("1.50")), Value::number(dec("1.5")));
        let mut a = DefaultHasher::new();
        let mut b = DefaultHasher::new();
        Value::number(dec("1.50")).hash(&mut a);
        Value::number(dec("1.5")).hash(&mut b);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn null_unknown_known_are_distinct() {
        let known = Value::number(1);
        let null = Value::null(Type::Number);
        let unknown = Value::unknown(Type::Number);
        assert_ne!(known, null);
        assert_ne!(null, unknown);
        assert!(null.is_known());
        assert!(!unknown.is_known());
        assert_ne!(Value::null(Type::Number), Value::null(Type::String));
    }

    #[test]
    fn empty_refinement_is_plain_unknown() {
        let v = Value::unknown_refined(Type::Number, Refinement::new());
        assert!(v.is_unknown());
        assert!(v.refinement().is_none());
    }

    #[test]
    fn set_dedups_and_sorts() {
        let set = Value::set(
            Type::Number,
            vec![Value::number(3), Value::number(1), Value::number(3), Value::number(2)],
        )
        .unwrap();
        let items: Vec<String> = set.elements().unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(items, vec!["1", "2", "3"]);
    }

    #[test]
    fn mixed_dynamic_set_orders_by_kind_then_value() {
        let items = vec![
            Value::tuple(vec![Value::string("b")]),
            Value::string("a"),
            Value::number(2),
            Value::bool(true),
            Value::tuple(vec![Value::number(1), Value::bool(false)]),
            Value::number(dec("1.5")),
            Value::bool(false),
            Value::string("a"),
        ];
        let set = Value::set(Type::Dynamic, items.clone()).unwrap();
        let rendered: Vec<String> =
            set.elements().unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["false", "true", "1.5", "2", r#""a""#, "[1, false]", r#"["b"]"#]
        );

        let mut reversed = items;
        reversed.reverse();
        let again = Value::set(Type::Dynamic, reversed).unwrap();
        assert_eq!(set, again);
        assert_eq!(set.elements(), again.elements());
    }

    #[test]
    fn canonical_order_is_total() {
        let values = [
            Value::bool(true),
            Value::number(7),
            Value::string("7"),
            Value::tuple(vec![]),
            Value::tuple(vec![Value::number(7)]),
            Value::unknown(Type::Number),
            Value::null(Type::String),
        ];
        for a in &values {
            assert_eq!(canonical_cmp(a, a), Ordering::Equal);
            for b in &values {
                assert_eq!(canonical_cmp(a, b), canonical_cmp(b, a).reverse());
                for c in &values {
                    if canonical_cmp(a, b).is_le() && canonical_cmp(b, c).is_le() {
                        assert!(canonical_cmp(a, c).is_le(), "{} {} {}", a, b, c);
                    }
                }
            }
        }
    }

    #[test]
    fn wide_numbers_are_exact() {
        let two_128 = dec("340282366920938463463374607431768211456");
        let v = Value::number(two_128.clone());
        assert_eq!(v.to_string(), "340282366920938463463374607431768211456");
        assert_ne!(v, Value::number(two_128 + BigDecimal::from(1)));
    }

    #[test]
    fn set_rejects_unhashable_elements() {
        let inner = Value::list(Type::Number, vec![Value::number(1)]).unwrap();
        let err = Value::set(Type::list(Type::Number), vec![inner]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SetValidation);
    }

    #[test]
    fn list_constructor_checks_element_type() {
        let err = Value::list(Type::Number, vec![Value::number(1), Value::string("x")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.path().to_string(), "[1]");

        let dynamic = Value::list(Type::Dynamic, vec![Value::number(1), Value::string("x")]).unwrap();
        assert_eq!(dynamic.elements().unwrap()[1].concrete(), &Value::string("x"));
    }

    #[test]
    fn typed_object_fills_optional_nulls() {
        let ty = ObjectType::new([("name", Type::String), ("age", Type::Number)])
            .with_optional(["age"])
            .unwrap();
        let obj = Value::object_typed(ty.clone(), [("name", Value::string("Alice"))]).unwrap();
        let age = &obj.entries().unwrap()["age"];
        assert!(age.is_null());
        assert_eq!(age.ty(), &Type::Number);

        let err = Value::object_typed(ty.clone(), [("age", Value::number(3))]).unwrap_err();
        assert_eq!(err.message(), "Missing required attribute: name");

        let err = Value::object_typed(
            ty,
            [("name", Value::string("A")), ("extra", Value::bool(true))],
        )
        .unwrap_err();
        assert_eq!(err.message(), "Unknown attributes: extra");
    }

    #[test]
    fn dynamic_wrapping() {
        let wrapped = Value::dynamic(Value::string("x"));
        assert_eq!(wrapped.ty(), &Type::Dynamic);
        assert_eq!(wrapped.as_str(), Some("x"));
        assert_eq!(Value::dynamic(wrapped.clone()), wrapped);

        let null = Value::dynamic(Value::null(Type::String).mark("m"));
        assert!(null.is_null());
        assert_eq!(null.ty(), &Type::Dynamic);
        assert!(null.marks().contains_name("m"));
    }

    #[test]
    fn unmark_deep_strips_nested_marks() {
        let list = Value::list(
            Type::String,
            vec![Value::string("a").mark("sensitive"), Value::string("b")],
        )
        .unwrap()
        .mark("outer");
        let clean = list.unmark_deep();
        assert!(clean.marks().is_empty());
        assert!(clean.elements().unwrap()[0].marks().is_empty());
        assert_eq!(clean, list);

        let (shallow, marks) = list.clone().unmark();
        assert!(marks.contains_name("outer"));
        assert!(shallow.elements().unwrap()[0].marks().contains_name("sensitive"));
    }

    #[test]
    fn strings_are_normalized() {
        assert_eq!(Value::string("e\u{0301}"), Value::string("\u{00e9}"));
    }

    #[test]
    fn display_forms() {
        let obj = Value::object([
            ("name", Value::string("x")),
            ("n", Value::number(dec("1.50"))),
        ]);
        assert_eq!(obj.to_string(), r#"{n = 1.5, name = "x"}"#);
        assert_eq!(Value::null(Type::Bool).to_string(), "null");
    }
}
