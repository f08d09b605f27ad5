//! Capsule types: opaque named types wrapping host values.
//!
//! Custom operations are registered through [`CapsuleBuilder`] as closures
//! over the concrete host type, so an operation with the wrong number or
//! kind of arguments does not type-check.

use std::any::{Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::types::Type;
use crate::values::Value;

/// A host value held by a capsule.
pub type HostValue = Arc<dyn Any + Send + Sync>;

type EqualFn = dyn Fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool + Send + Sync;
type HashFn = dyn Fn(&(dyn Any + Send + Sync)) -> u64 + Send + Sync;
type ConvertFn = dyn Fn(&(dyn Any + Send + Sync), &Type) -> Option<Value> + Send + Sync;

/// Optional custom operations of a capsule type.
#[derive(Default)]
pub struct CapsuleOps {
    equal: Option<Box<EqualFn>>,
    hash: Option<Box<HashFn>>,
    convert: Option<Box<ConvertFn>>,
}

impl CapsuleOps {
    pub fn has_equal(&self) -> bool {
        self.equal.is_some()
    }

    pub fn has_hash(&self) -> bool {
        self.hash.is_some()
    }

    pub fn has_convert(&self) -> bool {
        self.convert.is_some()
    }
}

#[derive(Clone)]
pub struct CapsuleType {
    name: String,
    host: TypeId,
    host_name: &'static str,
    ops: Option<Arc<CapsuleOps>>,
}

impl CapsuleType {
    /// A capsule without custom operations. Host values compare by identity.
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        CapsuleType {
            name: name.into(),
            host: TypeId::of::<T>(),
            host_name: std::any::type_name::<T>(),
            ops: None,
        }
    }

    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> CapsuleBuilder<T> {
        CapsuleBuilder {
            name: name.into(),
            ops: CapsuleOps::default(),
            _host: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host_type_name(&self) -> &'static str {
        self.host_name
    }

    pub fn ops(&self) -> Option<&CapsuleOps> {
        self.ops.as_deref()
    }

    /// Whether `host` is an instance of this capsule's host type.
    pub fn accepts(&self, host: &HostValue) -> bool {
        (**host).type_id() == self.host
    }

    pub(crate) fn values_equal(&self, a: &HostValue, b: &HostValue) -> bool {
        match self.ops.as_ref().and_then(|ops| ops.equal.as_ref()) {
            Some(equal) => equal(a.as_ref(), b.as_ref()),
            None => same_allocation(a, b),
        }
    }

    pub(crate) fn hash_value(&self, host: &HostValue) -> u64 {
        match self.ops.as_ref().and_then(|ops| ops.hash.as_ref()) {
            Some(hash) => hash(host.as_ref()),
            None => {
                let mut hasher = DefaultHasher::new();
                (Arc::as_ptr(host) as *const () as usize).hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    pub(crate) fn convert_value(&self, host: &HostValue, target: &Type) -> Option<Value> {
        let convert = self.ops.as_ref()?.convert.as_ref()?;
        convert(host.as_ref(), target)
    }
}

fn same_allocation(a: &HostValue, b: &HostValue) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl PartialEq for CapsuleType {
    fn eq(&self, other: &Self) -> bool {
        let same_ops = match (&self.ops, &other.ops) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.name == other.name && self.host == other.host && same_ops
    }
}

impl Eq for CapsuleType {}

impl Hash for CapsuleType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.host.hash(state);
    }
}

impl fmt::Debug for CapsuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapsuleType")
            .field("name", &self.name)
            .field("host", &self.host_name)
            .field("has_ops", &self.ops.is_some())
            .finish()
    }
}

pub struct CapsuleBuilder<T> {
    name: String,
    ops: CapsuleOps,
    _host: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> CapsuleBuilder<T> {
    pub fn equal_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.ops.equal = Some(Box::new(
            move |a: &(dyn Any + Send + Sync), b: &(dyn Any + Send + Sync)| {
                match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => false,
                }
            },
        ));
        self
    }

    pub fn hash_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> u64 + Send + Sync + 'static,
    {
        self.ops.hash = Some(Box::new(move |a: &(dyn Any + Send + Sync)| {
            a.downcast_ref::<T>().map(&f).unwrap_or_default()
        }));
        self
    }

    pub fn convert_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &Type) -> Option<Value> + Send + Sync + 'static,
    {
        self.ops.convert = Some(Box::new(
            move |a: &(dyn Any + Send + Sync), target: &Type| {
                a.downcast_ref::<T>().and_then(|host| f(host, target))
            },
        ));
        self
    }

    pub fn build(self) -> CapsuleType {
        CapsuleType {
            name: self.name,
            host: TypeId::of::<T>(),
            host_name: std::any::type_name::<T>(),
            ops: Some(Arc::new(self.ops)),
        }
    }
}
