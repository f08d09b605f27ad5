//! Type inference over raw input, and type unification.
//!
//! All caching is owned by an [`InferenceScope`]. A scope lives for one
//! top-level call (or is handed down explicitly to nested calls), so two
//! concurrent calls never share cache state.

use std::collections::{HashMap, HashSet};

use crate::config::CtyConfig;
use crate::raw::Raw;
use crate::text::nfc;
use crate::types::{ObjectType, Type};

type ShapeId = usize;

/// Structural key of an inferred subtree, with children referred to by
/// their interned ids. The container kind is part of the key, so a list
/// and a dict with look-alike contents never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ShapeKey {
    Leaf(Type),
    Cycle,
    List(Vec<ShapeId>),
    Set(Vec<ShapeId>),
    Tuple(Vec<ShapeId>),
    Object(Vec<(String, ShapeId)>),
    Map(Vec<ShapeId>),
}

#[derive(Debug, Default)]
struct InferenceCache {
    shapes: HashMap<ShapeKey, ShapeId>,
    types: Vec<Type>,
    unified: HashMap<Vec<Type>, Type>,
}

#[derive(Debug, Clone)]
struct Inferred {
    shape: Option<ShapeId>,
    ty: Type,
}

#[derive(Debug)]
pub struct InferenceScope {
    cache: Option<InferenceCache>,
}

impl Default for InferenceScope {
    fn default() -> Self {
        InferenceScope::new()
    }
}

enum Frame {
    Enter(Raw),
    Exit(Raw),
}

impl InferenceScope {
    /// A scope whose caching follows the current configuration.
    pub fn new() -> Self {
        InferenceScope::with_cache(CtyConfig::current().enable_type_inference_cache)
    }

    pub fn with_cache(enabled: bool) -> Self {
        InferenceScope {
            cache: enabled.then(InferenceCache::default),
        }
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Number of cached shapes; zero when caching is off.
    pub fn cached_shapes(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.types.len())
    }

    /// Run `f` in a nested scope that shares this scope's cache.
    pub fn nested<R>(&mut self, f: impl FnOnce(&mut InferenceScope) -> R) -> R {
        f(self)
    }

    /// Infer the type of `raw`.
    ///
    /// The traversal uses an explicit stack, so input depth is bounded by
    /// memory only. A container met again while it is still being
    /// inferred (a reference cycle) contributes `Dynamic`.
    pub fn infer(&mut self, raw: &Raw) -> Type {
        if raw.identity().is_none() {
            return leaf_type(raw);
        }

        let mut done: HashMap<usize, Inferred> = HashMap::new();
        let mut active: HashSet<usize> = HashSet::new();
        let mut stack = vec![Frame::Enter(raw.clone())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(node) => {
                    let Some(id) = node.identity() else { continue };
                    if done.contains_key(&id) || !active.insert(id) {
                        continue;
                    }
                    let children = child_nodes(&node);
                    stack.push(Frame::Exit(node));
                    for child in children.into_iter().rev() {
                        if child.identity().is_some() {
                            stack.push(Frame::Enter(child));
                        }
                    }
                }
                Frame::Exit(node) => {
                    let Some(id) = node.identity() else { continue };
                    let result = self.infer_container(&node, &done);
                    active.remove(&id);
                    done.insert(id, result);
                }
            }
        }

        raw.identity()
            .and_then(|id| done.remove(&id))
            .map_or(Type::Dynamic, |inferred| inferred.ty)
    }

    fn infer_container(&mut self, node: &Raw, done: &HashMap<usize, Inferred>) -> Inferred {
        match node {
            Raw::List(seq) | Raw::Set(seq) => {
                let children = self.resolve_all(seq.items().iter(), done);
                let key = self.is_caching().then(|| {
                    let ids = distinct(children.iter().filter_map(|c| c.shape));
                    match node {
                        Raw::List(_) => ShapeKey::List(ids),
                        _ => ShapeKey::Set(ids),
                    }
                });
                if let Some(hit) = self.lookup(key.as_ref(), node) {
                    return hit;
                }
                let types: Vec<Type> = children.into_iter().map(|c| c.ty).collect();
                let element = self.unify(&types);
                let ty = match node {
                    Raw::List(_) => Type::list(element),
                    _ => Type::set(element),
                };
                self.store(key, ty)
            }
            Raw::Tuple(seq) => {
                let children = self.resolve_all(seq.items().iter(), done);
                let key = self
                    .is_caching()
                    .then(|| ShapeKey::Tuple(children.iter().filter_map(|c| c.shape).collect()));
                if let Some(hit) = self.lookup(key.as_ref(), node) {
                    return hit;
                }
                let ty = Type::Tuple(children.into_iter().map(|c| c.ty).collect());
                self.store(key, ty)
            }
            Raw::Dict(dict) => {
                let entries = dict.entries();
                let names: Option<Vec<String>> = entries
                    .iter()
                    .map(|(k, _)| match k {
                        Raw::String(name) => Some(nfc(name)),
                        _ => None,
                    })
                    .collect();
                let children = self.resolve_all(entries.iter().map(|(_, v)| v), done);
                match names {
                    Some(names) => {
                        let key = self.is_caching().then(|| {
                            let mut attrs: Vec<(String, ShapeId)> = names
                                .iter()
                                .cloned()
                                .zip(children.iter().filter_map(|c| c.shape))
                                .collect();
                            attrs.sort();
                            ShapeKey::Object(attrs)
                        });
                        if let Some(hit) = self.lookup(key.as_ref(), node) {
                            return hit;
                        }
                        let ty = Type::Object(ObjectType::new(
                            names.iter().zip(children).map(|(name, c)| (name.as_str(), c.ty)),
                        ));
                        self.store(key, ty)
                    }
                    None => {
                        let key = self.is_caching().then(|| {
                            ShapeKey::Map(distinct(children.iter().filter_map(|c| c.shape)))
                        });
                        if let Some(hit) = self.lookup(key.as_ref(), node) {
                            return hit;
                        }
                        let types: Vec<Type> = children.into_iter().map(|c| c.ty).collect();
                        let element = self.unify(&types);
                        self.store(key, Type::map(element))
                    }
                }
            }
            other => self.resolve(other, done),
        }
    }

    fn resolve(&mut self, raw: &Raw, done: &HashMap<usize, Inferred>) -> Inferred {
        match raw.identity() {
            Some(id) => match done.get(&id) {
                Some(inferred) => inferred.clone(),
                None => self.store(Some(ShapeKey::Cycle), Type::Dynamic),
            },
            None => {
                let ty = leaf_type(raw);
                let key = self.is_caching().then(|| ShapeKey::Leaf(ty.clone()));
                self.store(key, ty)
            }
        }
    }

    fn resolve_all<'a>(
        &mut self,
        children: impl Iterator<Item = &'a Raw>,
        done: &HashMap<usize, Inferred>,
    ) -> Vec<Inferred> {
        children.map(|c| self.resolve(c, done)).collect()
    }

    fn lookup(&self, key: Option<&ShapeKey>, node: &Raw) -> Option<Inferred> {
        let cache = self.cache.as_ref()?;
        let id = *cache.shapes.get(key?)?;
        tracing::trace!(kind = node.kind_name(), shape = id, "inference cache hit");
        Some(Inferred {
            shape: Some(id),
            ty: cache.types[id].clone(),
        })
    }

    fn store(&mut self, key: Option<ShapeKey>, ty: Type) -> Inferred {
        let shape = match (self.cache.as_mut(), key) {
            (Some(cache), Some(key)) => Some(match cache.shapes.get(&key) {
                Some(&id) => id,
                None => {
                    let id = cache.types.len();
                    cache.types.push(ty.clone());
                    cache.shapes.insert(key, id);
                    id
                }
            }),
            _ => None,
        };
        Inferred { shape, ty }
    }

    /// The single type shared by every entry of `types`, otherwise
    /// `Dynamic`. An empty input unifies to `Dynamic`.
    pub fn unify(&mut self, types: &[Type]) -> Type {
        let distinct_types = distinct(types.iter().cloned());
        if let Some(ty) = self.cache.as_ref().and_then(|c| c.unified.get(&distinct_types)) {
            return ty.clone();
        }
        let ty = match distinct_types.as_slice() {
            [single] => single.clone(),
            _ => Type::Dynamic,
        };
        if let Some(cache) = self.cache.as_mut() {
            cache.unified.insert(distinct_types, ty.clone());
        }
        ty
    }
}

/// Infer the type of `raw` in a fresh scope.
pub fn infer_type(raw: &Raw) -> Type {
    InferenceScope::new().infer(raw)
}

/// Unify `types` in a fresh scope.
pub fn unify(types: &[Type]) -> Type {
    InferenceScope::new().unify(types)
}

fn leaf_type(raw: &Raw) -> Type {
    match raw {
        Raw::Bool(_) => Type::Bool,
        Raw::Int(_) | Raw::Float(_) | Raw::Number(_) => Type::Number,
        Raw::String(_) | Raw::Bytes(_) => Type::String,
        Raw::Value(v) => v.ty().clone(),
        Raw::Null | Raw::Unknown | Raw::Capsule(_) => Type::Dynamic,
        Raw::List(_) | Raw::Tuple(_) | Raw::Set(_) | Raw::Dict(_) => Type::Dynamic,
    }
}

fn child_nodes(raw: &Raw) -> Vec<Raw> {
    match raw {
        Raw::List(seq) | Raw::Tuple(seq) | Raw::Set(seq) => seq.items(),
        Raw::Dict(dict) => dict.entries().into_iter().map(|(_, v)| v).collect(),
        _ => Vec::new(),
    }
}

/// First occurrences, in order.
fn distinct<T: Clone + Eq + std::hash::Hash>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}
