//! cty-core: the CTY type system and value model.
//!
//! Types, values with marks and refined unknowns, validation of raw host
//! data into typed values, type inference, and explicit conversion.
//!
//! # Public API
//!
//! - [`Type`] -- the closed type catalog, with wire JSON type specs
//! - [`Value`] -- known, null or unknown values of a type
//! - [`Raw`] -- untyped host data accepted by [`Type::validate`]
//! - [`Validator`] -- a validation call with its own depth and cycle state
//! - [`InferenceScope`] -- type inference with an optional per-scope cache
//! - [`convert()`] -- explicit conversion between types
//! - [`CtyError`] -- every failure, with a kind and a path

pub mod config;
pub mod convert;
pub mod error;
pub mod infer;
pub mod path;
pub mod raw;
pub mod text;
pub mod types;
pub mod validate;
pub mod values;

// ── Convenience re-exports: key types ────────────────────────────────

pub use config::CtyConfig;
pub use error::{CtyError, ErrorKind};
pub use infer::InferenceScope;
pub use path::{Path, PathStep};
pub use raw::{Raw, RawDict, RawSeq};
pub use types::{CapsuleBuilder, CapsuleOps, CapsuleType, HostValue, ObjectType, Type};
pub use validate::Validator;
pub use values::{Mark, Marks, NumberBound, Payload, Refinement, Value, ValueState};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use convert::convert;
pub use infer::{infer_type, unify};
pub use text::{float_to_number, nfc, number_to_string, parse_number};
pub use types::parse_type_spec;
