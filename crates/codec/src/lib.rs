//! cty-codec: MessagePack encoding of CTY values, byte-compatible with
//! go-cty.
//!
//! - [`encode()`] -- value and schema type to msgpack bytes
//! - [`decode()`] -- msgpack bytes and schema type to a value
//!
//! Unknown values use extension types: code 0 with an empty payload for a
//! plain unknown, code 12 carrying a map of refinements for a refined one.
//! Values in dynamic slots travel as `[type-spec-json, value]`.

mod decode;
mod encode;
mod number;
mod refinement;

pub use decode::decode;
pub use encode::encode;

/// Extension code of an unrefined unknown value.
pub const EXT_UNKNOWN: i8 = 0;
/// Extension code of a refined unknown value.
pub const EXT_REFINED_UNKNOWN: i8 = 12;
