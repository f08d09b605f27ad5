//! The ext 12 payload carrying a refined unknown.
//!
//! The payload is itself a msgpack map keyed by small integers:
//!
//! | key | meaning                    | value              |
//! |-----|----------------------------|--------------------|
//! | 1   | is known null              | bool               |
//! | 2   | string prefix              | str                |
//! | 3   | number lower bound         | [number, inclusive]|
//! | 4   | number upper bound         | [number, inclusive]|
//! | 5   | collection length lower    | int                |
//! | 6   | collection length upper    | int                |
//!
//! Bound values are written as bin holding the decimal text. Decoding also
//! accepts any number form.

use rmpv::Value as Wire;

use cty_core::{number_to_string, CtyError, NumberBound, Refinement};

use crate::number;

const KEY_IS_NULL: u64 = 1;
const KEY_STRING_PREFIX: u64 = 2;
const KEY_NUMBER_LOWER: u64 = 3;
const KEY_NUMBER_UPPER: u64 = 4;
const KEY_LENGTH_LOWER: u64 = 5;
const KEY_LENGTH_UPPER: u64 = 6;

pub(crate) fn encode(refinement: &Refinement) -> Result<Vec<u8>, CtyError> {
    let mut entries = Vec::new();
    if let Some(is_null) = refinement.is_known_null {
        entries.push((Wire::from(KEY_IS_NULL), Wire::Boolean(is_null)));
    }
    if let Some(prefix) = &refinement.string_prefix {
        entries.push((Wire::from(KEY_STRING_PREFIX), Wire::from(prefix.as_str())));
    }
    if let Some(bound) = &refinement.number_lower_bound {
        entries.push((Wire::from(KEY_NUMBER_LOWER), bound_to_wire(bound)));
    }
    if let Some(bound) = &refinement.number_upper_bound {
        entries.push((Wire::from(KEY_NUMBER_UPPER), bound_to_wire(bound)));
    }
    if let Some(n) = refinement.collection_length_lower_bound {
        entries.push((Wire::from(KEY_LENGTH_LOWER), Wire::from(n)));
    }
    if let Some(n) = refinement.collection_length_upper_bound {
        entries.push((Wire::from(KEY_LENGTH_UPPER), Wire::from(n)));
    }

    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &Wire::Map(entries))
        .map_err(|e| CtyError::serialization(format!("Cannot write refinement: {}", e)))?;
    Ok(buf)
}

fn bound_to_wire(bound: &NumberBound) -> Wire {
    let text = number_to_string(&bound.value);
    Wire::Array(vec![Wire::Binary(text.into_bytes()), Wire::Boolean(bound.inclusive)])
}

pub(crate) fn decode(payload: &[u8]) -> Result<Refinement, CtyError> {
    let mut rd = payload;
    let wire = rmpv::decode::read_value(&mut rd)
        .map_err(|e| malformed(format!("payload is not msgpack: {}", e)))?;
    let Wire::Map(entries) = wire else {
        return Err(malformed(format!("expected a map, got {}", wire)));
    };

    let mut refinement = Refinement::new();
    for (key, value) in entries {
        let Some(key) = key.as_u64() else {
            return Err(malformed(format!("key {} is not a small integer", key)));
        };
        match key {
            KEY_IS_NULL => {
                let is_null = value
                    .as_bool()
                    .ok_or_else(|| malformed(format!("nullness must be a bool, got {}", value)))?;
                refinement.is_known_null = Some(is_null);
            }
            KEY_STRING_PREFIX => {
                let prefix = match &value {
                    Wire::String(s) => s.as_str().map(str::to_string),
                    Wire::Binary(b) => String::from_utf8(b.clone()).ok(),
                    _ => None,
                }
                .ok_or_else(|| malformed(format!("prefix must be a string, got {}", value)))?;
                refinement.string_prefix = Some(cty_core::nfc(&prefix));
            }
            KEY_NUMBER_LOWER => refinement.number_lower_bound = Some(bound_from_wire(&value)?),
            KEY_NUMBER_UPPER => refinement.number_upper_bound = Some(bound_from_wire(&value)?),
            KEY_LENGTH_LOWER => refinement.collection_length_lower_bound = Some(length(&value)?),
            KEY_LENGTH_UPPER => refinement.collection_length_upper_bound = Some(length(&value)?),
            other => tracing::debug!(key = other, "ignoring unrecognised refinement key"),
        }
    }
    Ok(refinement)
}

fn bound_from_wire(wire: &Wire) -> Result<NumberBound, CtyError> {
    match wire {
        Wire::Array(pair) if pair.len() == 2 => {
            let value = number::from_wire(&pair[0])?;
            let inclusive = pair[1]
                .as_bool()
                .ok_or_else(|| malformed(format!("bound inclusivity must be a bool, got {}", pair[1])))?;
            Ok(NumberBound::new(value, inclusive))
        }
        other => Err(malformed(format!(
            "number bound must be [value, inclusive], got {}",
            other
        ))),
    }
}

fn length(wire: &Wire) -> Result<u64, CtyError> {
    wire.as_u64()
        .ok_or_else(|| malformed(format!("length bound must be a non-negative integer, got {}", wire)))
}

fn malformed(detail: String) -> CtyError {
    CtyError::deserialization(format!("Malformed refined unknown: {}", detail))
}
