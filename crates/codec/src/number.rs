//! Number layout on the wire.
//!
//! Integers that fit in 64 bits travel as msgpack integers, values whose
//! binary float64 form is exact travel as float64, and everything else as
//! the decimal string. Decoding accepts all of those plus UTF-8 bytes.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, ToPrimitive};
use rmpv::Value as Wire;

use cty_core::{float_to_number, number_to_string, parse_number, CtyError};

/// Floats whose exact expansion has this many fractional digits or more
/// decode to their shortest round-trip text instead.
const MAX_EXACT_SCALE: i64 = 28;

pub(crate) fn to_wire(n: &BigDecimal) -> Wire {
    if n.is_integer() {
        if let Some(i) = n.to_i64() {
            return Wire::from(i);
        }
    }
    if let Some(f) = n.to_f64() {
        if exact_float(f).as_ref() == Some(n) {
            return Wire::F64(f);
        }
    }
    Wire::from(number_to_string(n))
}

pub(crate) fn from_wire(wire: &Wire) -> Result<BigDecimal, CtyError> {
    match wire {
        Wire::Integer(i) => {
            if let Some(n) = i.as_i64() {
                Ok(BigDecimal::from(n))
            } else if let Some(n) = i.as_u64() {
                Ok(BigDecimal::from(n))
            } else {
                Err(not_a_number(wire))
            }
        }
        Wire::F64(f) => from_float(*f).ok_or_else(|| not_a_number(wire)),
        Wire::F32(f) => from_float(f64::from(*f)).ok_or_else(|| not_a_number(wire)),
        Wire::String(s) => s
            .as_str()
            .and_then(parse_number)
            .ok_or_else(|| not_a_number(wire)),
        Wire::Binary(b) => std::str::from_utf8(b)
            .ok()
            .and_then(parse_number)
            .ok_or_else(|| not_a_number(wire)),
        _ => Err(not_a_number(wire)),
    }
}

/// The exact value of the float when its expansion is short, otherwise its
/// shortest round-trip text.
fn from_float(f: f64) -> Option<BigDecimal> {
    match exact_float(f) {
        Some(exact) if exact.as_bigint_and_exponent().1 < MAX_EXACT_SCALE => Some(exact),
        _ => float_to_number(f),
    }
}

/// The binary value of a finite float written out in decimal.
/// `m * 2^-k` equals `m * 5^k * 10^-k`, so no digits are lost.
fn exact_float(f: f64) -> Option<BigDecimal> {
    if !f.is_finite() {
        return None;
    }
    let bits = f.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    let mut digits = BigInt::from(mantissa);
    let scale = if exponent >= 0 {
        digits = digits << exponent as usize;
        0
    } else {
        digits *= BigInt::from(5u8).pow(exponent.unsigned_abs() as u32);
        -exponent
    };
    if bits >> 63 == 1 {
        digits = -digits;
    }
    Some(BigDecimal::new(digits, scale).normalized())
}

fn not_a_number(wire: &Wire) -> CtyError {
    CtyError::deserialization(format!("Cannot decode {} as a number", wire))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn integers_stay_integers() {
        assert_eq!(to_wire(&dec("42")), Wire::from(42));
        assert_eq!(to_wire(&dec("-7.000")), Wire::from(-7));
    }

    #[test]
    fn exact_floats_use_float64() {
        assert_eq!(to_wire(&dec("100.5")), Wire::F64(100.5));
        assert_eq!(to_wire(&dec("0.375")), Wire::F64(0.375));
    }

    #[test]
    fn inexact_values_use_text() {
        assert_eq!(to_wire(&dec("0.1")), Wire::from("0.1"));
        assert_eq!(
            to_wire(&dec("1234567890123456789.123456789")),
            Wire::from("1234567890123456789.123456789")
        );
    }

    #[test]
    fn decodes_every_number_form() {
        assert_eq!(from_wire(&Wire::from(10)).unwrap(), dec("10"));
        assert_eq!(from_wire(&Wire::from(u64::MAX)).unwrap(), BigDecimal::from(u64::MAX));
        assert_eq!(from_wire(&Wire::F64(100.5)).unwrap(), dec("100.5"));
        assert_eq!(from_wire(&Wire::F64(0.1)).unwrap(), dec("0.1"));
        assert_eq!(from_wire(&Wire::from("1e3")).unwrap(), dec("1000"));
        assert_eq!(
            from_wire(&Wire::Binary(b"123.456789".to_vec())).unwrap(),
            dec("123.456789")
        );
    }

    #[test]
    fn wide_integers_use_text() {
        let two_100 = "1267650600228229401496703205376";
        let two_128 = "340282366920938463463374607431768211456";
        assert_eq!(to_wire(&dec(two_100)), Wire::from(two_100));
        assert_eq!(to_wire(&dec(two_128)), Wire::from(two_128));
        assert_eq!(from_wire(&Wire::from(two_128)).unwrap(), dec(two_128));
        assert_eq!(
            from_wire(&Wire::Binary(two_100.as_bytes().to_vec())).unwrap(),
            dec(two_100)
        );
    }

    #[test]
    fn float_expansions_are_exact() {
        assert_eq!(exact_float(0.375), Some(dec("0.375")));
        assert_eq!(exact_float(-2.0), Some(dec("-2")));
        assert_eq!(exact_float(1e20), Some(dec("100000000000000000000")));
        assert_eq!(
            exact_float(0.1),
            Some(dec("0.1000000000000000055511151231257827021181583404541015625"))
        );
        assert_eq!(exact_float(f64::NAN), None);
    }

    #[test]
    fn rejects_non_numbers() {
        assert!(from_wire(&Wire::from("ten")).is_err());
        assert!(from_wire(&Wire::Boolean(true)).is_err());
        assert!(from_wire(&Wire::Binary(vec![0xff])).is_err());
    }
}
