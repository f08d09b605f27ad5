use std::str::FromStr;

use bigdecimal::num_bigint::Sign;
use bigdecimal::BigDecimal;
use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Normalize to Unicode NFC. Strings already in NFC are copied as is.
pub fn nfc(s: &str) -> String {
    if is_nfc(s) {
        s.to_string()
    } else {
        s.nfc().collect()
    }
}

/// Parse decimal or scientific notation, e.g. `123.45` or `-1.5e2`.
pub fn parse_number(s: &str) -> Option<BigDecimal> {
    let s = s.trim();
    let mantissa = s.split(['e', 'E']).next().unwrap_or_default();
    if !mantissa.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    BigDecimal::from_str(s).ok()
}

/// Exact decimal for a finite float, using its shortest round-trip text.
pub fn float_to_number(f: f64) -> Option<BigDecimal> {
    if !f.is_finite() {
        return None;
    }
    BigDecimal::from_str(&f.to_string()).ok()
}

/// Plain decimal text with no exponent and no trailing fractional zeros.
pub fn number_to_string(n: &BigDecimal) -> String {
    let (digits, scale) = n.normalized().into_bigint_and_exponent();
    let negative = digits.sign() == Sign::Minus;
    let magnitude = digits.magnitude().to_string();
    let mut out = String::with_capacity(magnitude.len() + 2);
    if negative {
        out.push('-');
    }
    if scale <= 0 {
        out.push_str(&magnitude);
        if magnitude != "0" {
            out.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
        }
        return out;
    }
    let scale = scale as usize;
    if magnitude.len() > scale {
        let (whole, frac) = magnitude.split_at(magnitude.len() - scale);
        out.push_str(whole);
        out.push('.');
        out.push_str(frac);
    } else {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(scale - magnitude.len()));
        out.push_str(&magnitude);
    }
    out
}
