//! Precision normalizer.
//!
//! Rounding happens on the shortest decimal representation that round-trips
//! the `f64` (what `Display` prints), not on the binary value. `4.455` is
//! stored as `4.45499999...` in binary, but rounds to `4.46` here because the
//! user wrote `4.455`.
//!
//! Ties resolve away from zero for negative numbers too: `-4.455` rounds to
//! `-4.46`.

use crate::model::Rounding;
use serde_json::{Number, Value};

/// Normalize a value to `scale` fractional digits.
///
/// Only floating point numbers are touched. Integers, strings, booleans,
/// arrays, objects and null pass through unchanged.
pub fn normalize(value: &Value, scale: u32, rounding: Rounding) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|x| normalize_f64(x, scale, rounding))
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

/// Apply `rounding` to `x` at `scale` fractional digits.
///
/// NaN and infinities are returned unchanged.
pub fn normalize_f64(x: f64, scale: u32, rounding: Rounding) -> f64 {
    if !x.is_finite() {
        return x;
    }

    let negative = x.is_sign_negative();
    let repr = x.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let scale = scale as usize;
    if frac_part.len() <= scale {
        return x;
    }

    let (kept, dropped) = frac_part.split_at(scale);
    let any_dropped = dropped.bytes().any(|b| b != b'0');
    let bump_magnitude = match rounding {
        Rounding::Trunc => false,
        Rounding::Round => dropped.as_bytes()[0] >= b'5',
        Rounding::Floor => negative && any_dropped,
        Rounding::Ceil => !negative && any_dropped,
    };

    let mut digits: Vec<u8> = int_part.bytes().chain(kept.bytes()).collect();
    if bump_magnitude {
        increment(&mut digits);
    }

    let split = digits.len() - scale;
    let mut text = String::with_capacity(digits.len() + 2);
    if negative {
        text.push('-');
    }
    text.push_str(std::str::from_utf8(&digits[..split]).unwrap_or("0"));
    if scale > 0 {
        text.push('.');
        text.push_str(std::str::from_utf8(&digits[split..]).unwrap_or("0"));
    }

    match text.parse::<f64>() {
        // Avoid handing back -0.0 for values that truncate to zero.
        Ok(result) if result == 0.0 => 0.0,
        Ok(result) => result,
        Err(_) => x,
    }
}

/// Add one unit in the last place of an ASCII digit string.
fn increment(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}
