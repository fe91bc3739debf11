//! Conversion of stream entry values to integer signals.
//!
//! Stream entries are JSON values written by arbitrary clients, so numbers
//! arrive as integers, floats, or strings. JSON numbers and integer text
//! are accepted; the rest is a [`PayloadError`].

use serde_json::Value;

use crate::error::PayloadError;

/// Longest rendering of a rejected payload kept in errors and logs.
const MAX_RAW_LEN: usize = 200;

/// Reads a stream entry value as an `i32` signal.
///
/// - integers in `i32` range as-is
/// - JSON floats rounded half-to-even (`2.5` -> `2`, `3.5` -> `4`)
/// - strings trimmed, then parsed as an integer with an optional sign;
///   float text such as `"2.5"` is rejected
/// - `true` / `false` as `1` / `0`
/// - `null` as `0`, which the controller ignores
///
/// # Errors
///
/// Returns [`PayloadError::Empty`] for a blank string,
/// [`PayloadError::OutOfRange`] for numbers outside `i32`, and
/// [`PayloadError::NotAnInteger`] for arrays, objects, and text that is not
/// an integer.
pub fn to_signal(value: &Value) -> Result<i32, PayloadError> {
    match value {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i32::from(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().map_or_else(|| Err(out_of_range(value)), |f| from_f64(f, value)),
            |i| i32::try_from(i).map_err(|_| out_of_range(value)),
        ),
        Value::String(s) => from_str(s, value),
        Value::Array(_) | Value::Object(_) => Err(not_an_integer(value)),
    }
}

fn from_str(s: &str, original: &Value) -> Result<i32, PayloadError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::Empty);
    }
    let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_an_integer(original));
    }
    // Digit strings too long for i64 are still integers, just out of range.
    trimmed
        .parse::<i64>()
        .ok()
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(|| out_of_range(original))
}

#[allow(clippy::cast_possible_truncation)]
fn from_f64(f: f64, original: &Value) -> Result<i32, PayloadError> {
    let rounded = f.round_ties_even();
    if rounded.is_finite() && rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX) {
        Ok(rounded as i32)
    } else {
        Err(out_of_range(original))
    }
}

fn out_of_range(value: &Value) -> PayloadError {
    PayloadError::OutOfRange { raw: render(value) }
}

fn not_an_integer(value: &Value) -> PayloadError {
    PayloadError::NotAnInteger { raw: render(value) }
}

/// Renders a value as compact JSON, truncated on a char boundary.
#[must_use]
pub fn render(value: &Value) -> String {
    let raw = value.to_string();
    if raw.len() <= MAX_RAW_LEN {
        return raw;
    }
    let mut end = MAX_RAW_LEN;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}
