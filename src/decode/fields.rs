//! JSON field access with default fallback.
//!
//! The phone app is loose about types and optional fields, so decoders
//! read fields through these helpers: a missing or mistyped field gives
//! the documented default instead of failing the whole message.  Only a
//! payload that is not JSON at all (or not an object) is an error.

extern crate alloc;
use alloc::string::String;

use serde_json::{Map, Value};

use crate::error::DecodeError;

pub type Object = Map<String, Value>;

/// Deepest `{`/`[` nesting accepted.  The deepest wire schema (vector
/// road points) needs five; the parser recurses once per level on the
/// httpd stack.
pub const MAX_JSON_DEPTH: usize = 16;

/// Parse a complete text message into its top-level object.
pub fn parse_object(text: &str) -> Result<Object, DecodeError> {
    if nesting_depth(text) > MAX_JSON_DEPTH {
        return Err(DecodeError::TooDeep);
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DecodeError::NotAnObject),
        Err(_) => Err(DecodeError::MalformedJson),
    }
}

/// Maximum bracket depth outside string literals.
fn nesting_depth(text: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_str, mut escaped) = (false, false);
    for b in text.bytes() {
        if in_str {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_str = true,
            b'{' | b'[' => {
                depth += 1;
                max = max.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

/// Copy `s` into a fixed-capacity string, cutting at the last UTF-8
/// boundary that fits.
pub fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = heapless::String::new();
    // `end <= N` and on a char boundary, so this always fits.
    let _ = out.push_str(&s[..end]);
    out
}

/// String field, truncated to `N` bytes; empty when absent or not a string.
pub fn str_field<const N: usize>(obj: &Object, key: &str) -> heapless::String<N> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(truncated::<N>)
        .unwrap_or_default()
}

/// Integer field.  Floats are truncated toward zero; anything else is `None`.
pub fn int_field(obj: &Object, key: &str) -> Option<i64> {
    obj.get(key).and_then(as_int)
}

pub fn bool_field(obj: &Object, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

pub fn as_int(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// Integer saturated into `i16`; the map space is screen pixels.
pub fn saturate_i16(v: i64) -> i16 {
    v.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}
