//! JSON body decoding
//!
//! Decodes a raw body into a keyed parameter map. Only objects and arrays are
//! accepted since handlers bind parameters by key. HAL documents have their
//! `_embedded` resources flattened into the top level.

use super::error::{DecodeError, JsonErrorKind};
use super::params::Params;
use serde_json::error::Category;
use serde_json::Value;

const EMBEDDED: &str = "_embedded";

/// Decode a JSON body into parameters
///
/// Surrounding whitespace is ignored and an empty body decodes to an empty
/// map. Array roots become index-keyed maps (`"0"`, `"1"`, ...).
///
/// # Example
///
/// ```rust
/// use kit_negotiation::negotiation::json;
///
/// let params = json::decode(r#"{"a":1,"_embedded":{"b":2}}"#).unwrap();
/// assert_eq!(params["a"], 1);
/// assert_eq!(params["b"], 2);
/// ```
pub fn decode(raw: &str) -> Result<Params, DecodeError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(Params::new());
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::json(classify(&e, text)))?;

    let mut params = match value {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => return Err(DecodeError::json(JsonErrorKind::Unknown)),
    };

    flatten_embedded(&mut params);
    Ok(params)
}

/// Decode raw body bytes, rejecting input that is not UTF-8
pub fn decode_bytes(raw: &[u8]) -> Result<Params, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::json(JsonErrorKind::Utf8))?;
    decode(text)
}

/// Merge `_embedded` entries over the top-level keys and drop `_embedded`
fn flatten_embedded(params: &mut Params) {
    if !matches!(params.get(EMBEDDED), Some(Value::Object(_))) {
        return;
    }
    if let Some(Value::Object(embedded)) = params.remove(EMBEDDED) {
        params.extend(embedded);
        params.remove(EMBEDDED);
    }
}

fn classify(err: &serde_json::Error, input: &str) -> JsonErrorKind {
    match err.classify() {
        Category::Syntax | Category::Eof => {}
        Category::Io | Category::Data => return JsonErrorKind::Unknown,
    }

    let message = err.to_string();
    if message.starts_with("recursion limit exceeded") {
        JsonErrorKind::Depth
    } else if message.starts_with("control character") {
        JsonErrorKind::ControlCharacter
    } else if message.starts_with("invalid unicode code point")
        || message.starts_with("lone leading surrogate")
        || (message.starts_with("unexpected end of hex escape")
            && follows_high_surrogate(input, err.line(), err.column()))
    {
        JsonErrorKind::Utf8
    } else if message.starts_with("expected `,` or")
        && matches!(
            offending_byte(input, err.line(), err.column()),
            Some(b']') | Some(b'}')
        )
    {
        JsonErrorKind::StateMismatch
    } else {
        JsonErrorKind::Syntax
    }
}

/// Byte at a 1-based line/column position reported by serde_json
fn offending_byte(input: &str, line: usize, column: usize) -> Option<u8> {
    let text = input.split('\n').nth(line.checked_sub(1)?)?;
    text.as_bytes().get(column.checked_sub(1)?).copied()
}

/// Whether a `\uD800`..`\uDBFF` escape ends just before, or at, the reported position
fn follows_high_surrogate(input: &str, line: usize, column: usize) -> bool {
    let Some(text) = line
        .checked_sub(1)
        .and_then(|line| input.split('\n').nth(line))
    else {
        return false;
    };
    let bytes = text.as_bytes();

    [column.saturating_sub(1), column]
        .into_iter()
        .filter(|end| (6..=bytes.len()).contains(end))
        .any(|end| is_high_surrogate_escape(&bytes[end - 6..end]))
}

fn is_high_surrogate_escape(escape: &[u8]) -> bool {
    let Some(hex) = escape.strip_prefix(b"\\u") else {
        return false;
    };
    if !hex.iter().all(u8::is_ascii_hexdigit) {
        return false;
    }
    std::str::from_utf8(hex)
        .ok()
        .and_then(|hex| u16::from_str_radix(hex, 16).ok())
        .is_some_and(|unit| (0xD800..=0xDBFF).contains(&unit))
}
