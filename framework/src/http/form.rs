//! URL-encoded form and query-string decoding into keyed parameters
//!
//! Keys use the bracket convention browsers and PHP-style backends share:
//! `a[]=1&a[]=2` builds a list and `user[name]=ann` builds a nested map.
//! Decoding is best-effort and never fails; values are always strings.

use crate::negotiation::Params;
use serde_json::{Map, Value};

/// Deepest bracket nesting honoured; deeper keys are kept literally
const MAX_DEPTH: usize = 32;

/// Decode an `application/x-www-form-urlencoded` byte string
///
/// ```rust
/// use kit_negotiation::http::parse_params;
///
/// let params = parse_params(b"x=1&tags[]=a&tags[]=b&user[name]=ann");
/// assert_eq!(params["x"], "1");
/// assert_eq!(params["tags"][1], "b");
/// assert_eq!(params["user"]["name"], "ann");
/// ```
pub fn parse_params(bytes: &[u8]) -> Params {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes).unwrap_or_default();
    nest_pairs(pairs)
}

/// Build a nested parameter map from decoded `(key, value)` pairs
pub fn nest_pairs<I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut params = Params::new();
    for (key, value) in pairs {
        let (root, path) = split_key(&key);
        if path.is_empty() {
            params.insert(root.to_string(), Value::String(value));
            continue;
        }
        let slot = params.entry(root.to_string()).or_insert(Value::Null);
        assign(slot, &path, Value::String(value));
    }
    params
}

/// Split `user[tags][]` into `("user", ["tags", ""])`
///
/// Keys that don't follow the bracket convention, or nest deeper than
/// `MAX_DEPTH`, are returned whole.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let open = match key.find('[') {
        Some(open) if open > 0 => open,
        _ => return (key, Vec::new()),
    };

    let (root, mut rest) = key.split_at(open);
    let mut path = Vec::new();
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key, Vec::new());
        };
        if path.len() == MAX_DEPTH {
            return (key, Vec::new());
        }
        path.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if !rest.is_empty() {
        return (key, Vec::new());
    }
    (root, path)
}

fn assign(slot: &mut Value, path: &[&str], value: Value) {
    let Some((segment, rest)) = path.split_first() else {
        *slot = value;
        return;
    };

    if segment.is_empty() {
        match slot {
            Value::Array(items) => {
                items.push(Value::Null);
                if let Some(last) = items.last_mut() {
                    assign(last, rest, value);
                }
            }
            Value::Object(map) => {
                let index = map.len().to_string();
                let entry = map.entry(index).or_insert(Value::Null);
                assign(entry, rest, value);
            }
            _ => {
                *slot = Value::Array(Vec::new());
                assign(slot, path, value);
            }
        }
        return;
    }

    if let Value::Array(items) = slot {
        let map: Map<String, Value> = std::mem::take(items)
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect();
        *slot = Value::Object(map);
    }
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let entry = map.entry(segment.to_string()).or_insert(Value::Null);
        assign(entry, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn expected(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flat_pairs() {
        assert_eq!(parse_params(b"x=1&y=2"), expected(json!({"x": "1", "y": "2"})));
        assert_eq!(
            parse_params(b"name=Ann+Lee&note=a%26b"),
            expected(json!({"name": "Ann Lee", "note": "a&b"}))
        );
    }

    #[test]
    fn test_later_keys_overwrite() {
        assert_eq!(parse_params(b"x=1&x=2"), expected(json!({"x": "2"})));
    }

    #[test]
    fn test_list_and_nested_keys() {
        assert_eq!(
            parse_params(b"tags[]=a&tags[]=b&user[name]=ann&user[roles][]=admin"),
            expected(json!({
                "tags": ["a", "b"],
                "user": {"name": "ann", "roles": ["admin"]}
            }))
        );
    }

    #[test]
    fn test_encoded_brackets() {
        assert_eq!(
            parse_params(b"user%5Bname%5D=ann"),
            expected(json!({"user": {"name": "ann"}}))
        );
    }

    #[test]
    fn test_mixed_list_then_keyed() {
        assert_eq!(
            parse_params(b"a[]=x&a[k]=y"),
            expected(json!({"a": {"0": "x", "k": "y"}}))
        );
    }

    #[test]
    fn test_malformed_keys_are_literal() {
        assert_eq!(
            parse_params(b"bad[=1&[]=2&a[b]c=3"),
            expected(json!({"bad[": "1", "[]": "2", "a[b]c": "3"}))
        );
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let at_limit = format!("a{}=1", "[k]".repeat(MAX_DEPTH));
        let params = parse_params(at_limit.as_bytes());
        let mut value = &params["a"];
        for _ in 0..MAX_DEPTH {
            value = &value["k"];
        }
        assert_eq!(value, &Value::String("1".to_string()));

        let too_deep = format!("a{}", "[k]".repeat(MAX_DEPTH + 1));
        let params = parse_params(format!("{}=1", too_deep).as_bytes());
        let mut literal = Params::new();
        literal.insert(too_deep, Value::String("1".to_string()));
        assert_eq!(params, literal);
    }

    #[test]
    fn test_very_deep_key_does_not_overflow() {
        let key = format!("a{}", "[]".repeat(32_000));
        let params = parse_params(format!("{}=1", key).as_bytes());

        assert_eq!(params.len(), 1);
        assert_eq!(params[&key], "1");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_params(b""), Params::new());
    }

    #[test]
    fn test_json_text_decodes_as_a_single_key() {
        assert_eq!(parse_params(b"{bad json"), expected(json!({"{bad json": ""})));
    }
}
