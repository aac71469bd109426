//! Annotation parsing for field tags and other inline metadata.
//!
//! Annotations are written as JSON5 object literals: keys may be bare
//! identifiers, strings may use single or double quotes and trailing commas
//! are accepted. Three surface forms are admitted:
//!
//! - a braced literal: `{min:4,max:10}`
//! - a struct-tag wrapper whose `scheme` entry holds the literal, with or
//!   without braces: `scheme:"min:4,max:10"`
//! - anything else is looked up as a struct tag too, so a bare list such as
//!   `min:4,max:10` has no `scheme` entry and yields an empty mapping.

use serde_json::{Map, Value};
use std::fmt;

/// Ordered key/value mapping produced by annotation parsing.
pub type KeyValue = Map<String, Value>;

/// Struct-tag key that wraps an annotation literal.
pub const TAG_KEY: &str = "scheme";

/// Why an annotation could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationError {
    /// Human readable reason, including the location when known
    pub message: String,
}

impl AnnotationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AnnotationError {}

impl From<json5::Error> for AnnotationError {
    fn from(e: json5::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Brings an annotation into braced-literal form.
pub fn normalize_tag(tag: &str) -> String {
    let mut tag = tag.trim().to_string();
    if !tag.starts_with('{') {
        tag = lookup_struct_tag(&tag, TAG_KEY)
            .unwrap_or_default()
            .trim()
            .to_string();
        if !tag.starts_with('{') {
            tag.insert(0, '{');
        }
    }
    if !tag.ends_with('}') {
        tag.push('}');
    }
    tag
}

/// Parses an annotation, distinguishing "absent" (`Ok` with an empty
/// mapping) from "malformed" (`Err`).
pub fn parse_tag(tag: &str) -> Result<KeyValue, AnnotationError> {
    let literal = normalize_tag(tag);
    match parse_relaxed(&literal)? {
        Value::Object(map) => Ok(map),
        _ => Err(AnnotationError::new("annotation is not an object")),
    }
}

/// Looks up `key` in a struct tag of the form `k1:"v1" k2:"v2"`.
///
/// Scanning stops at the first malformed entry, so a value is only returned
/// when every entry before it is well formed.
pub fn lookup_struct_tag(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    while !rest.is_empty() {
        rest = rest.trim_start_matches(' ');
        let bytes = rest.as_bytes();

        let mut i = 0;
        while i < bytes.len()
            && bytes[i] > b' '
            && bytes[i] != b':'
            && bytes[i] != b'"'
            && bytes[i] != 0x7f
        {
            i += 1;
        }
        if i == 0 || i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
            return None;
        }
        let name = &rest[..i];
        rest = &rest[i + 1..];

        let bytes = rest.as_bytes();
        let mut j = 1;
        while j < bytes.len() && bytes[j] != b'"' {
            if bytes[j] == b'\\' {
                j += 1;
            }
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let quoted = &rest[..j + 1];
        rest = &rest[j + 1..];

        if name == key {
            return unquote(quoted);
        }
    }
    None
}

/// Removes the surrounding double quotes of a tag value and resolves its
/// backslash escapes.
fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(hex_char(&mut chars, 2)?),
            'u' => out.push(hex_char(&mut chars, 4)?),
            other => out.push(other),
        }
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars, len: usize) -> Option<char> {
    let digits: String = chars.take(len).collect();
    if digits.len() != len {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
}

/// Parses a JSON5 object/array literal into a JSON value.
pub fn parse_relaxed(text: &str) -> Result<Value, AnnotationError> {
    Ok(json5::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn assert_min_max_pattern(kv: &KeyValue) {
        assert_eq!(kv["min"], json!(4));
        assert_eq!(kv["max"], json!(4));
        assert_eq!(kv["pattern"], json!(r"\s"));
    }

    #[test]
    fn test_braced_literal() {
        let kv = parse_tag(r#"{min:4,max:4,pattern:"\\s"}"#).unwrap();
        assert_min_max_pattern(&kv);
    }

    #[test]
    fn test_bare_list_yields_empty_mapping() {
        let kv = parse_tag(r#"min:4,max:4,pattern:"\\s""#).unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_tag_wrapped_braced_literal() {
        let kv = parse_tag(r#"scheme:"{min:4,max:4,pattern:\"\\\\s\"}""#).unwrap();
        assert_min_max_pattern(&kv);
    }

    #[test]
    fn test_tag_wrapped_list_double_quotes() {
        let kv = parse_tag(r#"scheme:"min:4,max:4,pattern:\"\\\\s\"""#).unwrap();
        assert_min_max_pattern(&kv);
    }

    #[test]
    fn test_tag_wrapped_list_single_quotes() {
        let kv = parse_tag(r#"scheme:"min:4,max:4,pattern:'\\\\s'""#).unwrap();
        assert_min_max_pattern(&kv);
    }

    #[test]
    fn test_tag_wrapped_among_other_keys() {
        let kv = parse_tag(r#"json:"name" scheme:"min:1""#).unwrap();
        assert_eq!(kv["min"], json!(1));
    }

    #[test]
    fn test_key_order_is_preserved() {
        let kv = parse_tag("{max:1, min:0, format:'x'}").unwrap();
        let keys: Vec<_> = kv.keys().cloned().collect();
        assert_eq!(keys, vec!["max", "min", "format"]);
    }

    #[test]
    fn test_empty_annotation_is_absent_not_malformed() {
        assert!(parse_tag("").unwrap().is_empty());
        assert!(parse_tag("   ").unwrap().is_empty());
        assert!(parse_tag("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_literal_is_an_error() {
        assert!(parse_tag("{min:}").is_err());
    }

    #[test]
    fn test_hex_escapes_in_strings() {
        let kv = parse_tag(r#"{pattern:'\x41+'}"#).unwrap();
        assert_eq!(kv["pattern"], json!("A+"));
    }

    #[test]
    fn test_non_finite_numbers_are_accepted() {
        let kv = parse_tag("{max:Infinity, min:-Infinity, multipleOf:NaN}").unwrap();
        let keys: Vec<_> = kv.keys().cloned().collect();
        assert_eq!(keys, vec!["max", "min", "multipleOf"]);
    }

    #[test]
    fn test_relaxed_values() {
        let value = parse_relaxed(
            "{a: -1.5, b: true, c: null, d: [1, 'two',], 'e f': {g: 0x10}, /* note */ h: +2,}",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"a": -1.5, "b": true, "c": null, "d": [1, "two"], "e f": {"g": 16}, "h": 2})
        );
    }

    #[test]
    fn test_lookup_struct_tag() {
        assert_eq!(
            lookup_struct_tag(r#"json:"id" scheme:"a\"b""#, "scheme"),
            Some("a\"b".to_string())
        );
        assert_eq!(lookup_struct_tag(r#"json:"id""#, "scheme"), None);
        assert_eq!(lookup_struct_tag("min:4", "scheme"), None);
        assert_eq!(lookup_struct_tag(r#"scheme:"unterminated"#, "scheme"), None);
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  {a:1}  "), "{a:1}");
        assert_eq!(normalize_tag(r#"scheme:"a:1""#), "{a:1}");
        assert_eq!(normalize_tag("a:1"), "{}");
    }
}
