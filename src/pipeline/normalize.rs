//! Response normalisation: fence-strip the model's reply and parse it as JSON.
//!
//! ## Why robust stripping?
//!
//! The prompt asks the model for a bare JSON object, but VLMs routinely wrap
//! their answer in ```` ```json … ``` ```` fences anyway. Naive prefix
//! stripping (removing a literal `"```json\n"` string) breaks in practice:
//! it misses a bare ```` ``` ```` opener, leaves the closing fence behind,
//! and — done with character-set semantics — can eat the braces of the JSON
//! itself. This module instead matches the whole fenced block with a regex,
//! falls back to locating a fenced block embedded in surrounding prose, and
//! finally trims any dangling fence line. When no fence is present every
//! pass is a no-op.
//!
//! Parsing is the last line of defence: the model's output format is
//! guaranteed only by instruction, so a reply that is still not JSON after
//! stripping surfaces as [`ReceiptError::InvalidJson`] with a snippet of what
//! the model actually said.

use crate::error::ReceiptError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Whole reply is a single fenced block.
static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n?(.*?)\n?```\s*$").unwrap());

/// A fenced block embedded in prose ("Here is the JSON: ```json … ```").
static RE_EMBEDDED_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\n?(.*?)\n?```").unwrap());

/// Strip markdown code-fence decoration from the model's reply.
///
/// Handles, in order: a reply that is exactly one fenced block, a fenced
/// block embedded in surrounding prose, and a dangling opening or closing
/// fence with no counterpart. Returns the input unchanged (modulo outer
/// whitespace) when no fence is present.
pub fn strip_json_fences(input: &str) -> String {
    let trimmed = input.trim();

    if let Some(caps) = RE_OUTER_FENCE.captures(trimmed) {
        return caps[1].trim().to_string();
    }

    if let Some(caps) = RE_EMBEDDED_FENCE.captures(trimmed) {
        return caps[1].trim().to_string();
    }

    // Dangling fences: an opener with no closer, or vice versa.
    let mut s = trimmed;
    if let Some(rest) = s.strip_prefix("```") {
        s = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest)
            .trim_start();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }
    s.to_string()
}

/// Parse the model's reply into a JSON value after fence stripping.
///
/// The top-level shape is not validated (the caller gets whatever JSON the
/// model produced — object, array, or scalar); only syntactic validity is
/// enforced.
pub fn parse_record(raw: &str) -> Result<Value, ReceiptError> {
    let stripped = strip_json_fences(raw);
    serde_json::from_str(&stripped).map_err(|e| ReceiptError::InvalidJson {
        detail: e.to_string(),
        snippet: snippet(raw),
    })
}

/// Pretty-print a JSON value with 4-space indentation and a trailing newline.
pub fn to_pretty_json(value: &Value) -> Result<String, ReceiptError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| ReceiptError::Internal(format!("JSON serialisation failed: {e}")))?;
    let mut s = String::from_utf8(buf)
        .map_err(|e| ReceiptError::Internal(format!("JSON output was not UTF-8: {e}")))?;
    s.push('\n');
    Ok(s)
}

/// First line of the raw reply, truncated, for error messages.
fn snippet(raw: &str) -> String {
    let first_line = raw.trim().lines().next().unwrap_or("");
    let mut s: String = first_line.chars().take(80).collect();
    if s.len() < first_line.len() {
        s.push('…');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_json_fence() {
        let input = "```json\n{\"total\": 10.5}\n```";
        assert_eq!(strip_json_fences(input), "{\"total\": 10.5}");
    }

    #[test]
    fn strips_fence_without_language() {
        let input = "```\n{\"total\": 10.5}\n```";
        assert_eq!(strip_json_fences(input), "{\"total\": 10.5}");
    }

    #[test]
    fn no_fence_is_a_noop() {
        let input = "{\"total\": 10.5}";
        assert_eq!(strip_json_fences(input), input);
    }

    #[test]
    fn strips_fence_embedded_in_prose() {
        let input = "Here is the extracted data:\n```json\n{\"total\": 3}\n```\nLet me know!";
        assert_eq!(strip_json_fences(input), "{\"total\": 3}");
    }

    #[test]
    fn strips_dangling_opening_fence() {
        let input = "```json\n{\"total\": 10.5}";
        assert_eq!(strip_json_fences(input), "{\"total\": 10.5}");
    }

    #[test]
    fn strips_dangling_closing_fence() {
        let input = "{\"total\": 10.5}\n```";
        assert_eq!(strip_json_fences(input), "{\"total\": 10.5}");
    }

    #[test]
    fn stripping_does_not_eat_braces() {
        // Character-set stripping of "```json\n" would remove the leading `{`
        // of `{"n":1}`; a block-level match must not.
        let input = "```json\n{\"n\": 1}\n```";
        let parsed: Value = serde_json::from_str(&strip_json_fences(input)).unwrap();
        assert_eq!(parsed, json!({"n": 1}));
    }

    #[test]
    fn fenced_reply_parses_to_object() {
        let record = parse_record("```json\n{\"total\": 10.5}\n```").unwrap();
        assert_eq!(record, json!({"total": 10.5}));
    }

    #[test]
    fn unfenced_reply_parses_to_object() {
        let record = parse_record("{\"total\": 10.5}").unwrap();
        assert_eq!(record, json!({"total": 10.5}));
    }

    #[test]
    fn prose_reply_is_invalid_json() {
        let err = parse_record("Sorry, I cannot read this receipt.").unwrap_err();
        match err {
            ReceiptError::InvalidJson { snippet, .. } => {
                assert!(snippet.starts_with("Sorry"), "got snippet: {snippet}");
            }
            other => panic!("expected InvalidJson, got {other:?}"),
        }
    }

    #[test]
    fn snippet_is_truncated() {
        let long = "x".repeat(300);
        assert!(snippet(&long).chars().count() <= 81);
        assert!(snippet(&long).ends_with('…'));
    }

    #[test]
    fn pretty_json_uses_four_space_indent() {
        let value = json!({"business": "Acme", "total": 12.0});
        let s = to_pretty_json(&value).unwrap();
        assert_eq!(
            s,
            "{\n    \"business\": \"Acme\",\n    \"total\": 12.0\n}\n"
        );
    }

    #[test]
    fn pretty_json_nested_indent() {
        let value = json!({"items": [{"name": "Coffee", "price": 3.5}]});
        let s = to_pretty_json(&value).unwrap();
        assert!(s.contains("\n        {\n"), "nested level uses 8 spaces:\n{s}");
        assert!(s.ends_with("}\n"));
    }
}
