//! Error Message Extraction
//!
//! The backend reports failures in several payload shapes: a bare string
//! body, a `message` field, or a FastAPI-style `detail` that may be a
//! string, an object with a `msg` field, or a list of such objects.
//!
//! Extraction is an ordered chain of fallible steps, tried in documented
//! precedence; the first step yielding a usable string wins. When nothing
//! usable is found the HTTP status fallback is substituted, so the
//! resulting message is never empty.

use serde_json::Value;

/// Extract the error message for a failed response.
///
/// Precedence:
/// 1. a non-empty raw string body, verbatim
/// 2. a non-empty `message` field
/// 3. the `detail` field: list items joined with `"; "`, or an object's
///    `msg`, or the string itself
/// 4. `"HTTP error! status: <code>"`
#[must_use]
pub fn error_message(payload: Option<&Value>, status: u16) -> String {
    raw_string(payload)
        .or_else(|| message_field(payload))
        .or_else(|| detail_field(payload))
        .unwrap_or_else(|| format!("HTTP error! status: {status}"))
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn raw_string(payload: Option<&Value>) -> Option<String> {
    match payload? {
        Value::String(text) => non_blank(text),
        _ => None,
    }
}

fn message_field(payload: Option<&Value>) -> Option<String> {
    payload?
        .get("message")
        .and_then(Value::as_str)
        .and_then(non_blank)
}

fn detail_field(payload: Option<&Value>) -> Option<String> {
    let detail = payload?.get("detail")?;
    match detail {
        Value::String(text) => non_blank(text),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(detail_item)
                .collect::<Vec<_>>()
                .join("; ");
            non_blank(&joined)
        }
        Value::Object(_) => detail.get("msg").and_then(Value::as_str).and_then(non_blank),
        _ => None,
    }
}

fn detail_item(item: &Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::String(text) => non_blank(text),
        // A missing or blank `msg` falls through to the serialized item.
        Value::Object(map) => map
            .get("msg")
            .and_then(Value::as_str)
            .and_then(non_blank)
            .or_else(|| serde_json::to_string(item).ok()),
        other => serde_json::to_string(other).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_raw_string_body_wins() {
        let payload = json!("service unavailable");
        assert_eq!(error_message(Some(&payload), 503), "service unavailable");
    }

    #[test]
    fn test_message_field() {
        let payload = json!({"message": "m"});
        assert_eq!(error_message(Some(&payload), 400), "m");
    }

    #[test]
    fn test_message_beats_detail() {
        let payload = json!({"message": "m", "detail": [{"msg": "x"}]});
        assert_eq!(error_message(Some(&payload), 400), "m");
    }

    #[test]
    fn test_blank_message_falls_through_to_detail() {
        let payload = json!({"message": "  ", "detail": "real cause"});
        assert_eq!(error_message(Some(&payload), 400), "real cause");
    }

    #[test]
    fn test_detail_list_joined() {
        let payload = json!({"detail": [{"msg": "x"}, {"msg": "y"}]});
        assert_eq!(error_message(Some(&payload), 422), "x; y");
    }

    #[test]
    fn test_detail_list_mixed_items() {
        let payload = json!({"detail": ["plain", {"msg": "typed"}, {"loc": ["body", "email"]}]});
        assert_eq!(
            error_message(Some(&payload), 422),
            r#"plain; typed; {"loc":["body","email"]}"#
        );
    }

    #[test]
    fn test_detail_list_skips_null_and_blank_strings() {
        let payload = json!({"detail": [null, "", "kept"]});
        assert_eq!(error_message(Some(&payload), 422), "kept");
    }

    #[test]
    fn test_detail_item_with_blank_msg_serializes_whole_item() {
        let payload = json!({"detail": [{"msg": ""}, {"msg": "typed"}]});
        assert_eq!(
            error_message(Some(&payload), 422),
            r#"{"msg":""}; typed"#
        );
    }

    #[test]
    fn test_detail_object_msg() {
        let payload = json!({"detail": {"msg": "from object"}});
        assert_eq!(error_message(Some(&payload), 400), "from object");
    }

    #[test]
    fn test_detail_string() {
        let payload = json!({"detail": "not found"});
        assert_eq!(error_message(Some(&payload), 404), "not found");
    }

    #[test]
    fn test_fallback_when_nothing_usable() {
        assert_eq!(error_message(None, 500), "HTTP error! status: 500");

        let payload = json!({"unrelated": true});
        assert_eq!(error_message(Some(&payload), 502), "HTTP error! status: 502");

        let payload = json!({"detail": []});
        assert_eq!(error_message(Some(&payload), 422), "HTTP error! status: 422");
    }
}
