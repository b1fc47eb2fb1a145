//! Safe accessor layer over raw session log rows.
//!
//! Session logs are heterogeneous JSON; every lookup here returns a neutral
//! default so downstream code never pattern-matches on absent fields.

use serde_json::{Map, Value};

/// Borrowed view over one raw log row.
#[derive(Clone, Copy)]
pub struct RawRow<'a> {
    value: &'a Value,
}

impl<'a> RawRow<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.value.get(key)
    }

    /// Lowercased structural row type, or "".
    pub fn row_type(&self) -> String {
        self.str_field("type").to_lowercase()
    }

    /// Lowercased custom sub-type, or "".
    pub fn custom_type(&self) -> String {
        self.str_field("customType").to_lowercase()
    }

    /// Lowercased top-level role, or "".
    pub fn role(&self) -> String {
        self.str_field("role").to_lowercase()
    }

    /// The nested message object carried by `type == "message"` rows.
    pub fn message(&self) -> Option<&'a Map<String, Value>> {
        self.value.get("message").and_then(Value::as_object)
    }

    fn str_field(&self, key: &str) -> &'a str {
        self.value.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Best-effort text extraction from an arbitrary content value.
///
/// Null becomes "". Strings pass through. Arrays join the per-item texts
/// with newlines, dropping empty chunks: string items verbatim, `text`/
/// `thinking`-typed objects use their text field, other objects serialize
/// as JSON. Objects and remaining scalars serialize/coerce to a string.
pub fn as_text(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let mut chunks: Vec<String> = Vec::new();
            for item in items {
                let chunk = match item {
                    Value::String(s) => s.clone(),
                    Value::Object(obj) => object_text(obj),
                    other => other.to_string(),
                };
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
            }
            chunks.join("\n")
        }
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

fn object_text(obj: &Map<String, Value>) -> String {
    let item_type = obj
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    if item_type == "text" || item_type == "thinking" {
        let preferred = obj.get("text").or_else(|| obj.get("thinking"));
        return scalar_text(preferred);
    }
    if obj.contains_key("text") {
        return scalar_text(obj.get("text"));
    }
    serde_json::to_string(obj).unwrap_or_default()
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Tool invocation names declared in a list-valued content field, in
/// encounter order. Non-list content carries no tool calls.
pub fn tool_call_names(content: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = content else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let item_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        if item_type != "toolcall" {
            continue;
        }
        if let Some(name) = obj.get("name").and_then(Value::as_str) {
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_text_null_and_missing() {
        assert_eq!(as_text(None), "");
        assert_eq!(as_text(Some(&Value::Null)), "");
    }

    #[test]
    fn test_as_text_plain_string() {
        assert_eq!(as_text(Some(&json!("hello"))), "hello");
    }

    #[test]
    fn test_as_text_mixed_list() {
        let content = json!([
            "plain",
            {"type": "text", "text": "typed"},
            {"type": "thinking", "thinking": "pondering"},
            {"text": "untyped"},
            {"name": "other"},
            42,
        ]);
        let text = as_text(Some(&content));
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0], "plain");
        assert_eq!(lines[1], "typed");
        assert_eq!(lines[2], "pondering");
        assert_eq!(lines[3], "untyped");
        assert!(lines[4].contains("other"));
        assert_eq!(lines[5], "42");
    }

    #[test]
    fn test_as_text_drops_empty_chunks() {
        let content = json!(["", "kept", {"type": "text", "text": ""}]);
        assert_eq!(as_text(Some(&content)), "kept");
    }

    #[test]
    fn test_as_text_dict_serializes() {
        let content = json!({"name": "read"});
        let text = as_text(Some(&content));
        assert!(text.contains("\"name\""));
        assert!(text.contains("read"));
    }

    #[test]
    fn test_as_text_scalar_coerces() {
        assert_eq!(as_text(Some(&json!(3))), "3");
        assert_eq!(as_text(Some(&json!(true))), "true");
    }

    #[test]
    fn test_tool_call_names_in_order() {
        let content = json!([
            {"type": "toolcall", "name": "read"},
            {"type": "text", "text": "not a call"},
            {"type": "toolCall", "name": "write"},
            {"type": "toolcall"},
            {"type": "toolcall", "name": ""},
        ]);
        assert_eq!(tool_call_names(Some(&content)), vec!["read", "write"]);
    }

    #[test]
    fn test_tool_call_names_non_list() {
        assert!(tool_call_names(Some(&json!({"name": "read"}))).is_empty());
        assert!(tool_call_names(None).is_empty());
    }
}
