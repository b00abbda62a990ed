//! # Path Templates
//!
//! Fills `:param` tokens in a URI template from a parameter map. A token's effective
//! parameter name goes through the alias map first (`paramMap`), so a schema can say
//! "the `:id` in my path is the caller's `userId`".
//!
//! Unresolved tokens stay in the output verbatim (`/users/:id`) and are reported in
//! [`Filled::errors`]; deciding whether that is fatal belongs to the resolver.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Outcome of filling one template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filled {
    pub uri: String,
    /// Every attempted parameter name with its value (`null` when missing).
    pub params_used: Map<String, Value>,
    /// Effective name of the last token processed.
    pub last_param_key: Option<String>,
    /// Effective names of tokens that could not be resolved.
    pub errors: Vec<String>,
}

impl Filled {
    pub fn is_resolved(&self) -> bool {
        self.errors.is_empty()
    }
}

/// String form of a parameter value, or `None` when the value is falsy.
pub fn param_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        other => Some(other.to_string()),
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn fill(template: &str, params: &Map<String, Value>, aliases: &HashMap<String, String>) -> Filled {
    let mut filled = Filled {
        uri: String::with_capacity(template.len()),
        ..Filled::default()
    };
    let mut rest = template;

    while let Some(start) = rest.find(':') {
        let (head, tail) = rest.split_at(start);
        filled.uri.push_str(head);

        let word_len = tail[1..]
            .find(|c: char| !is_token_char(c))
            .unwrap_or(tail.len() - 1);
        if word_len == 0 {
            // A bare colon (e.g. a port separator) is not a token.
            filled.uri.push(':');
            rest = &tail[1..];
            continue;
        }

        let word = &tail[1..=word_len];
        let name = aliases.get(word).map(String::as_str).unwrap_or(word);
        let value = params.get(name).cloned().unwrap_or(Value::Null);

        match param_string(&value) {
            Some(s) => filled.uri.push_str(&s),
            None => {
                filled.uri.push_str(&tail[..=word_len]);
                filled.errors.push(name.to_string());
            }
        }
        filled.params_used.insert(name.to_string(), value);
        filled.last_param_key = Some(name.to_string());
        rest = &tail[word_len + 1..];
    }
    filled.uri.push_str(rest);
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_fill_substitutes_tokens() {
        let filled = fill(
            "users/:userId/posts/:postId",
            &params(json!({"userId": 4, "postId": "abc"})),
            &HashMap::new(),
        );
        assert_eq!(filled.uri, "users/4/posts/abc");
        assert!(filled.is_resolved());
        assert_eq!(filled.last_param_key.as_deref(), Some("postId"));
        assert_eq!(filled.params_used.get("userId"), Some(&json!(4)));
    }

    #[test]
    fn test_fill_uses_alias_map() {
        let aliases = HashMap::from([("id".to_string(), "userId".to_string())]);
        let filled = fill(":id", &params(json!({"userId": "u1", "id": "ignored"})), &aliases);
        assert_eq!(filled.uri, "u1");
        assert_eq!(filled.last_param_key.as_deref(), Some("userId"));
    }

    #[test]
    fn test_missing_and_falsy_params_are_errors() {
        let filled = fill(
            "a/:x/b/:y/c/:z",
            &params(json!({"x": "", "y": 0})),
            &HashMap::new(),
        );
        assert_eq!(filled.uri, "a/:x/b/:y/c/:z");
        assert_eq!(filled.errors, vec!["x", "y", "z"]);
        assert_eq!(filled.params_used.get("z"), Some(&Value::Null));
    }

    #[test]
    fn test_bare_colon_is_literal() {
        let filled = fill("http://host:/x", &Map::new(), &HashMap::new());
        assert_eq!(filled.uri, "http://host:/x");
        assert!(filled.is_resolved());
        assert!(filled.last_param_key.is_none());
    }
}
