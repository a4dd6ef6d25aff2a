//! Input scrubbing and log redaction.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const REDACTED: &str = "[REDACTED]";

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script pattern")
});

static JAVASCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("valid scheme pattern"));

static INLINE_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("valid handler pattern"));

static SENSITIVE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)password|token|secret|key|credential").expect("valid sensitive pattern")
});

/// Strip script blocks, `javascript:` and inline handlers from every string in `input`.
pub fn sanitize_input(input: Value) -> Value {
    match input {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_input).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, sanitize_input(v)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

pub fn sanitize_str(input: &str) -> String {
    let trimmed = input.trim();
    let without_scripts = SCRIPT_BLOCK.replace_all(trimmed, "");
    let without_scheme = JAVASCRIPT_SCHEME.replace_all(&without_scripts, "");
    INLINE_HANDLER.replace_all(&without_scheme, "").into_owned()
}

pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEY.is_match(key)
}

/// Replace values under sensitive keys, recursively.
pub fn redact_sensitive(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| {
                    if is_sensitive_key(&k) {
                        (k, Value::String(REDACTED.to_string()))
                    } else {
                        (k, redact_sensitive(v))
                    }
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact_sensitive).collect()),
        other => other,
    }
}

/// Decoded query parameters as a log-safe JSON object.
///
/// Repeated names collect into an array. Sensitive names are redacted and
/// values are scrubbed with [`sanitize_input`].
pub fn loggable_query(pairs: &[(String, String)]) -> Value {
    let mut fields = Map::new();
    for (name, value) in pairs {
        let value = Value::String(value.clone());
        match fields.get_mut(name) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(name.clone(), value);
            }
        }
    }
    sanitize_input(redact_sensitive(Value::Object(fields)))
}
