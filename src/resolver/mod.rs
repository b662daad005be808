//! Canonicalization of loosely shaped upstream records.
//!
//! Upstream responses disagree on nesting (`data`, `data.user`, `result`),
//! casing and field synonyms. The tables in [`aliases`] list every known
//! spelling; the functions here walk them in priority order. Only the record
//! identifier is required, everything else falls back to a default.

pub mod aliases;
pub mod post;
pub mod profile;

use serde_json::Value;

pub use post::{resolve_post, resolve_post_list, CanonicalPost, PostBatch};
pub use profile::{resolve_profile, CanonicalProfile};

/// Follows a dotted path through nested objects. `""` is the record itself.
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(record);
    }
    let mut current = record;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Tries every root/key combination in order and returns the first value the
/// converter accepts.
fn first_match<T>(
    record: &Value,
    roots: &[&str],
    keys: &[&str],
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    for root in roots {
        let Some(base) = lookup(record, root) else {
            continue;
        };
        if !base.is_object() {
            continue;
        }
        for key in keys {
            if let Some(value) = lookup(base, key).and_then(&convert) {
                return Some(value);
            }
        }
    }
    None
}

pub(crate) fn string_field(record: &Value, roots: &[&str], keys: &[&str]) -> Option<String> {
    first_match(record, roots, keys, as_text)
}

pub(crate) fn id_field(record: &Value, roots: &[&str], keys: &[&str]) -> Option<String> {
    first_match(record, roots, keys, as_id)
}

pub(crate) fn count_field(record: &Value, roots: &[&str], keys: &[&str]) -> u64 {
    first_match(record, roots, keys, as_count).unwrap_or(0)
}

pub(crate) fn flag_field(record: &Value, roots: &[&str], keys: &[&str]) -> Option<bool> {
    first_match(record, roots, keys, as_flag)
}

fn as_text(value: &Value) -> Option<String> {
    let text = value.as_str()?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Some(unsigned.to_string())
            } else {
                number.as_i64().map(|signed| signed.to_string())
            }
        }
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite() && *float >= 0.0)
                .map(|float| float.trunc() as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
