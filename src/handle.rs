use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{Error, Result};

fn profile_url() -> &'static Regex {
    static PROFILE_URL: OnceLock<Regex> = OnceLock::new();
    PROFILE_URL.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:x\.com|twitter\.com)/([A-Za-z0-9_]+)")
            .expect("profile url pattern is valid")
    })
}

/// Extracts a handle from `@name`, `name` or a profile URL, keeping its case.
pub fn extract_handle(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(captures) = profile_url().captures(trimmed) {
        if let Some(name) = captures.get(1) {
            return name.as_str().to_string();
        }
    }
    trimmed.trim_start_matches('@').to_string()
}

/// Lowercased handle, the comparison key for lookups and deduplication.
pub fn normalize_handle(raw: &str) -> String {
    extract_handle(raw).to_lowercase()
}

/// Splits a comma and/or whitespace separated list into unique normalized
/// handles, first occurrence first.
pub fn parse_handle_list<'a>(inputs: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut handles = Vec::new();
    for input in inputs {
        for piece in input.split(|c: char| c == ',' || c.is_whitespace()) {
            if piece.trim().is_empty() {
                continue;
            }
            let handle = normalize_handle(piece);
            if handle.is_empty() {
                continue;
            }
            if seen.insert(handle.clone()) {
                handles.push(handle);
            }
        }
    }
    if handles.is_empty() {
        return Err(Error::InvalidRequest(
            "provide at least one handle (comma or space separated)".to_string(),
        ));
    }
    Ok(handles)
}
