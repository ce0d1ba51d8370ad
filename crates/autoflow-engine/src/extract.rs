//! Text derivation and value generation used by extract nodes.
//!
//! Lookups (regex, JSON, substring) never fail: when they find nothing they
//! return the node's default value.

use rand::Rng;
use regex::Regex;

use autoflow_core::json_path;

const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Capture `group` of the first match of `pattern` in `source`.
pub fn by_regex(source: &str, pattern: &str, group: usize, default: &str) -> String {
    if pattern.trim().is_empty() {
        return default.to_string();
    }
    let Ok(re) = Regex::new(pattern) else {
        return default.to_string();
    };
    re.captures(source)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Read a dot-notation `path` from JSON text.
pub fn by_json_path(source: &str, path: &str, default: &str) -> String {
    if path.trim().is_empty() {
        return default.to_string();
    }
    json_path::extract(source, path).unwrap_or_else(|| default.to_string())
}

/// `length` characters of `source` from `start`. A negative length reads to
/// the end; a start outside the text yields `default`.
pub fn substring(source: &str, start: i64, length: i64, default: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    if chars.is_empty() || start < 0 || start as usize > chars.len() {
        return default.to_string();
    }
    let start = start as usize;
    let end = if length < 0 {
        chars.len()
    } else {
        start.saturating_add(length as usize).min(chars.len())
    };
    chars[start..end].iter().collect()
}

/// Uniform integer between the two bounds, inclusive, in either order.
pub fn random_int(a: i64, b: i64) -> i64 {
    let (low, high) = (a.min(b), a.max(b));
    if low == high {
        return low;
    }
    rand::thread_rng().gen_range(low..=high)
}

/// `length` characters drawn from `charset`, or from ASCII letters and digits
/// when the charset is empty.
pub fn random_string(length: usize, charset: &str) -> String {
    let pool: Vec<char> = if charset.is_empty() {
        ALPHANUMERIC.chars().collect()
    } else {
        charset.chars().collect()
    };
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect()
}

/// Read a boolean out of loosely formatted text.
pub fn parse_boolean_like(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
