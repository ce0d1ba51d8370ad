//! Dot-notation lookups into JSON text, e.g. `items[0].name`.

use serde_json::Value;

/// Parse `source` and read `path` from it.
///
/// Returns `None` when the text is not JSON or the path leads nowhere.
pub fn extract(source: &str, path: &str) -> Option<String> {
    let root: Value = serde_json::from_str(source.trim()).ok()?;
    lookup(&root, path).map(render)
}

/// Walk `path` from `value`. Explicit `null`s count as missing.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').map(str::trim) {
        if segment.is_empty() {
            continue;
        }
        let (key, indexes) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for idx in indexes
            .split('[')
            .filter_map(|part| part.strip_suffix(']'))
        {
            let idx: usize = idx.parse().ok()?;
            current = current.get(idx)?;
        }
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// Strings come back unquoted; everything else as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
