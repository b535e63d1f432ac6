use std::collections::HashSet;

use serde_json::Value;

/// Trim and lowercase each tag, dropping tags that are empty after trimming.
/// Order and duplicates are preserved, and the operation is idempotent.
pub fn normalize_preferences<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}

/// Same as [`normalize_preferences`] for untyped input; non-string entries are skipped.
pub fn normalize_json_preferences(values: &[Value]) -> Vec<String> {
    normalize_preferences(values.iter().filter_map(Value::as_str))
}

pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Unique tag list for storage: trims each tag, drops empties, and keeps the
/// first spelling of tags that normalize to the same value.
pub fn dedupe_preferences<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|tag| {
            let trimmed = tag.as_ref().trim();
            let key = normalize_tag(trimmed)?;
            seen.insert(key).then(|| trimmed.to_string())
        })
        .collect()
}
