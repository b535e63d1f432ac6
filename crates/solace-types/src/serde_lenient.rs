//! Deserializers that default malformed values instead of rejecting the record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::SupportRole;

/// Accepts an array and keeps only its string entries.
/// Anything else (missing, null, scalar, object) becomes an empty list.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Unknown or non-string roles become `None`.
pub fn support_role<'de, D>(deserializer: D) -> Result<Option<SupportRole>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
