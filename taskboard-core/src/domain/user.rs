//! User domain model
//!
//! A user carries the denormalized list of task ids currently assigned to
//! it. The list is semantically a set (no duplicates are ever stored) but
//! insertion order is preserved for display.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque store-assigned identifier (empty until inserted)
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Globally unique, enforced by the store
    pub email: String,
    /// Task ids currently pending for this user
    #[serde(default)]
    pub pending_tasks: Vec<String>,
}

/// Loosely-typed request body for user create/update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Accepted shapes: JSON array, JSON-encoded string of an array, or a
    /// comma-separated string. Anything else normalizes to empty.
    #[serde(default)]
    pub pending_tasks: Option<JsonValue>,
}

/// Normalize the desired `pendingTasks` list from its three accepted
/// shapes into task id strings. Unparseable input degrades to empty; it
/// is never an error.
pub fn normalize_pending_tasks(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => items.iter().map(value_to_id).collect(),
        Some(JsonValue::String(raw)) => match serde_json::from_str::<JsonValue>(raw) {
            Ok(JsonValue::Array(items)) => items.iter().map(value_to_id).collect(),
            Ok(_) => Vec::new(),
            // Not JSON: treat as a comma-separated id list
            Err(_) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        },
        _ => Vec::new(),
    }
}

fn value_to_id(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
