//! Task domain model
//!
//! A task carries a denormalized copy of its assignee's identity and
//! display name. The empty string in `assigned_user` is the sentinel for
//! "unassigned"; `assigned_user_name` then holds the literal "unassigned".

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Display name used when a task has no assignee
pub const UNASSIGNED: &str = "unassigned";

/// A tracked task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque store-assigned identifier (empty until inserted)
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    /// Assignee's User id, or "" when unassigned
    #[serde(default)]
    pub assigned_user: String,
    /// Denormalized copy of the assignee's display name
    #[serde(default)]
    pub assigned_user_name: String,
}

impl Task {
    /// True when the task has an assignee
    pub fn is_assigned(&self) -> bool {
        !self.assigned_user.is_empty()
    }
}

/// Loosely-typed request body for task create/update
///
/// `completed` and `deadline` keep their raw JSON shape because the API
/// accepts booleans or strings for the former and numbers or strings for
/// the latter; normalization happens in the service layer via the helpers
/// below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<JsonValue>,
    #[serde(default)]
    pub completed: Option<JsonValue>,
    #[serde(default)]
    pub assigned_user: Option<String>,
}

/// Normalize the loose `completed` field: JSON `true` or any string equal
/// to "true" case-insensitively; everything else is false.
pub fn normalize_completed(value: Option<&JsonValue>) -> bool {
    match value {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Parse the loose `deadline` field into a UTC timestamp.
///
/// A number, or a string that parses as a finite number, is taken as epoch
/// milliseconds. Otherwise the string is tried as RFC 3339, then as a
/// naive `%Y-%m-%dT%H:%M:%S` (UTC assumed), then as a bare `%Y-%m-%d`
/// date at midnight UTC. Returns None for anything else.
pub fn parse_deadline(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(num) = s.parse::<f64>() {
                if num.is_finite() {
                    return Utc.timestamp_millis_opt(num as i64).single();
                }
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                let midnight = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&midnight));
            }
            None
        }
        _ => None,
    }
}

/// True when a loose required field is effectively missing: absent, JSON
/// null, or an empty string.
pub(crate) fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.is_empty(),
        _ => false,
    }
}
