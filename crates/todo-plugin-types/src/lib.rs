//! Shared request and response types for the todos plugin HTTP surface.
//!
//! The backend routes serialize these and the client invoker decodes them, so
//! both halves of the plugin agree on one wire format.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single todo as stored by the adapter and returned by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of `POST /todos`.
///
/// `title` is optional on the wire so a missing title surfaces as a
/// validation failure from the route rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl CreateTodoRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            completed: None,
        }
    }
}

/// Body of `PUT /todos/{id}`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Acknowledgement returned by `DELETE /todos/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn todo_record_uses_camel_case_and_rfc3339() {
        let record = TodoRecord {
            id: "1".to_string(),
            title: "Buy groceries".to_string(),
            completed: false,
            created_at: datetime!(2024-01-01 00:00 UTC),
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00Z");
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn update_request_omits_absent_fields() {
        let body = UpdateTodoRequest {
            title: None,
            completed: Some(true),
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert_eq!(json, r#"{"completed":true}"#);
    }
}
