//! Todo entity and the change sets the adapter accepts.

use time::OffsetDateTime;

pub use todo_plugin_types::TodoRecord;

use super::error::DomainError;

/// Entity label used in not-found conditions; renders as "Todo not found".
pub const TODO_ENTITY: &str = "Todo";

/// Data handed to the adapter on create. `created_at` is stamped by the
/// route, never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub created_at: OffsetDateTime,
}

/// Partial change applied by an update; `None` fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Returns a patched copy. `id` and `created_at` are never touched.
    pub fn apply_to(&self, record: &TodoRecord) -> TodoRecord {
        TodoRecord {
            id: record.id.clone(),
            title: self.title.clone().unwrap_or_else(|| record.title.clone()),
            completed: self.completed.unwrap_or(record.completed),
            created_at: record.created_at,
        }
    }
}

/// Trims a title and rejects blank values.
pub fn validate_title(raw: Option<&str>) -> Result<String, DomainError> {
    let title = raw.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(DomainError::validation("title", "is required"));
    }
    Ok(title.to_string())
}
