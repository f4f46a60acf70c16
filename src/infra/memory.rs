//! In-process storage adapter.

use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{
    FindMany, RepoError, SortBy, SortDirection, StorageAdapter, TODO_MODEL, WhereClause,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{NewTodo, TodoPatch, TodoRecord};

const SOURCE: &str = "infra::memory::MemoryAdapter";

/// Keeps todos in a vector guarded by an `RwLock`. Ids are UUIDv4.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    rows: RwLock<Vec<TodoRecord>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<TodoRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.rows, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ensure_model(model: &str) -> Result<(), RepoError> {
    if model == TODO_MODEL {
        Ok(())
    } else {
        Err(RepoError::InvalidInput {
            message: format!("unknown model `{model}`"),
        })
    }
}

fn field_value(record: &TodoRecord, field: &str) -> Option<String> {
    match field {
        "id" => Some(record.id.clone()),
        "title" => Some(record.title.clone()),
        "completed" => Some(record.completed.to_string()),
        _ => None,
    }
}

fn matches(record: &TodoRecord, clauses: &[WhereClause]) -> Result<bool, RepoError> {
    for clause in clauses {
        let value = field_value(record, clause.field).ok_or_else(|| RepoError::InvalidInput {
            message: format!("cannot filter on `{}`", clause.field),
        })?;
        if value != clause.value {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Rejects sort fields the adapter cannot order by.
fn check_sort(sort: &SortBy) -> Result<(), RepoError> {
    match sort.field {
        "createdAt" | "title" | "id" => Ok(()),
        other => Err(RepoError::InvalidInput {
            message: format!("cannot sort on `{other}`"),
        }),
    }
}

fn compare(a: &TodoRecord, b: &TodoRecord, sort: &SortBy) -> Ordering {
    let ordering = match sort.field {
        "createdAt" => a.created_at.cmp(&b.created_at),
        "title" => a.title.cmp(&b.title),
        _ => a.id.cmp(&b.id),
    };
    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn find_many(&self, query: FindMany) -> Result<Option<Vec<TodoRecord>>, RepoError> {
        ensure_model(query.model)?;
        let mut rows = rw_read(&self.rows, SOURCE, "find_many").clone();
        if let Some(sort) = &query.sort_by {
            check_sort(sort)?;
            rows.sort_by(|a, b| compare(a, b, sort));
        }
        Ok(Some(rows))
    }

    async fn create(&self, model: &'static str, data: NewTodo) -> Result<TodoRecord, RepoError> {
        ensure_model(model)?;
        let record = TodoRecord {
            id: Uuid::new_v4().to_string(),
            title: data.title,
            completed: data.completed,
            created_at: data.created_at,
        };
        rw_write(&self.rows, SOURCE, "create").push(record.clone());
        debug!(todo_id = %record.id, "memory adapter stored todo");
        Ok(record)
    }

    async fn update(
        &self,
        model: &'static str,
        clauses: Vec<WhereClause>,
        patch: TodoPatch,
    ) -> Result<Option<TodoRecord>, RepoError> {
        ensure_model(model)?;
        let mut rows = rw_write(&self.rows, SOURCE, "update");
        for row in rows.iter_mut() {
            if matches(row, &clauses)? {
                *row = patch.apply_to(row);
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn delete(
        &self,
        model: &'static str,
        clauses: Vec<WhereClause>,
    ) -> Result<(), RepoError> {
        ensure_model(model)?;
        let mut rows = rw_write(&self.rows, SOURCE, "delete");
        let mut failure = None;
        rows.retain(|row| match matches(row, &clauses) {
            Ok(hit) => !hit,
            Err(err) => {
                failure.get_or_insert(err);
                true
            }
        });
        failure.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn row(id: &str, created_at: time::OffsetDateTime) -> TodoRecord {
        TodoRecord {
            id: id.to_string(),
            title: format!("todo {id}"),
            completed: false,
            created_at,
        }
    }

    fn seeded() -> MemoryAdapter {
        MemoryAdapter::with_rows(vec![
            row("old", datetime!(2024-01-01 00:00 UTC)),
            row("new", datetime!(2024-03-01 00:00 UTC)),
            row("mid", datetime!(2024-02-01 00:00 UTC)),
        ])
    }

    #[tokio::test]
    async fn find_many_sorts_newest_first() {
        let rows = seeded()
            .find_many(FindMany {
                model: TODO_MODEL,
                sort_by: Some(SortBy::desc("createdAt")),
            })
            .await
            .expect("find")
            .expect("rows");
        let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected_even_when_empty() {
        let err = MemoryAdapter::new()
            .find_many(FindMany {
                model: TODO_MODEL,
                sort_by: Some(SortBy::desc("priority")),
            })
            .await
            .expect_err("bad field");
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn create_assigns_unique_ids() {
        let adapter = MemoryAdapter::new();
        let data = NewTodo {
            title: "Walk dog".to_string(),
            completed: false,
            created_at: datetime!(2024-01-01 00:00 UTC),
        };
        let a = adapter.create(TODO_MODEL, data.clone()).await.expect("a");
        let b = adapter.create(TODO_MODEL, data).await.expect("b");
        assert_ne!(a.id, b.id);
        assert_eq!(adapter.len(), 2);
    }

    #[tokio::test]
    async fn update_misses_return_none() {
        let adapter = seeded();
        let patch = TodoPatch {
            title: None,
            completed: Some(true),
        };
        let hit = adapter
            .update(TODO_MODEL, vec![WhereClause::id("mid")], patch.clone())
            .await
            .expect("update");
        assert!(hit.expect("row").completed);

        let miss = adapter
            .update(TODO_MODEL, vec![WhereClause::id("nope")], patch)
            .await
            .expect("update");
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let adapter = seeded();
        adapter
            .delete(TODO_MODEL, vec![WhereClause::id("old")])
            .await
            .expect("first delete");
        adapter
            .delete(TODO_MODEL, vec![WhereClause::id("old")])
            .await
            .expect("second delete");
        assert_eq!(adapter.len(), 2);
    }

    #[tokio::test]
    async fn other_models_are_rejected() {
        let err = seeded()
            .delete("user", vec![WhereClause::id("old")])
            .await
            .expect_err("wrong model");
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }
}
