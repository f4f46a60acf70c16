//! Backend route table for the todos resource.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use todo_plugin_types::SuccessResponse;
use tracing::debug;

use crate::application::repos::{
    FindMany, RepoError, SortBy, StorageAdapter, TODO_MODEL, WhereClause,
};
use crate::domain::entities::{NewTodo, TODO_ENTITY, TodoPatch, TodoRecord, validate_title};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum TodoRouteError {
    #[error(transparent)]
    Validation(DomainError),
    /// Authoritative absence reported by the adapter.
    #[error("Todo not found")]
    NotFound,
    #[error(transparent)]
    Adapter(#[from] RepoError),
}

impl From<DomainError> for TodoRouteError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => TodoRouteError::NotFound,
            other => TodoRouteError::Validation(other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateTodoCommand {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct UpdateTodoCommand {
    pub id: String,
    pub patch: TodoPatch,
}

/// List/create/update/delete semantics over a [`StorageAdapter`].
#[derive(Clone)]
pub struct TodoRoutes {
    adapter: Arc<dyn StorageAdapter>,
}

impl TodoRoutes {
    pub fn new(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self { adapter }
    }

    /// Newest first. A `None` from the adapter is reported as an empty list.
    pub async fn list(&self) -> Result<Vec<TodoRecord>, TodoRouteError> {
        let todos = self
            .adapter
            .find_many(FindMany {
                model: TODO_MODEL,
                sort_by: Some(SortBy::desc("createdAt")),
            })
            .await?;
        Ok(todos.unwrap_or_default())
    }

    pub async fn create(&self, command: CreateTodoCommand) -> Result<TodoRecord, TodoRouteError> {
        let title = validate_title(command.title.as_deref())?;
        let data = NewTodo {
            title,
            completed: command.completed.unwrap_or(false),
            created_at: OffsetDateTime::now_utc(),
        };

        let created = self.adapter.create(TODO_MODEL, data).await?;
        debug!(todo_id = %created.id, "todo created");
        Ok(created)
    }

    pub async fn update(&self, command: UpdateTodoCommand) -> Result<TodoRecord, TodoRouteError> {
        let UpdateTodoCommand { id, mut patch } = command;
        // A renamed todo follows the same title rule as a created one.
        if let Some(title) = patch.title.take() {
            patch.title = Some(validate_title(Some(&title))?);
        }

        self.adapter
            .update(TODO_MODEL, vec![WhereClause::id(id)], patch)
            .await?
            .ok_or_else(|| DomainError::not_found(TODO_ENTITY).into())
    }

    /// Idempotent: succeeds whether or not a row was removed.
    pub async fn delete(&self, id: &str) -> Result<SuccessResponse, TodoRouteError> {
        self.adapter
            .delete(TODO_MODEL, vec![WhereClause::id(id)])
            .await?;
        Ok(SuccessResponse::OK)
    }
}
