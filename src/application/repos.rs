//! Storage adapter contract the todo routes depend on.
//!
//! The backend never talks to storage directly. Concrete adapters (memory,
//! SQL, ...) implement [`StorageAdapter`]; the contract is intentionally
//! narrow: find-many with a sort, create, update by key and delete by key.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{NewTodo, TodoPatch, TodoRecord};

/// Model name the todo routes address.
pub const TODO_MODEL: &str = "todo";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortBy {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortBy {
    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Equality predicate; a `where` is the conjunction of its clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClause {
    pub field: &'static str,
    pub value: String,
}

impl WhereClause {
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            field: "id",
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindMany {
    pub model: &'static str,
    pub sort_by: Option<SortBy>,
}

/// CRUD capability consumed by the todo routes.
///
/// Absence and emptiness are the same thing here: `find_many` may answer
/// `None` where it means "nothing", and `update` answers `None` when no row
/// matched the `where`.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn find_many(&self, query: FindMany) -> Result<Option<Vec<TodoRecord>>, RepoError>;

    async fn create(&self, model: &'static str, data: NewTodo) -> Result<TodoRecord, RepoError>;

    async fn update(
        &self,
        model: &'static str,
        clauses: Vec<WhereClause>,
        patch: TodoPatch,
    ) -> Result<Option<TodoRecord>, RepoError>;

    async fn delete(&self, model: &'static str, clauses: Vec<WhereClause>)
    -> Result<(), RepoError>;
}
