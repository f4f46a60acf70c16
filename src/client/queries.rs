//! Read side of the todo list.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{QueryCache, QueryKey};
use crate::domain::entities::TodoRecord;

use super::invoker::{InvokeError, TodosApi};

/// The list query a page reads from.
///
/// Hydrated or prefetched data is returned as is. The network is only used
/// when the entry is missing, invalidated, or older than the cache's
/// stale time.
#[derive(Clone)]
pub struct TodosQuery {
    api: TodosApi,
    cache: Arc<QueryCache<TodoRecord>>,
}

impl TodosQuery {
    pub fn new(api: TodosApi, cache: Arc<QueryCache<TodoRecord>>) -> Self {
        Self { api, cache }
    }

    /// Whatever the cache holds right now.
    pub fn data(&self) -> Option<Arc<Vec<TodoRecord>>> {
        self.cache.get(QueryKey::Todos)
    }

    pub async fn fetch(&self) -> Result<Arc<Vec<TodoRecord>>, InvokeError> {
        if self.cache.is_fresh(QueryKey::Todos)
            && let Some(data) = self.cache.get(QueryKey::Todos)
        {
            return Ok(data);
        }

        debug!(key = %QueryKey::Todos, "refetching todos");
        let todos = self.api.list().await?;
        Ok(self.cache.set(QueryKey::Todos, todos))
    }

    /// Entry count for metadata; an absent entry counts as zero.
    pub fn count(&self) -> usize {
        self.cache
            .peek(QueryKey::Todos)
            .map_or(0, |todos| todos.len())
    }
}
