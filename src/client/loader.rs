//! Server-side prefetch of the todo list.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::domain::entities::TodoRecord;

use super::invoker::TodosApi;

pub const METRIC_LOADER_FALLBACK: &str = "todos_loader_fallback_total";

/// Where a route is being rendered. Passed explicitly instead of probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEnvironment {
    Server,
    Client,
}

impl RenderEnvironment {
    pub fn is_ssr(self) -> bool {
        matches!(self, RenderEnvironment::Server)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Client side; hydration already carries the data.
    Skipped,
    /// A fresh entry was already present.
    Cached,
    Fetched { count: usize },
    /// The fetch failed and an empty list was cached.
    Fallback,
}

/// Seeds [`QueryKey::Todos`] before the first render.
#[derive(Clone)]
pub struct TodosLoader {
    api: TodosApi,
    cache: Arc<QueryCache<TodoRecord>>,
    environment: RenderEnvironment,
}

impl TodosLoader {
    pub fn new(
        api: TodosApi,
        cache: Arc<QueryCache<TodoRecord>>,
        environment: RenderEnvironment,
    ) -> Self {
        Self {
            api,
            cache,
            environment,
        }
    }

    /// Never fails: after it returns on the server the cache always holds a
    /// (possibly empty) list.
    pub async fn load(&self) -> LoadOutcome {
        if !self.environment.is_ssr() {
            return LoadOutcome::Skipped;
        }
        if self.cache.is_fresh(QueryKey::Todos) {
            debug!(key = %QueryKey::Todos, "prefetch skipped, entry is fresh");
            return LoadOutcome::Cached;
        }

        match self.api.list().await {
            Ok(todos) => {
                let count = todos.len();
                self.cache.set(QueryKey::Todos, todos);
                debug!(key = %QueryKey::Todos, count, "prefetched todos");
                LoadOutcome::Fetched { count }
            }
            Err(err) => {
                warn!(
                    key = %QueryKey::Todos,
                    error = %err,
                    "prefetch failed, caching an empty list"
                );
                counter!(METRIC_LOADER_FALLBACK).increment(1);
                self.cache.set(QueryKey::Todos, Vec::new());
                LoadOutcome::Fallback
            }
        }
    }
}
