//! Optimistic writes against the shared todo list.
//!
//! Every mutation runs the same protocol:
//!
//! 1. snapshot the [`QueryKey::Todos`] entry into a [`MutationContext`];
//! 2. synchronously replace the entry with a transformed copy;
//! 3. await the API call;
//! 4. on success reconcile with the server's answer and call `on_success`;
//! 5. on error restore the snapshot exactly and call `on_error`;
//! 6. either way, mark the entry stale.
//!
//! Two mutations on the same id are not ordered against each other; the
//! last one to settle decides the cache contents.

use std::sync::Arc;

use metrics::counter;
use time::OffsetDateTime;
use todo_plugin_types::{CreateTodoRequest, SuccessResponse, UpdateTodoRequest};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{QueryCache, QueryKey};
use crate::domain::entities::TodoRecord;

use super::invoker::{InvokeError, TodosApi};

pub const METRIC_MUTATION_ROLLBACK: &str = "todos_mutation_rollback_total";

/// Prefix of ids assigned to rows created optimistically.
pub const OPTIMISTIC_ID_PREFIX: &str = "optimistic-";

pub type SuccessCallback<T> = Box<dyn FnOnce(&T) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(&InvokeError) + Send>;

/// Caller-supplied notifications. Both fire even if the page that started
/// the mutation is gone by the time it settles.
pub struct MutationCallbacks<T> {
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

impl<T> Default for MutationCallbacks<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> MutationCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&InvokeError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoChange {
    Toggle { completed: bool },
    Delete,
    Create { title: String, completed: bool },
}

impl TodoChange {
    pub fn kind(&self) -> &'static str {
        match self {
            TodoChange::Toggle { .. } => "toggle",
            TodoChange::Delete => "delete",
            TodoChange::Create { .. } => "create",
        }
    }

    fn apply(&self, target_id: &str, current: Option<&[TodoRecord]>) -> Option<Vec<TodoRecord>> {
        match self {
            TodoChange::Toggle { completed } => toggle_todo(current, target_id, *completed),
            TodoChange::Delete => remove_todo(current, target_id),
            TodoChange::Create { title, completed } => prepend_todo(
                current,
                TodoRecord {
                    id: target_id.to_string(),
                    title: title.clone(),
                    completed: *completed,
                    created_at: OffsetDateTime::now_utc(),
                },
            ),
        }
    }
}

/// State of one in-flight mutation; dropped when it settles.
#[derive(Debug)]
pub struct MutationContext {
    pub target_id: String,
    pub previous: Option<Arc<Vec<TodoRecord>>>,
    pub change: TodoChange,
}

#[derive(Clone)]
pub struct TodoMutations {
    api: TodosApi,
    cache: Arc<QueryCache<TodoRecord>>,
}

impl TodoMutations {
    pub fn new(api: TodosApi, cache: Arc<QueryCache<TodoRecord>>) -> Self {
        Self { api, cache }
    }

    /// Steps 1 and 2: snapshot, then apply the change optimistically.
    pub fn begin(&self, target_id: impl Into<String>, change: TodoChange) -> MutationContext {
        let target_id = target_id.into();
        let previous = self.cache.peek(QueryKey::Todos);
        let applied = self
            .cache
            .update(QueryKey::Todos, |current| change.apply(&target_id, current));
        debug!(
            change = change.kind(),
            todo_id = %target_id,
            applied,
            "optimistic update"
        );
        MutationContext {
            target_id,
            previous,
            change,
        }
    }

    pub async fn toggle(
        &self,
        id: &str,
        completed: bool,
        callbacks: MutationCallbacks<TodoRecord>,
    ) -> Result<TodoRecord, InvokeError> {
        let context = self.begin(id, TodoChange::Toggle { completed });
        let request = UpdateTodoRequest {
            title: None,
            completed: Some(completed),
        };
        let result = self.api.update(id, &request).await;
        self.settle(context, result, callbacks, |cache, context, server| {
            cache.update(QueryKey::Todos, |current| {
                replace_todo(current, &context.target_id, server.clone())
            });
        })
    }

    pub async fn delete(
        &self,
        id: &str,
        callbacks: MutationCallbacks<SuccessResponse>,
    ) -> Result<SuccessResponse, InvokeError> {
        let context = self.begin(id, TodoChange::Delete);
        let result = self.api.delete(id).await;
        self.settle(context, result, callbacks, |_, _, _| {})
    }

    /// Shows the row immediately under a provisional id, then swaps in the
    /// server's record.
    pub async fn create(
        &self,
        title: impl Into<String>,
        completed: Option<bool>,
        callbacks: MutationCallbacks<TodoRecord>,
    ) -> Result<TodoRecord, InvokeError> {
        let title = title.into();
        let provisional_id = format!("{OPTIMISTIC_ID_PREFIX}{}", Uuid::new_v4());
        let context = self.begin(
            provisional_id,
            TodoChange::Create {
                title: title.clone(),
                completed: completed.unwrap_or(false),
            },
        );
        let request = CreateTodoRequest {
            title: Some(title),
            completed,
        };
        let result = self.api.create(&request).await;
        self.settle(context, result, callbacks, |cache, context, server| {
            cache.update(QueryKey::Todos, |current| {
                replace_todo(current, &context.target_id, server.clone())
            });
        })
    }

    /// Steps 4 to 6.
    fn settle<T>(
        &self,
        context: MutationContext,
        result: Result<T, InvokeError>,
        callbacks: MutationCallbacks<T>,
        reconcile: impl FnOnce(&QueryCache<TodoRecord>, &MutationContext, &T),
    ) -> Result<T, InvokeError> {
        let outcome = match result {
            Ok(value) => {
                reconcile(&self.cache, &context, &value);
                if let Some(on_success) = callbacks.on_success {
                    on_success(&value);
                }
                Ok(value)
            }
            Err(err) => {
                self.rollback(&context, &err);
                if let Some(on_error) = callbacks.on_error {
                    on_error(&err);
                }
                Err(err)
            }
        };
        self.cache.invalidate(QueryKey::Todos);
        outcome
    }

    fn rollback(&self, context: &MutationContext, err: &InvokeError) {
        warn!(
            change = context.change.kind(),
            todo_id = %context.target_id,
            error = %err,
            "mutation failed, rolling back"
        );
        counter!(METRIC_MUTATION_ROLLBACK, "change" => context.change.kind()).increment(1);
        self.cache.restore(QueryKey::Todos, context.previous.clone());
    }
}

/// Sets `completed` on the matching row. An absent list stays absent.
pub fn toggle_todo(
    current: Option<&[TodoRecord]>,
    id: &str,
    completed: bool,
) -> Option<Vec<TodoRecord>> {
    let current = current?;
    Some(
        current
            .iter()
            .map(|todo| {
                if todo.id == id {
                    TodoRecord {
                        completed,
                        ..todo.clone()
                    }
                } else {
                    todo.clone()
                }
            })
            .collect(),
    )
}

pub fn remove_todo(current: Option<&[TodoRecord]>, id: &str) -> Option<Vec<TodoRecord>> {
    let current = current?;
    Some(current.iter().filter(|todo| todo.id != id).cloned().collect())
}

/// Puts `todo` first, matching the newest-first order of the list.
pub fn prepend_todo(current: Option<&[TodoRecord]>, todo: TodoRecord) -> Option<Vec<TodoRecord>> {
    let current = current?;
    let mut next = Vec::with_capacity(current.len() + 1);
    next.push(todo);
    next.extend_from_slice(current);
    Some(next)
}

/// Swaps the row with id `id` for `replacement`, keeping its position.
pub fn replace_todo(
    current: Option<&[TodoRecord]>,
    id: &str,
    replacement: TodoRecord,
) -> Option<Vec<TodoRecord>> {
    let current = current?;
    Some(
        current
            .iter()
            .map(|todo| {
                if todo.id == id {
                    replacement.clone()
                } else {
                    todo.clone()
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use time::macros::datetime;

    use super::*;
    use crate::client::invoker::{ApiCall, ApiInvoker, ApiRoute};

    fn todo(id: &str, completed: bool) -> TodoRecord {
        TodoRecord {
            id: id.to_string(),
            title: format!("Todo {id}"),
            completed,
            created_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[test]
    fn toggle_builds_a_new_list() {
        let todos = vec![todo("1", false), todo("2", false)];

        let next = toggle_todo(Some(&todos), "1", true).expect("present");

        assert_eq!(next, vec![todo("1", true), todo("2", false)]);
        assert!(!todos[0].completed);
    }

    #[test]
    fn transforms_leave_absent_lists_absent() {
        assert_eq!(toggle_todo(None, "1", true), None);
        assert_eq!(remove_todo(None, "1"), None);
        assert_eq!(prepend_todo(None, todo("1", false)), None);
        assert_eq!(replace_todo(None, "1", todo("1", true)), None);
    }

    #[test]
    fn toggle_on_empty_list_is_empty() {
        assert_eq!(toggle_todo(Some(&[]), "1", true), Some(vec![]));
    }

    #[test]
    fn remove_and_prepend_keep_order() {
        let todos = vec![todo("1", false), todo("2", false)];
        assert_eq!(remove_todo(Some(&todos), "1"), Some(vec![todo("2", false)]));
        assert_eq!(
            prepend_todo(Some(&todos), todo("3", false)).expect("present")[0].id,
            "3"
        );
    }

    struct ScriptedInvoker {
        response: Result<Value, u16>,
        seen: Mutex<Vec<ApiCall>>,
    }

    #[async_trait]
    impl ApiInvoker for ScriptedInvoker {
        async fn invoke(&self, call: ApiCall) -> Result<Value, InvokeError> {
            self.seen.lock().expect("seen lock").push(call);
            self.response.clone().map_err(|status| InvokeError::Status {
                status,
                code: None,
                message: "boom".to_string(),
            })
        }
    }

    fn mutations(
        response: Result<Value, u16>,
    ) -> (
        TodoMutations,
        Arc<QueryCache<TodoRecord>>,
        Arc<ScriptedInvoker>,
    ) {
        let invoker = Arc::new(ScriptedInvoker {
            response,
            seen: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(QueryCache::new());
        let mutations = TodoMutations::new(TodosApi::new(invoker.clone()), cache.clone());
        (mutations, cache, invoker)
    }

    #[tokio::test]
    async fn failed_toggle_restores_the_exact_snapshot() {
        let (mutations, cache, _) = mutations(Err(500));
        cache.set(QueryKey::Todos, vec![todo("1", false)]);
        let before = cache.peek(QueryKey::Todos).expect("seeded");
        let errored = Arc::new(Mutex::new(false));
        let flag = errored.clone();

        let result = mutations
            .toggle(
                "1",
                true,
                MutationCallbacks::new().on_error(move |_| *flag.lock().expect("flag") = true),
            )
            .await;

        assert!(result.is_err());
        assert!(*errored.lock().expect("flag"));
        let after = cache.peek(QueryKey::Todos).expect("restored");
        assert!(Arc::ptr_eq(&before, &after));
        assert!(cache.is_stale(QueryKey::Todos));
    }

    #[tokio::test]
    async fn successful_toggle_reconciles_with_server_row() {
        let server = json!({
            "id": "1",
            "title": "Renamed on server",
            "completed": true,
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let (mutations, cache, invoker) = mutations(Ok(server));
        cache.set(QueryKey::Todos, vec![todo("1", false), todo("2", false)]);

        let updated = mutations
            .toggle("1", true, MutationCallbacks::new())
            .await
            .expect("toggle");

        assert!(updated.completed);
        let cached = cache.peek(QueryKey::Todos).expect("cached");
        assert_eq!(cached[0].title, "Renamed on server");
        assert_eq!(cached[1], todo("2", false));

        let seen = invoker.seen.lock().expect("seen");
        assert_eq!(seen[0].route, ApiRoute::UpdateTodo);
        assert_eq!(seen[0].param_value("id"), Some("1"));
        assert_eq!(seen[0].body, Some(json!({"completed": true})));
    }

    #[tokio::test]
    async fn create_without_a_prior_fetch_does_not_synthesize_a_list() {
        let server = json!({
            "id": "7",
            "title": "New",
            "completed": false,
            "createdAt": "2024-01-02T00:00:00Z"
        });
        let (mutations, cache, _) = mutations(Ok(server));

        mutations
            .create("New", None, MutationCallbacks::new())
            .await
            .expect("create");

        assert!(cache.peek(QueryKey::Todos).is_none());
    }

    #[tokio::test]
    async fn create_swaps_the_provisional_row() {
        let server = json!({
            "id": "7",
            "title": "New",
            "completed": false,
            "createdAt": "2024-01-02T00:00:00Z"
        });
        let (mutations, cache, _) = mutations(Ok(server));
        cache.set(QueryKey::Todos, vec![todo("1", false)]);

        mutations
            .create("New", None, MutationCallbacks::new())
            .await
            .expect("create");

        let cached = cache.peek(QueryKey::Todos).expect("cached");
        let ids: Vec<&str> = cached.iter().map(|todo| todo.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "1"]);
    }

    #[tokio::test]
    async fn delete_keeps_optimistic_removal_and_notifies() {
        let (mutations, cache, _) = mutations(Ok(json!({"success": true})));
        cache.set(QueryKey::Todos, vec![todo("1", false), todo("2", false)]);
        let acknowledged = Arc::new(Mutex::new(None));
        let sink = acknowledged.clone();

        mutations
            .delete(
                "1",
                MutationCallbacks::new().on_success(move |ack: &SuccessResponse| {
                    *sink.lock().expect("sink") = Some(*ack);
                }),
            )
            .await
            .expect("delete");

        assert_eq!(*acknowledged.lock().expect("sink"), Some(SuccessResponse::OK));
        assert_eq!(
            *cache.peek(QueryKey::Todos).expect("cached"),
            vec![todo("2", false)]
        );
    }
}
