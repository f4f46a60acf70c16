//! User-facing actions of the todos pages: each one runs a mutation and
//! reports a localized notice.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::domain::entities::TodoRecord;

use super::invoker::InvokeError;
use super::mutations::{MutationCallbacks, TodoMutations};
use super::overrides::TodosPluginOverrides;
use super::routes::TodosClientPlugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast-style notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: String) -> Self {
        Self {
            level: NoticeLevel::Success,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: NoticeLevel::Error,
            message,
        }
    }
}

#[derive(Clone)]
pub struct TodoActions {
    mutations: TodoMutations,
    overrides: Arc<dyn TodosPluginOverrides>,
    list_href: String,
}

impl TodoActions {
    pub fn new(plugin: &TodosClientPlugin) -> Self {
        Self {
            mutations: plugin.mutations(),
            overrides: Arc::clone(plugin.overrides()),
            list_href: plugin.href("/todos"),
        }
    }

    pub async fn toggle(&self, todo: &TodoRecord) -> Notice {
        let strings = self.overrides.localization();
        let result = self
            .mutations
            .toggle(&todo.id, !todo.completed, MutationCallbacks::new())
            .await;
        match result {
            Ok(_) => Notice::success(strings.todos_toggle_success),
            Err(_) => Notice::error(strings.todos_toggle_error),
        }
    }

    pub async fn delete(&self, id: &str) -> Notice {
        let strings = self.overrides.localization();
        match self.mutations.delete(id, MutationCallbacks::new()).await {
            Ok(_) => Notice::success(strings.todos_delete_success),
            Err(_) => Notice::error(strings.todos_delete_error),
        }
    }

    /// Creates a todo, then navigates back to the list on success.
    pub async fn create(&self, title: &str) -> Notice {
        let strings = self.overrides.localization();
        let overrides = Arc::clone(&self.overrides);
        let list_href = self.list_href.clone();
        let callbacks = MutationCallbacks::new()
            .on_success(move |_: &TodoRecord| overrides.navigate(&list_href))
            .on_error(|err: &InvokeError| error!(error = %err, "failed to add todo"));

        match self.mutations.create(title, None, callbacks).await {
            Ok(_) => Notice::success(strings.todos_add_success),
            Err(_) => Notice::error(strings.todos_add_error),
        }
    }
}
