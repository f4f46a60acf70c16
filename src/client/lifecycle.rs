//! Route mount lifecycle and fallback selection.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::overrides::{LinkProps, TodosPluginOverrides};
use super::routes::TodosRouteName;

/// What lifecycle hooks and error callbacks learn about the render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteContext {
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub is_ssr: bool,
}

impl RouteContext {
    pub fn new(path: impl Into<String>, is_ssr: bool) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
            is_ssr,
        }
    }
}

/// Why a matched route shows a fallback instead of its page. Load failures
/// never get here: the loader degrades to an empty list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("rendering was prevented by a before-render hook")]
    Prevented,
    #[error("failed to render page: {0}")]
    Render(String),
}

/// Runs the route's before-render hook once per mount.
pub struct RouteLifecycle {
    route: TodosRouteName,
    context: RouteContext,
    allowed: OnceLock<bool>,
}

impl RouteLifecycle {
    pub fn new(route: TodosRouteName, context: RouteContext) -> Self {
        Self {
            route,
            context,
            allowed: OnceLock::new(),
        }
    }

    pub fn context(&self) -> &RouteContext {
        &self.context
    }

    /// First call runs the hook; later calls return the recorded answer.
    pub fn before_render(&self, overrides: &dyn TodosPluginOverrides) -> bool {
        *self.allowed.get_or_init(|| {
            let allowed = match self.route {
                TodosRouteName::TodosList => {
                    overrides.on_before_todos_list_page_rendered(&self.context)
                }
                TodosRouteName::AddTodo => overrides.on_before_add_todo_page_rendered(&self.context),
            };
            debug!(route = %self.route, path = %self.context.path, allowed, "before-render hook");
            allowed
        })
    }
}

/// Asynchronously resolved page content.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteState<T> {
    Loading,
    Ready(T),
    Error(RouteError),
}

/// Placeholder shown while a route is loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadingComponent {
    /// Generic whole-page skeleton.
    Page,
    TodosList,
    Form,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub title: String,
    pub message: String,
    pub retry_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundView {
    pub title: String,
    pub description: String,
    pub back: LinkProps,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteView<T> {
    Page(T),
    Loading(LoadingComponent),
    Error(ErrorView),
    NotFound(NotFoundView),
}

/// A route wrapped with its fallbacks.
pub struct ComposedRoute {
    pub route: TodosRouteName,
    pub loading: LoadingComponent,
    pub context: RouteContext,
    pub base_path: String,
    pub overrides: Arc<dyn TodosPluginOverrides>,
}

impl ComposedRoute {
    /// Picks what to show for `state`. Render failures are reported to
    /// `on_route_error` first; a prevented render is not an error.
    pub fn view<T>(&self, state: RouteState<T>) -> RouteView<T> {
        match state {
            RouteState::Loading => RouteView::Loading(self.loading),
            RouteState::Ready(page) => RouteView::Page(page),
            RouteState::Error(RouteError::Prevented) => RouteView::NotFound(self.not_found()),
            RouteState::Error(err) => {
                warn!(route = %self.route, path = %self.context.path, error = %err, "route error");
                self.overrides.on_route_error(self.route, &err, &self.context);
                RouteView::Error(self.error_view(&err))
            }
        }
    }

    fn error_view(&self, err: &RouteError) -> ErrorView {
        let strings = self.overrides.localization();
        ErrorView {
            title: strings.todos_error_title,
            message: err.to_string(),
            retry_label: strings.todos_error_try_again,
        }
    }

    fn not_found(&self) -> NotFoundView {
        not_found_view(self.overrides.as_ref(), &self.base_path)
    }
}

/// Localized not-found page linking back to the list.
pub fn not_found_view(overrides: &dyn TodosPluginOverrides, base_path: &str) -> NotFoundView {
    let strings = overrides.localization();
    let href = format!("{}/todos", base_path.trim_end_matches('/'));
    NotFoundView {
        title: strings.todos_not_found_title,
        description: strings.todos_not_found_description,
        back: overrides.link(LinkProps::new(href, strings.todos_not_found_back)),
    }
}
