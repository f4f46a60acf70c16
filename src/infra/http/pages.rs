//! Server-side rendering of the todos pages.
//!
//! Every request gets its own [`QueryCache`]: the route's loader fills it,
//! the metadata and the page body read it, and its dehydrated form is
//! embedded in the document so the client starts from the same data.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use askama::Template;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use time::Duration;
use tracing::{debug, error};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::sitemap::sitemap_xml;
use crate::cache::QueryCache;
use crate::client::invoker::ApiInvoker;
use crate::client::lifecycle::{
    RouteContext, RouteError, RouteLifecycle, RouteState, RouteView, not_found_view,
};
use crate::client::overrides::TodosPluginOverrides;
use crate::client::routes::{
    ClientPlugin, ResolvedRoute, StackClient, TodosClientConfig, TodosClientPlugin,
    TodosRouteName,
};
use crate::presentation::views::{
    AddTodoTemplate, AddTodoView, DocumentView, ErrorPageView, ErrorTemplate, LayoutContext,
    LoadingTemplate, LoadingView, TemplateRenderError, TodosListTemplate, TodosListView,
    render_not_found_response, serialize_state, try_render_template,
};

const SOURCE: &str = "infra::http::pages";

#[derive(Clone)]
pub struct PagesState {
    pub config: TodosClientConfig,
    pub invoker: Arc<dyn ApiInvoker>,
    pub overrides: Arc<dyn TodosPluginOverrides>,
    pub stale_time: Duration,
}

impl PagesState {
    fn plugin(&self) -> Arc<TodosClientPlugin> {
        Arc::new(TodosClientPlugin::new(
            self.config.clone(),
            Arc::new(QueryCache::with_stale_time(self.stale_time)),
            Arc::clone(&self.invoker),
            Arc::clone(&self.overrides),
        ))
    }

    fn stack(&self, plugin: &Arc<TodosClientPlugin>) -> StackClient {
        let plugin: Arc<dyn ClientPlugin> = plugin.clone();
        StackClient::new(self.config.site_base_path.clone()).with_plugin(plugin)
    }
}

enum PageBody {
    TodosList(TodosListView),
    AddTodo(AddTodoView),
}

/// Renders the page at `uri`, relative to the site base path.
pub async fn render_page(State(state): State<PagesState>, uri: Uri) -> Response {
    let plugin = state.plugin();
    let stack = state.stack(&plugin);
    let overrides = plugin.overrides().as_ref();
    let strings = overrides.localization();

    let resolved = stack.get_route(uri.path());
    let Some((name, resolved)) = resolved.and_then(|resolved| {
        TodosRouteName::from_name(resolved.descriptor.name).map(|name| (name, resolved))
    }) else {
        debug!(path = uri.path(), "no todos route matches");
        let document = DocumentView::new(&strings.todos_not_found_title, &[]);
        return render_not_found_response(
            document,
            not_found_view(overrides, &state.config.site_base_path),
        );
    };

    let href = plugin.href(uri.path());
    let mut context = RouteContext::new(href.clone(), true);
    context.params = resolved.params.clone();
    let lifecycle = RouteLifecycle::new(name, context.clone());
    let composed = plugin.compose(name, context);

    // A panic in host overrides while the body is built fails this page only.
    let mut route_state = if lifecycle.before_render(overrides) {
        match AssertUnwindSafe(load_page(&plugin, name, &resolved))
            .catch_unwind()
            .await
        {
            Ok(body) => RouteState::Ready(body),
            Err(panic) => RouteState::Error(RouteError::Render(panic_message(panic.as_ref()))),
        }
    } else {
        RouteState::Error(RouteError::Prevented)
    };

    let meta = resolved.descriptor.meta();
    let mut document = DocumentView::new(&strings.todos_list_title, &meta);
    match serialize_state(&plugin.cache().dehydrate()) {
        Ok(json) => document = document.with_state(json),
        Err(err) => {
            route_state = RouteState::Error(RouteError::Render(format!(
                "page state could not be serialized: {err}"
            )));
        }
    }

    let fallback = PageFallback {
        route: name,
        href: &href,
        not_found_title: &strings.todos_not_found_title,
    };
    match fallback.respond(composed.view(route_state), document.clone()) {
        Ok(response) => response,
        Err(err) => {
            let failure = RouteError::Render(format!("{err}: {}", err.error));
            let view = composed.view(RouteState::Error(failure));
            fallback
                .respond(view, document)
                .unwrap_or_else(|err| HttpError::from(err).into_response())
        }
    }
}

/// Turns a composed route view into a response.
struct PageFallback<'a> {
    route: TodosRouteName,
    href: &'a str,
    not_found_title: &'a str,
}

impl PageFallback<'_> {
    fn respond(
        &self,
        view: RouteView<PageBody>,
        document: DocumentView,
    ) -> Result<Response, TemplateRenderError> {
        match view {
            RouteView::Page(PageBody::TodosList(view)) => html_response(
                TodosListTemplate {
                    view: LayoutContext::new(document, view),
                },
                StatusCode::OK,
            ),
            RouteView::Page(PageBody::AddTodo(view)) => html_response(
                AddTodoTemplate {
                    view: LayoutContext::new(document, view),
                },
                StatusCode::OK,
            ),
            RouteView::Loading(component) => html_response(
                LoadingTemplate {
                    view: LayoutContext::new(document, LoadingView::from(component)),
                },
                StatusCode::OK,
            ),
            RouteView::NotFound(view) => Ok(render_not_found_response(
                DocumentView::new(self.not_found_title, &[]),
                view,
            )),
            RouteView::Error(view) => {
                error!(
                    route = %self.route,
                    path = %self.href,
                    message = %view.message,
                    "page failed to render"
                );
                let document = DocumentView::new(&view.title, &[]);
                let detail = view.message.clone();
                let mut response = html_response(
                    ErrorTemplate {
                        view: LayoutContext::new(document, ErrorPageView::new(view, self.href)),
                    },
                    StatusCode::INTERNAL_SERVER_ERROR,
                )?;
                ErrorReport::from_message(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, detail)
                    .attach(&mut response);
                Ok(response)
            }
        }
    }
}

/// Text of a caught panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "page builder panicked".to_string())
}

fn html_response<T: Template>(
    template: T,
    status: StatusCode,
) -> Result<Response, TemplateRenderError> {
    try_render_template(template).map(|html| (status, html).into_response())
}

/// Runs the route's loader, then builds the body from the filled cache.
async fn load_page(
    plugin: &TodosClientPlugin,
    name: TodosRouteName,
    resolved: &ResolvedRoute,
) -> PageBody {
    resolved.descriptor.load().await;

    let overrides = plugin.overrides().as_ref();
    let strings = overrides.localization();
    match name {
        TodosRouteName::TodosList => {
            let todos = plugin.query().data().unwrap_or_default();
            PageBody::TodosList(TodosListView::new(
                &todos,
                overrides,
                &strings,
                &plugin.href("/todos/add"),
            ))
        }
        TodosRouteName::AddTodo => {
            PageBody::AddTodo(AddTodoView::new(overrides, &strings, &plugin.href("/todos")))
        }
    }
}

/// `GET /sitemap.xml`.
pub async fn sitemap(State(state): State<PagesState>) -> Response {
    let plugin = state.plugin();
    let body = sitemap_xml(&state.stack(&plugin).generate_sitemap());
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        body,
    )
        .into_response()
}
