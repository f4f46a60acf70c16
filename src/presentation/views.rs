use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::metadata::{MetaElement, document_title};
use crate::cache::DehydratedState;
use crate::client::lifecycle::{ErrorView, LoadingComponent, NotFoundView};
use crate::client::localization::TodosLocalization;
use crate::client::overrides::{LinkProps, TodosPluginOverrides};
use crate::domain::entities::TodoRecord;

/// Element id of the embedded dehydrated cache.
pub const STATE_SCRIPT_ID: &str = "__TODOS_STATE__";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn try_render_template<T: Template>(
    template: T,
) -> Result<Html<String>, TemplateRenderError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
    })
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    try_render_template(template).map_err(HttpError::from)
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Localized 404 page. Carries an [`ErrorReport`] for the response logger.
pub fn render_not_found_response(document: DocumentView, view: NotFoundView) -> Response {
    let view = LayoutContext::new(document, NotFoundPageView::from(view));
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Page not found",
    )
    .attach(&mut response);
    response
}

/// One `<meta>` tag.
#[derive(Clone)]
pub struct MetaTagView {
    pub attribute: &'static str,
    pub key: String,
    pub content: String,
}

impl From<&MetaElement> for MetaTagView {
    fn from(element: &MetaElement) -> Self {
        let (attribute, key) = element.attribute();
        Self {
            attribute,
            key: key.to_string(),
            content: element.content().to_string(),
        }
    }
}

/// Everything outside the page body: title, meta tags and hydration state.
#[derive(Clone)]
pub struct DocumentView {
    pub title: String,
    pub meta: Vec<MetaTagView>,
    pub state_script_id: &'static str,
    pub state_json: String,
}

impl DocumentView {
    pub fn new(fallback_title: &str, meta: &[MetaElement]) -> Self {
        Self {
            title: document_title(meta).unwrap_or(fallback_title).to_string(),
            meta: meta.iter().map(MetaTagView::from).collect(),
            state_script_id: STATE_SCRIPT_ID,
            state_json: String::from("{\"queries\":[]}"),
        }
    }

    pub fn with_state(self, state_json: String) -> Self {
        Self { state_json, ..self }
    }
}

/// JSON for an inline `<script>`; `</` is escaped so the payload cannot
/// close the element early.
pub fn serialize_state<T: Serialize>(
    state: &DehydratedState<T>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(state).map(|json| json.replace("</", "<\\/"))
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub document: DocumentView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(document: DocumentView, content: T) -> Self {
        Self { document, content }
    }
}

#[derive(Clone)]
pub struct TodoItemView {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl From<&TodoRecord> for TodoItemView {
    fn from(todo: &TodoRecord) -> Self {
        Self {
            id: todo.id.clone(),
            title: todo.title.clone(),
            completed: todo.completed,
        }
    }
}

#[derive(Clone)]
pub struct TodosListView {
    pub heading: String,
    pub description: String,
    pub todos: Vec<TodoItemView>,
    pub delete_label: String,
    pub empty_title: String,
    pub empty_description: String,
    pub add_link: LinkProps,
    pub add_button: LinkProps,
}

impl TodosListView {
    pub fn new(
        todos: &[TodoRecord],
        overrides: &dyn TodosPluginOverrides,
        strings: &TodosLocalization,
        add_href: &str,
    ) -> Self {
        Self {
            heading: strings.todos_list_title.clone(),
            description: strings.todos_list_description.clone(),
            todos: todos.iter().map(TodoItemView::from).collect(),
            delete_label: strings.todos_delete.clone(),
            empty_title: strings.todos_empty_title.clone(),
            empty_description: strings.todos_empty_description.clone(),
            add_link: overrides.link(LinkProps::new(add_href, strings.todos_add_link.clone())),
            add_button: overrides.link(LinkProps::new(add_href, strings.todos_add_button.clone())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }
}

#[derive(Clone)]
pub struct AddTodoView {
    pub heading: String,
    pub description: String,
    pub title_label: String,
    pub title_placeholder: String,
    pub save_label: String,
    pub saving_label: String,
    pub cancel: LinkProps,
}

impl AddTodoView {
    pub fn new(
        overrides: &dyn TodosPluginOverrides,
        strings: &TodosLocalization,
        list_href: &str,
    ) -> Self {
        Self {
            heading: strings.todos_add_title.clone(),
            description: strings.todos_add_description.clone(),
            title_label: strings.todos_form_title_label.clone(),
            title_placeholder: strings.todos_form_title_placeholder.clone(),
            save_label: strings.todos_form_save.clone(),
            saving_label: strings.todos_form_saving.clone(),
            cancel: overrides.link(LinkProps::new(list_href, strings.todos_form_cancel.clone())),
        }
    }
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub retry_label: String,
    pub retry_href: String,
}

impl ErrorPageView {
    pub fn new(view: ErrorView, retry_href: impl Into<String>) -> Self {
        Self {
            title: view.title,
            message: view.message,
            retry_label: view.retry_label,
            retry_href: retry_href.into(),
        }
    }
}

pub struct NotFoundPageView {
    pub title: String,
    pub description: String,
    pub back: LinkProps,
}

impl From<NotFoundView> for NotFoundPageView {
    fn from(view: NotFoundView) -> Self {
        Self {
            title: view.title,
            description: view.description,
            back: view.back,
        }
    }
}

pub struct LoadingView {
    pub variant: &'static str,
    pub rows: usize,
}

impl From<LoadingComponent> for LoadingView {
    fn from(component: LoadingComponent) -> Self {
        match component {
            LoadingComponent::Page => Self {
                variant: "page",
                rows: 1,
            },
            LoadingComponent::TodosList => Self {
                variant: "todos-list",
                rows: 3,
            },
            LoadingComponent::Form => Self {
                variant: "form",
                rows: 1,
            },
        }
    }
}

#[derive(Template)]
#[template(path = "todos_list.html")]
pub struct TodosListTemplate {
    pub view: LayoutContext<TodosListView>,
}

#[derive(Template)]
#[template(path = "add_todo.html")]
pub struct AddTodoTemplate {
    pub view: LayoutContext<AddTodoView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<NotFoundPageView>,
}

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub view: LayoutContext<LoadingView>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::cache::{DehydratedQuery, QueryKey};
    use crate::client::overrides::DefaultOverrides;

    fn todo(title: &str) -> TodoRecord {
        TodoRecord {
            id: "1".to_string(),
            title: title.to_string(),
            completed: true,
            created_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[test]
    fn state_json_cannot_close_the_script_tag() {
        let state = DehydratedState {
            queries: vec![DehydratedQuery {
                key: QueryKey::Todos,
                data: vec![todo("</script><script>alert(1)")],
                updated_at: datetime!(2024-01-01 00:00 UTC),
                stale: false,
            }],
        };

        let json = serialize_state(&state).expect("serialize");

        assert!(!json.contains("</script>"));
        assert!(json.contains("<\\/script>"));
    }

    #[test]
    fn list_page_renders_meta_and_items() {
        let meta = vec![
            MetaElement::name("title", "1 Todos"),
            MetaElement::property("og:type", "website"),
        ];
        let strings = TodosLocalization::default();
        let content = TodosListView::new(
            &[todo("Walk dog")],
            &DefaultOverrides,
            &strings,
            "/pages/todos/add",
        );
        let view = LayoutContext::new(DocumentView::new("Todos", &meta), content);

        let html = TodosListTemplate { view }.render().expect("render");

        assert!(html.contains("<title>1 Todos</title>"));
        assert!(html.contains(r#"<meta property="og:type" content="website">"#));
        assert!(html.contains("Walk dog"));
        assert!(html.contains(r#"href="/pages/todos/add""#));
        assert!(!html.contains("todos-empty"));
    }

    #[test]
    fn empty_list_shows_the_empty_state() {
        let strings = TodosLocalization::default();
        let content = TodosListView::new(&[], &DefaultOverrides, &strings, "/todos/add");
        let view = LayoutContext::new(DocumentView::new("Todos", &[]), content);

        let html = TodosListTemplate { view }.render().expect("render");

        assert!(html.contains("todos-empty"));
        assert!(html.contains(&strings.todos_empty_title));
    }

    #[test]
    fn titles_are_escaped() {
        let strings = TodosLocalization::default();
        let content =
            TodosListView::new(&[todo("<b>bold</b>")], &DefaultOverrides, &strings, "/todos/add");
        let view = LayoutContext::new(DocumentView::new("Todos", &[]), content);

        let html = TodosListTemplate { view }.render().expect("render");

        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn document_title_falls_back() {
        let document = DocumentView::new("Todos", &[]);
        assert_eq!(document.title, "Todos");
        assert_eq!(document.state_json, r#"{"queries":[]}"#);
    }
}
