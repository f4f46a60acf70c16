use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use time::{Duration, macros::datetime};
use tower::ServiceExt;

use todo_plugin::application::todos::TodoRoutes;
use todo_plugin::client::lifecycle::{RouteContext, RouteError};
use todo_plugin::client::overrides::LinkProps;
use todo_plugin::client::{
    DefaultOverrides, RenderEnvironment, TodosClientConfig, TodosPluginOverrides, TodosRouteName,
};
use todo_plugin::domain::entities::TodoRecord;
use todo_plugin::infra::http::{
    ApiState, PagesState, RouterState, build_api_router, build_router,
};
use todo_plugin::infra::local_invoker::LocalInvoker;
use todo_plugin::infra::memory::MemoryAdapter;

fn routes_with(rows: Vec<TodoRecord>) -> Arc<TodoRoutes> {
    Arc::new(TodoRoutes::new(Arc::new(MemoryAdapter::with_rows(rows))))
}

fn api(routes: Arc<TodoRoutes>) -> Router {
    build_api_router(ApiState { todos: routes })
}

fn host(routes: Arc<TodoRoutes>, overrides: Arc<dyn TodosPluginOverrides>) -> Router {
    let pages = PagesState {
        config: TodosClientConfig {
            api_base_url: "http://localhost:3000".to_string(),
            api_base_path: "/api/data".to_string(),
            site_base_url: "https://example.com".to_string(),
            site_base_path: "/pages".to_string(),
            environment: RenderEnvironment::Server,
        },
        invoker: Arc::new(LocalInvoker::new(Arc::clone(&routes))),
        overrides,
        stale_time: Duration::seconds(60),
    };
    build_router(RouterState {
        api: ApiState { todos: routes },
        pages,
        api_base_path: "/api/data".to_string(),
        site_base_path: "/pages".to_string(),
    })
}

fn record(id: &str, title: &str, created_at: time::OffsetDateTime) -> TodoRecord {
    TodoRecord {
        id: id.to_string(),
        title: title.to_string(),
        completed: false,
        created_at,
    }
}

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn list_returns_newest_first() {
    let routes = routes_with(vec![
        record("a", "Older", datetime!(2024-01-01 00:00 UTC)),
        record("b", "Newer", datetime!(2024-02-01 00:00 UTC)),
    ]);

    let (status, body) = send(api(routes), Method::GET, "/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body[0]["id"], "b");
    assert_eq!(body[1]["id"], "a");
    assert_eq!(body[0]["createdAt"], "2024-02-01T00:00:00Z");
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let (status, body) = send(api(routes_with(Vec::new())), Method::GET, "/todos", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));
}

#[tokio::test]
async fn create_returns_201_with_defaults() {
    let routes = routes_with(Vec::new());

    let (status, body) = send(
        api(Arc::clone(&routes)),
        Method::POST,
        "/todos",
        Some(json!({"title": "Buy groceries"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let body = json_body(&body);
    assert_eq!(body["title"], "Buy groceries");
    assert_eq!(body["completed"], false);
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

    let listed = routes.list().await.expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn create_without_title_is_rejected() {
    let (status, body) = send(
        api(routes_with(Vec::new())),
        Method::POST,
        "/todos",
        Some(json!({"completed": true})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/todos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");

    let response = api(routes_with(Vec::new()))
        .oneshot(request)
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_applies_partial_patch() {
    let routes = routes_with(vec![record("1", "Walk dog", datetime!(2024-01-01 00:00 UTC))]);

    let (status, body) = send(
        api(routes),
        Method::PUT,
        "/todos/1",
        Some(json!({"completed": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["completed"], true);
    assert_eq!(body["title"], "Walk dog");
    assert_eq!(body["createdAt"], "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn update_of_missing_todo_is_404() {
    let (status, body) = send(
        api(routes_with(Vec::new())),
        Method::PUT,
        "/todos/missing",
        Some(json!({"completed": true})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body)["error"]["message"], "Todo not found");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let routes = routes_with(vec![record("1", "Walk dog", datetime!(2024-01-01 00:00 UTC))]);

    for _ in 0..2 {
        let (status, body) =
            send(api(Arc::clone(&routes)), Method::DELETE, "/todos/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"success": true}));
    }
    assert!(routes.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn host_mounts_api_under_its_base_path() {
    let routes = routes_with(vec![record("1", "Walk dog", datetime!(2024-01-01 00:00 UTC))]);
    let router = host(routes, Arc::new(DefaultOverrides));

    let (status, body) = send(router.clone(), Method::GET, "/api/data/todos", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)[0]["title"], "Walk dog");

    let (status, _) = send(router, Method::GET, "/todos", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_page_is_prefetched_and_dehydrated() {
    let routes = routes_with(vec![
        record("1", "Walk dog", datetime!(2024-01-01 00:00 UTC)),
        record("2", "Buy milk", datetime!(2024-01-02 00:00 UTC)),
    ]);

    let (status, body) = send(
        host(routes, Arc::new(DefaultOverrides)),
        Method::GET,
        "/pages/todos",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).expect("utf-8");
    assert!(html.contains("<title>2 Todos</title>"));
    assert!(html.contains(r#"content="https://example.com/pages/todos""#));
    assert!(html.contains("Walk dog"));
    assert!(html.contains(r#""key":"todos""#));
    assert!(html.contains("Buy milk"));
}

#[tokio::test]
async fn add_page_renders_the_form() {
    let (status, body) = send(
        host(routes_with(Vec::new()), Arc::new(DefaultOverrides)),
        Method::GET,
        "/pages/todos/add/",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).expect("utf-8");
    assert!(html.contains("<title>Add Todo</title>"));
    assert!(html.contains(r#"href="/pages/todos""#));
    assert!(html.contains(r#"{"queries":[]}"#));
}

#[tokio::test]
async fn unknown_page_is_the_localized_404() {
    let (status, body) = send(
        host(routes_with(Vec::new()), Arc::new(DefaultOverrides)),
        Method::GET,
        "/pages/todos/42/edit",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let html = String::from_utf8(body).expect("utf-8");
    assert!(html.contains(r#"href="/pages/todos""#));
}

struct Gatekeeper;

impl TodosPluginOverrides for Gatekeeper {
    fn on_before_add_todo_page_rendered(&self, _context: &RouteContext) -> bool {
        false
    }
}

#[tokio::test]
async fn prevented_page_renders_not_found() {
    let router = host(routes_with(Vec::new()), Arc::new(Gatekeeper));

    let (status, _) = send(router.clone(), Method::GET, "/pages/todos/add", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(router, Method::GET, "/pages/todos", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[derive(Default)]
struct BrokenAddLink {
    errors: Mutex<Vec<(TodosRouteName, RouteError, bool)>>,
}

impl TodosPluginOverrides for BrokenAddLink {
    fn link(&self, props: LinkProps) -> LinkProps {
        if props.href.ends_with("/todos/add") {
            panic!("add link crashed");
        }
        props
    }

    fn on_route_error(&self, route: TodosRouteName, error: &RouteError, context: &RouteContext) {
        self.errors
            .lock()
            .expect("errors lock")
            .push((route, error.clone(), context.is_ssr));
    }
}

#[tokio::test]
async fn render_failure_reports_route_error_from_the_server() {
    let overrides = Arc::new(BrokenAddLink::default());
    let router = host(routes_with(Vec::new()), overrides.clone());

    let (status, body) = send(router, Method::GET, "/pages/todos", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let html = String::from_utf8(body).expect("utf-8");
    assert!(html.contains("Try again"));
    assert!(html.contains(r#"href="/pages/todos""#));

    let errors = overrides.errors.lock().expect("errors lock");
    assert_eq!(errors.len(), 1);
    let (route, error, is_ssr) = &errors[0];
    assert_eq!(*route, TodosRouteName::TodosList);
    assert_eq!(*error, RouteError::Render("add link crashed".to_string()));
    assert!(*is_ssr);
}

#[tokio::test]
async fn sitemap_lists_both_pages() {
    let (status, body) = send(
        host(routes_with(Vec::new()), Arc::new(DefaultOverrides)),
        Method::GET,
        "/sitemap.xml",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body).expect("utf-8");
    assert!(xml.contains("<loc>https://example.com/pages/todos</loc>"));
    assert!(xml.contains("<loc>https://example.com/pages/todos/add</loc>"));
    assert!(xml.contains("<priority>0.7</priority>"));
}
