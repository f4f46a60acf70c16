use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::Value;
use time::macros::datetime;
use tower::ServiceExt;

use todo_plugin::application::todos::TodoRoutes;
use todo_plugin::cache::{QueryCache, QueryKey};
use todo_plugin::client::{
    ApiCall, ApiInvoker, DefaultOverrides, InvokeError, MutationCallbacks, RenderEnvironment,
    TodosClientConfig, TodosClientPlugin,
};
use todo_plugin::domain::entities::TodoRecord;
use todo_plugin::infra::http::{ApiState, build_api_router};
use todo_plugin::infra::memory::MemoryAdapter;

struct Unreachable;

#[async_trait]
impl ApiInvoker for Unreachable {
    async fn invoke(&self, _call: ApiCall) -> Result<Value, InvokeError> {
        Err(InvokeError::Status {
            status: 500,
            code: None,
            message: "unreachable".to_string(),
        })
    }
}

fn plugin() -> TodosClientPlugin {
    TodosClientPlugin::new(
        TodosClientConfig {
            api_base_url: "http://localhost:3000".to_string(),
            api_base_path: "/api/data".to_string(),
            site_base_url: "https://example.com".to_string(),
            site_base_path: "/pages".to_string(),
            environment: RenderEnvironment::Server,
        },
        Arc::new(QueryCache::new()),
        Arc::new(Unreachable),
        Arc::new(DefaultOverrides),
    )
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Query cache miss, then fallback seeding, then hit.
    let plugin = plugin();
    assert!(plugin.query().data().is_none());
    plugin.loader().load().await;
    assert!(plugin.query().data().is_some());

    // Rollback of a failed optimistic toggle.
    plugin.cache().set(
        QueryKey::Todos,
        vec![TodoRecord {
            id: "1".to_string(),
            title: "Walk dog".to_string(),
            completed: false,
            created_at: datetime!(2024-01-01 00:00 UTC),
        }],
    );
    let result = plugin
        .mutations()
        .toggle("1", true, MutationCallbacks::new())
        .await;
    assert!(result.is_err());

    // Request latency through the API router.
    let router = build_api_router(ApiState {
        todos: Arc::new(TodoRoutes::new(Arc::new(MemoryAdapter::new()))),
    });
    let request = Request::builder()
        .method(Method::GET)
        .uri("/todos")
        .body(Body::empty())
        .expect("request should build");
    let response = router.oneshot(request).await.expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "todos_query_cache_hit_total",
        "todos_query_cache_miss_total",
        "todos_loader_fallback_total",
        "todos_mutation_rollback_total",
        "todos_http_request_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
