pub mod api;
pub mod middleware;
pub mod pages;

pub use api::{ApiState, build_api_router};
pub use pages::PagesState;

use axum::{Router, middleware as axum_middleware, routing::get};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub api: ApiState,
    pub pages: PagesState,
    pub api_base_path: String,
    pub site_base_path: String,
}

/// Page routes relative to the site base path.
pub fn build_pages_router(state: PagesState) -> Router {
    Router::new()
        .route("/", get(pages::render_page))
        .route("/{*path}", get(pages::render_page))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}

/// Full host application: the API under its base path, the pages under
/// theirs and the sitemap at the root.
pub fn build_router(state: RouterState) -> Router {
    let RouterState {
        api,
        pages,
        api_base_path,
        site_base_path,
    } = state;

    let sitemap = Router::new()
        .route("/sitemap.xml", get(pages::sitemap))
        .with_state(pages.clone())
        .layer(axum_middleware::from_fn(log_responses));

    let router = mount(Router::new(), &api_base_path, build_api_router(api));
    mount(router, &site_base_path, build_pages_router(pages))
        .merge(sitemap)
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Nests `inner` under `base`, or merges it when `base` is the root.
fn mount(router: Router, base: &str, inner: Router) -> Router {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        router.merge(inner)
    } else {
        router.nest(base, inner)
    }
}
