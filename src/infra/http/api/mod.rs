pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, put},
};

use crate::infra::http::middleware::log_responses;

/// Todo resource routes, relative to the API base path.
pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/{id}",
            put(handlers::update_todo).delete(handlers::delete_todo),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}
