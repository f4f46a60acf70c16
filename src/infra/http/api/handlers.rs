//! Todo resource handlers and error conversion.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use todo_plugin_types::{CreateTodoRequest, UpdateTodoRequest};

use crate::application::repos::RepoError;
use crate::application::todos::{CreateTodoCommand, TodoRouteError, UpdateTodoCommand};
use crate::domain::entities::TodoPatch;

use super::error::{ApiError, codes};
use super::state::ApiState;

pub async fn list_todos(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let todos = state.todos.list().await.map_err(todo_to_api)?;
    Ok(Json(todos))
}

pub async fn create_todo(
    State(state): State<ApiState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;
    let command = CreateTodoCommand {
        title: payload.title,
        completed: payload.completed,
    };

    let created = state.todos.create(command).await.map_err(todo_to_api)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_todo(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;
    let command = UpdateTodoCommand {
        id,
        patch: TodoPatch {
            title: payload.title,
            completed: payload.completed,
        },
    };

    let updated = state.todos.update(command).await.map_err(todo_to_api)?;
    Ok(Json(updated))
}

pub async fn delete_todo(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ack = state.todos.delete(&id).await.map_err(todo_to_api)?;
    Ok(Json(ack))
}

pub(crate) fn todo_to_api(err: TodoRouteError) -> ApiError {
    match err {
        TodoRouteError::Validation(domain) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid todo",
            Some(domain.to_string()),
        ),
        TodoRouteError::NotFound => ApiError::not_found("Todo not found"),
        TodoRouteError::Adapter(repo) => repo_to_api(repo),
    }
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STORAGE_TIMEOUT,
            "Storage timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

fn json_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid JSON body", Some(rejection.body_text()))
}
