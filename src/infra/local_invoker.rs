//! In-process invoker used for server-side prefetch.
//!
//! Calls go straight to [`TodoRoutes`] instead of looping back over HTTP, but
//! failures surface with the same status and code the HTTP surface would use.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use todo_plugin_types::{CreateTodoRequest, UpdateTodoRequest};
use tracing::debug;

use crate::application::repos::RepoError;
use crate::application::todos::{
    CreateTodoCommand, TodoRouteError, TodoRoutes, UpdateTodoCommand,
};
use crate::client::invoker::{ApiCall, ApiInvoker, ApiRoute, InvokeError};
use crate::domain::entities::TodoPatch;
use crate::infra::http::api::error::codes;

#[derive(Clone)]
pub struct LocalInvoker {
    routes: Arc<TodoRoutes>,
}

impl LocalInvoker {
    pub fn new(routes: Arc<TodoRoutes>) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl ApiInvoker for LocalInvoker {
    async fn invoke(&self, call: ApiCall) -> Result<Value, InvokeError> {
        debug!(route = call.route.key(), "invoking api route in process");
        match call.route {
            ApiRoute::ListTodos => encode(self.routes.list().await.map_err(route_error)?),
            ApiRoute::CreateTodo => {
                let body: CreateTodoRequest = decode_body(&call)?;
                let command = CreateTodoCommand {
                    title: body.title,
                    completed: body.completed,
                };
                encode(self.routes.create(command).await.map_err(route_error)?)
            }
            ApiRoute::UpdateTodo => {
                let id = required_id(&call)?;
                let body: UpdateTodoRequest = decode_body(&call)?;
                let command = UpdateTodoCommand {
                    id,
                    patch: TodoPatch {
                        title: body.title,
                        completed: body.completed,
                    },
                };
                encode(self.routes.update(command).await.map_err(route_error)?)
            }
            ApiRoute::DeleteTodo => {
                let id = required_id(&call)?;
                encode(self.routes.delete(&id).await.map_err(route_error)?)
            }
        }
    }
}

fn required_id(call: &ApiCall) -> Result<String, InvokeError> {
    call.param_value("id")
        .map(str::to_string)
        .ok_or_else(|| InvokeError::MissingParam {
            route: call.route,
            param: "id".to_string(),
        })
}

fn decode_body<T: DeserializeOwned + Default>(call: &ApiCall) -> Result<T, InvokeError> {
    match &call.body {
        Some(body) => serde_json::from_value(body.clone()).map_err(InvokeError::Decode),
        None => Ok(T::default()),
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value, InvokeError> {
    serde_json::to_value(value).map_err(InvokeError::Encode)
}

fn route_error(err: TodoRouteError) -> InvokeError {
    let (status, code) = match &err {
        TodoRouteError::Validation(_) => (400, codes::INVALID_INPUT),
        TodoRouteError::NotFound => (404, codes::NOT_FOUND),
        TodoRouteError::Adapter(RepoError::InvalidInput { .. }) => (400, codes::INVALID_INPUT),
        TodoRouteError::Adapter(RepoError::Timeout) => (503, codes::STORAGE_TIMEOUT),
        TodoRouteError::Adapter(RepoError::Persistence(_)) => (500, codes::REPO),
    };
    InvokeError::Status {
        status,
        code: Some(code.to_string()),
        message: err.to_string(),
    }
}
