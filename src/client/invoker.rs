//! Typed calls against the todos backend.
//!
//! Both the prefetch loader and the mutation hooks go through
//! [`ApiInvoker::invoke`], so transport concerns have one integration point.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use todo_plugin_types::{
    ApiErrorBody, CreateTodoRequest, SuccessResponse, TodoRecord, UpdateTodoRequest,
};
use tracing::debug;

const RELATIVE_BASE: &str = "http://invoker.local/";

/// Routes of the backend surface, each a verb plus a path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiRoute {
    ListTodos,
    CreateTodo,
    UpdateTodo,
    DeleteTodo,
}

impl ApiRoute {
    pub const ALL: [ApiRoute; 4] = [
        ApiRoute::ListTodos,
        ApiRoute::CreateTodo,
        ApiRoute::UpdateTodo,
        ApiRoute::DeleteTodo,
    ];

    pub fn method(&self) -> Method {
        match self {
            ApiRoute::ListTodos => Method::GET,
            ApiRoute::CreateTodo => Method::POST,
            ApiRoute::UpdateTodo => Method::PUT,
            ApiRoute::DeleteTodo => Method::DELETE,
        }
    }

    pub const fn template(&self) -> &'static str {
        match self {
            ApiRoute::ListTodos | ApiRoute::CreateTodo => "/todos",
            ApiRoute::UpdateTodo | ApiRoute::DeleteTodo => "/todos/:id",
        }
    }

    /// Verb-tagged key, e.g. `@put/todos/:id`.
    pub const fn key(&self) -> &'static str {
        match self {
            ApiRoute::ListTodos => "@get/todos",
            ApiRoute::CreateTodo => "@post/todos",
            ApiRoute::UpdateTodo => "@put/todos/:id",
            ApiRoute::DeleteTodo => "@delete/todos/:id",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.key() == key)
    }
}

impl fmt::Display for ApiRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("API base URL `{0}` cannot carry a path")]
    CannotBeBase(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("route `{route}` requires parameter `{param}`")]
    MissingParam { route: ApiRoute, param: String },
}

impl InvokeError {
    /// Authoritative absence, as opposed to a transient failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, InvokeError::Status { status: 404, .. })
    }
}

/// One invocation: a route, its path parameters and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub route: ApiRoute,
    pub params: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiCall {
    pub fn new(route: ApiRoute) -> Self {
        Self {
            route,
            params: Vec::new(),
            body: None,
        }
    }

    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Template segments with `:param` placeholders substituted, unencoded.
    pub fn segments(&self) -> Result<Vec<String>, InvokeError> {
        self.route
            .template()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => self
                    .param_value(name)
                    .map(str::to_string)
                    .ok_or_else(|| InvokeError::MissingParam {
                        route: self.route,
                        param: name.to_string(),
                    }),
                None => Ok(segment.to_string()),
            })
            .collect()
    }

    /// Relative path with parameters percent-encoded, e.g. `/todos/a%20b`.
    pub fn path(&self) -> Result<String, InvokeError> {
        let mut url = Url::parse(RELATIVE_BASE)?;
        url.path_segments_mut()
            .map_err(|_| InvokeError::CannotBeBase(RELATIVE_BASE.to_string()))?
            .clear()
            .extend(self.segments()?);
        Ok(url.path().to_string())
    }
}

#[async_trait]
pub trait ApiInvoker: Send + Sync {
    async fn invoke(&self, call: ApiCall) -> Result<Value, InvokeError>;
}

/// Invoker speaking HTTP to `{api_base_url}{api_base_path}`.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: Client,
    base: Url,
    base_path: Vec<String>,
}

impl HttpInvoker {
    pub fn new(api_base_url: &str, api_base_path: &str) -> Result<Self, InvokeError> {
        let base = Url::parse(api_base_url)?;
        if base.cannot_be_a_base() {
            return Err(InvokeError::CannotBeBase(api_base_url.to_string()));
        }
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        let base_path = api_base_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            client,
            base,
            base_path,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("todo-plugin/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, call: &ApiCall) -> Result<Url, InvokeError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| InvokeError::CannotBeBase(self.base.to_string()))?
            .pop_if_empty()
            .extend(&self.base_path)
            .extend(call.segments()?);
        Ok(url)
    }

    async fn handle(resp: Response) -> Result<Value, InvokeError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let (code, message) = match serde_json::from_slice::<ApiErrorBody>(&bytes) {
                Ok(body) => (Some(body.error.code), body.error.message),
                Err(_) => (None, String::from_utf8_lossy(&bytes).into_owned()),
            };
            return Err(InvokeError::Status {
                status: status.as_u16(),
                code,
                message,
            });
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(InvokeError::Decode)
    }
}

#[async_trait]
impl ApiInvoker for HttpInvoker {
    async fn invoke(&self, call: ApiCall) -> Result<Value, InvokeError> {
        let url = self.url(&call)?;
        debug!(route = call.route.key(), %url, "invoking api route");

        let mut req = self.client.request(call.route.method(), url);
        if let Some(body) = &call.body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        Self::handle(resp).await
    }
}

/// Typed facade over any [`ApiInvoker`].
#[derive(Clone)]
pub struct TodosApi {
    invoker: Arc<dyn ApiInvoker>,
}

impl TodosApi {
    pub fn new(invoker: Arc<dyn ApiInvoker>) -> Self {
        Self { invoker }
    }

    pub async fn list(&self) -> Result<Vec<TodoRecord>, InvokeError> {
        self.call(ApiCall::new(ApiRoute::ListTodos)).await
    }

    pub async fn create(&self, request: &CreateTodoRequest) -> Result<TodoRecord, InvokeError> {
        let body = serde_json::to_value(request).map_err(InvokeError::Encode)?;
        self.call(ApiCall::new(ApiRoute::CreateTodo).json(body))
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateTodoRequest,
    ) -> Result<TodoRecord, InvokeError> {
        let body = serde_json::to_value(request).map_err(InvokeError::Encode)?;
        self.call(ApiCall::new(ApiRoute::UpdateTodo).param("id", id).json(body))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<SuccessResponse, InvokeError> {
        self.call(ApiCall::new(ApiRoute::DeleteTodo).param("id", id))
            .await
    }

    async fn call<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, InvokeError> {
        let value = self.invoker.invoke(call).await?;
        serde_json::from_value(value).map_err(InvokeError::Decode)
    }
}
