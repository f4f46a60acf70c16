//! Route descriptors of the todos plugin and the host-side composer.
//!
//! A [`TodosClientPlugin`] owns the descriptors for one session (or one
//! server request): their loaders and metadata generators are bound to that
//! session's [`QueryCache`]. A [`StackClient`] collects plugins under a
//! shared base path, resolves request paths and aggregates sitemaps.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use time::OffsetDateTime;

use crate::application::metadata::{MetaElement, add_todo_meta, todos_list_meta};
use crate::application::sitemap::{SitemapEntry, canonical_url};
use crate::cache::{QueryCache, QueryKey};
use crate::domain::entities::TodoRecord;

use super::invoker::{ApiInvoker, HttpInvoker, InvokeError, TodosApi};
use super::lifecycle::{ComposedRoute, LoadingComponent, RouteContext, RouteLifecycle};
use super::loader::{RenderEnvironment, TodosLoader};
use super::mutations::TodoMutations;
use super::overrides::{OverrideRegistry, PLUGIN_NAME, TodosPluginOverrides};
use super::queries::TodosQuery;

pub const LIST_PRIORITY: f32 = 0.7;
pub const ADD_PRIORITY: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TodosRouteName {
    TodosList,
    AddTodo,
}

impl TodosRouteName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TodosRouteName::TodosList => "todosList",
            TodosRouteName::AddTodo => "addTodo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [TodosRouteName::TodosList, TodosRouteName::AddTodo]
            .into_iter()
            .find(|route| route.as_str() == name)
    }
}

impl fmt::Display for TodosRouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the component a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageComponent(pub &'static str);

impl PageComponent {
    pub const TODOS_LIST: PageComponent = PageComponent("TodosListPage");
    pub const ADD_TODO: PageComponent = PageComponent("AddTodoPage");
}

pub type LoaderFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
pub type MetaFn = Arc<dyn Fn() -> Vec<MetaElement> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SitemapContribution {
    pub priority: f32,
}

/// Static description of one addressable page. Never mutated after the
/// plugin is built.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub page: PageComponent,
    pub loading: LoadingComponent,
    pub loader: Option<LoaderFn>,
    pub meta: Option<MetaFn>,
    pub sitemap: Option<SitemapContribution>,
}

impl RouteDescriptor {
    /// Runs the loader, if any.
    pub async fn load(&self) {
        if let Some(loader) = &self.loader {
            loader().await;
        }
    }

    pub fn meta(&self) -> Vec<MetaElement> {
        self.meta.as_ref().map(|meta| meta()).unwrap_or_default()
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("page", &self.page)
            .field("loading", &self.loading)
            .field("has_loader", &self.loader.is_some())
            .field("has_meta", &self.meta.is_some())
            .field("sitemap", &self.sitemap)
            .finish()
    }
}

/// Static configuration of the client bundle.
#[derive(Debug, Clone)]
pub struct TodosClientConfig {
    pub api_base_url: String,
    pub api_base_path: String,
    pub site_base_url: String,
    pub site_base_path: String,
    pub environment: RenderEnvironment,
}

/// What a host needs from any plugin it composes.
pub trait ClientPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn routes(&self) -> &[RouteDescriptor];

    fn sitemap(&self) -> Vec<SitemapEntry>;
}

pub struct TodosClientPlugin {
    config: TodosClientConfig,
    cache: Arc<QueryCache<TodoRecord>>,
    api: TodosApi,
    overrides: Arc<dyn TodosPluginOverrides>,
    routes: Vec<RouteDescriptor>,
}

impl TodosClientPlugin {
    pub fn new(
        config: TodosClientConfig,
        cache: Arc<QueryCache<TodoRecord>>,
        invoker: Arc<dyn ApiInvoker>,
        overrides: Arc<dyn TodosPluginOverrides>,
    ) -> Self {
        let api = TodosApi::new(invoker);
        let routes = build_routes(&config, &cache, &api);
        Self {
            config,
            cache,
            api,
            overrides,
            routes,
        }
    }

    /// Uses an [`HttpInvoker`] against the configured API base.
    pub fn connect(
        config: TodosClientConfig,
        cache: Arc<QueryCache<TodoRecord>>,
        overrides: Arc<dyn TodosPluginOverrides>,
    ) -> Result<Self, InvokeError> {
        let invoker = HttpInvoker::new(&config.api_base_url, &config.api_base_path)?;
        Ok(Self::new(config, cache, Arc::new(invoker), overrides))
    }

    pub fn from_registry(
        config: TodosClientConfig,
        cache: Arc<QueryCache<TodoRecord>>,
        invoker: Arc<dyn ApiInvoker>,
        registry: &OverrideRegistry,
    ) -> Self {
        Self::new(config, cache, invoker, registry.todos())
    }

    pub fn config(&self) -> &TodosClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<QueryCache<TodoRecord>> {
        &self.cache
    }

    pub fn overrides(&self) -> &Arc<dyn TodosPluginOverrides> {
        &self.overrides
    }

    pub fn query(&self) -> TodosQuery {
        TodosQuery::new(self.api.clone(), Arc::clone(&self.cache))
    }

    pub fn mutations(&self) -> TodoMutations {
        TodoMutations::new(self.api.clone(), Arc::clone(&self.cache))
    }

    pub fn loader(&self) -> TodosLoader {
        TodosLoader::new(
            self.api.clone(),
            Arc::clone(&self.cache),
            self.config.environment,
        )
    }

    pub fn route(&self, name: TodosRouteName) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|route| route.name == name.as_str())
    }

    /// Site-relative href of a plugin path, e.g. `/pages/todos`.
    pub fn href(&self, path: &str) -> String {
        let href = canonical_url("", &self.config.site_base_path, path);
        if href.is_empty() { "/".to_string() } else { href }
    }

    pub fn lifecycle(&self, name: TodosRouteName, path: &str) -> RouteLifecycle {
        RouteLifecycle::new(
            name,
            RouteContext::new(path, self.config.environment.is_ssr()),
        )
    }

    pub fn compose(&self, name: TodosRouteName, context: RouteContext) -> ComposedRoute {
        let loading = self
            .route(name)
            .map_or(LoadingComponent::Page, |route| route.loading);
        ComposedRoute {
            route: name,
            loading,
            context,
            base_path: self.config.site_base_path.clone(),
            overrides: Arc::clone(&self.overrides),
        }
    }
}

impl ClientPlugin for TodosClientPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// One entry per route with a contribution, stamped now.
    fn sitemap(&self) -> Vec<SitemapEntry> {
        let now = OffsetDateTime::now_utc();
        self.routes
            .iter()
            .filter_map(|route| {
                route.sitemap.map(|contribution| SitemapEntry {
                    url: canonical_url(
                        &self.config.site_base_url,
                        &self.config.site_base_path,
                        route.path,
                    ),
                    last_modified: now,
                    priority: contribution.priority,
                })
            })
            .collect()
    }
}

fn build_routes(
    config: &TodosClientConfig,
    cache: &Arc<QueryCache<TodoRecord>>,
    api: &TodosApi,
) -> Vec<RouteDescriptor> {
    let loader = TodosLoader::new(api.clone(), Arc::clone(cache), config.environment);
    let list_loader: LoaderFn = Arc::new(move || {
        let loader = loader.clone();
        async move {
            loader.load().await;
        }
        .boxed()
    });

    let list_url = canonical_url(&config.site_base_url, &config.site_base_path, "/todos");
    let list_cache = Arc::clone(cache);
    let list_meta: MetaFn = Arc::new(move || {
        let count = list_cache
            .peek(QueryKey::Todos)
            .map_or(0, |todos| todos.len());
        todos_list_meta(count, &list_url)
    });

    let add_url = canonical_url(&config.site_base_url, &config.site_base_path, "/todos/add");
    let add_meta: MetaFn = Arc::new(move || add_todo_meta(&add_url));

    vec![
        RouteDescriptor {
            name: TodosRouteName::TodosList.as_str(),
            path: "/todos",
            page: PageComponent::TODOS_LIST,
            loading: LoadingComponent::TodosList,
            loader: Some(list_loader),
            meta: Some(list_meta),
            sitemap: Some(SitemapContribution {
                priority: LIST_PRIORITY,
            }),
        },
        RouteDescriptor {
            name: TodosRouteName::AddTodo.as_str(),
            path: "/todos/add",
            page: PageComponent::ADD_TODO,
            loading: LoadingComponent::Form,
            loader: None,
            meta: Some(add_meta),
            sitemap: Some(SitemapContribution {
                priority: ADD_PRIORITY,
            }),
        },
    ]
}

/// A descriptor matched against a concrete path.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub plugin: &'static str,
    pub descriptor: RouteDescriptor,
    pub params: BTreeMap<String, String>,
}

/// Host-side registry of composed plugins sharing one base path.
pub struct StackClient {
    base_path: String,
    plugins: Vec<Arc<dyn ClientPlugin>>,
}

impl StackClient {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            plugins: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn ClientPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn plugins(&self) -> &[Arc<dyn ClientPlugin>] {
        &self.plugins
    }

    /// Resolves a path relative to the base path. The first plugin, then
    /// the first route, in registration order wins.
    pub fn get_route(&self, path: &str) -> Option<ResolvedRoute> {
        let path = normalize_path(path);
        self.plugins.iter().find_map(|plugin| {
            plugin.routes().iter().find_map(|descriptor| {
                match_path(descriptor.path, &path).map(|params| ResolvedRoute {
                    plugin: plugin.name(),
                    descriptor: descriptor.clone(),
                    params,
                })
            })
        })
    }

    pub fn generate_sitemap(&self) -> Vec<SitemapEntry> {
        self.plugins
            .iter()
            .flat_map(|plugin| plugin.sitemap())
            .collect()
    }
}

/// Leading slash, no trailing slash, no query or fragment; empty becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn match_path(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let mut pattern_segments = pattern.split('/').filter(|segment| !segment.is_empty());
    let mut path_segments = path.split('/').filter(|segment| !segment.is_empty());
    let mut params = BTreeMap::new();
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if let Some(name) = expected.strip_prefix(':') {
                    params.insert(name.to_string(), actual.to_string());
                } else if expected != actual {
                    return None;
                }
            }
            _ => return None,
        }
    }
}
