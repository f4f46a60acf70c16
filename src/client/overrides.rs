//! Host customization points.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::cache::lock::{rw_read, rw_write};

use super::lifecycle::{RouteContext, RouteError};
use super::localization::TodosLocalization;
use super::routes::TodosRouteName;

/// Name under which the host registers this plugin's overrides.
pub const PLUGIN_NAME: &str = "todos";

const SOURCE: &str = "client::overrides";

/// Navigation link as the pages request it. The host may rewrite any part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProps {
    pub href: String,
    pub label: String,
    pub class_name: Option<String>,
}

impl LinkProps {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
            class_name: None,
        }
    }
}

/// Customization supplied by the host and read on every render.
///
/// Every method has a default, so hosts implement only what they change.
pub trait TodosPluginOverrides: Send + Sync {
    /// Navigation primitive used for every in-plugin link.
    fn link(&self, props: LinkProps) -> LinkProps {
        props
    }

    /// Programmatic navigation, e.g. after a todo is created. No-op unless
    /// the host provides one.
    fn navigate(&self, _path: &str) {}

    fn localization(&self) -> TodosLocalization {
        TodosLocalization::default()
    }

    fn on_route_error(&self, _route: TodosRouteName, _error: &RouteError, _context: &RouteContext) {
    }

    /// Returning `false` prevents the list page from rendering.
    fn on_before_todos_list_page_rendered(&self, _context: &RouteContext) -> bool {
        true
    }

    /// Returning `false` prevents the add page from rendering.
    fn on_before_add_todo_page_rendered(&self, _context: &RouteContext) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOverrides;

impl TodosPluginOverrides for DefaultOverrides {}

/// Host-side lookup of plugin overrides keyed by plugin name.
///
/// Values are stored type-erased; each plugin asks for its own type.
#[derive(Default)]
pub struct OverrideRegistry {
    entries: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or swaps the overrides for `plugin`.
    pub fn register<T: Any + Send + Sync>(&self, plugin: impl Into<String>, overrides: T) {
        let plugin = plugin.into();
        debug!(plugin = %plugin, "registering plugin overrides");
        rw_write(&self.entries, SOURCE, "register").insert(plugin, Arc::new(overrides));
    }

    pub fn get<T: Any + Clone>(&self, plugin: &str) -> Option<T> {
        rw_read(&self.entries, SOURCE, "get")
            .get(plugin)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Registers the todos plugin's overrides under [`PLUGIN_NAME`].
    pub fn register_todos(&self, overrides: impl TodosPluginOverrides + 'static) {
        let overrides: Arc<dyn TodosPluginOverrides> = Arc::new(overrides);
        self.register(PLUGIN_NAME, overrides);
    }

    /// Overrides registered under [`PLUGIN_NAME`], or the defaults.
    pub fn todos(&self) -> Arc<dyn TodosPluginOverrides> {
        let entries = rw_read(&self.entries, SOURCE, "todos");
        let Some(value) = entries.get(PLUGIN_NAME) else {
            return Arc::new(DefaultOverrides);
        };
        match value.downcast_ref::<Arc<dyn TodosPluginOverrides>>() {
            Some(overrides) => Arc::clone(overrides),
            None => {
                warn!(
                    plugin = PLUGIN_NAME,
                    "registered overrides are not todos overrides, using defaults; \
                     register them with `register_todos`"
                );
                Arc::new(DefaultOverrides)
            }
        }
    }
}

impl<T: TodosPluginOverrides + ?Sized> TodosPluginOverrides for Arc<T> {
    fn link(&self, props: LinkProps) -> LinkProps {
        (**self).link(props)
    }

    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }

    fn localization(&self) -> TodosLocalization {
        (**self).localization()
    }

    fn on_route_error(&self, route: TodosRouteName, error: &RouteError, context: &RouteContext) {
        (**self).on_route_error(route, error, context)
    }

    fn on_before_todos_list_page_rendered(&self, context: &RouteContext) -> bool {
        (**self).on_before_todos_list_page_rendered(context)
    }

    fn on_before_add_todo_page_rendered(&self, context: &RouteContext) -> bool {
        (**self).on_before_add_todo_page_rendered(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Renamed;

    impl TodosPluginOverrides for Renamed {
        fn localization(&self) -> TodosLocalization {
            TodosLocalization {
                todos_list_title: "Tasks".into(),
                ..Default::default()
            }
        }
    }

    #[test]
    fn missing_overrides_fall_back_to_defaults() {
        let registry = OverrideRegistry::new();
        let overrides = registry.todos();
        assert_eq!(overrides.localization().todos_list_title, "Todos");
        assert_eq!(
            overrides.link(LinkProps::new("/todos", "Todos")).href,
            "/todos"
        );
    }

    #[test]
    fn registered_overrides_are_found_by_plugin_name() {
        let registry = OverrideRegistry::new();
        registry.register_todos(Renamed);

        assert_eq!(registry.todos().localization().todos_list_title, "Tasks");
        assert!(registry.get::<Arc<dyn TodosPluginOverrides>>("blog").is_none());
    }

    #[test]
    fn shared_overrides_can_be_registered() {
        let registry = OverrideRegistry::new();
        let shared = Arc::new(Renamed);
        registry.register_todos(Arc::clone(&shared));

        assert_eq!(registry.todos().localization().todos_list_title, "Tasks");

        let erased: Arc<dyn TodosPluginOverrides> = shared;
        registry.register(PLUGIN_NAME, erased);
        assert_eq!(registry.todos().localization().todos_list_title, "Tasks");
    }

    #[test]
    fn untyped_registration_falls_back_to_defaults() {
        let registry = OverrideRegistry::new();
        registry.register(PLUGIN_NAME, Renamed);

        assert_eq!(registry.todos().localization().todos_list_title, "Todos");
    }

    #[test]
    fn lookup_with_the_wrong_type_yields_nothing() {
        let registry = OverrideRegistry::new();
        registry.register("counter", 3_u32);
        assert_eq!(registry.get::<u32>("counter"), Some(3));
        assert_eq!(registry.get::<String>("counter"), None);
    }
}
