//! Client route bundle: invoker, query cache consumers, optimistic
//! mutations and the route descriptors a host composes.

pub mod actions;
pub mod invoker;
pub mod lifecycle;
pub mod loader;
pub mod localization;
pub mod mutations;
pub mod overrides;
pub mod queries;
pub mod routes;

pub use invoker::{ApiCall, ApiInvoker, ApiRoute, HttpInvoker, InvokeError, TodosApi};
pub use loader::{RenderEnvironment, TodosLoader};
pub use mutations::{MutationCallbacks, TodoMutations};
pub use overrides::{DefaultOverrides, OverrideRegistry, TodosPluginOverrides};
pub use routes::{
    ClientPlugin, RouteDescriptor, StackClient, TodosClientConfig, TodosClientPlugin,
    TodosRouteName,
};
