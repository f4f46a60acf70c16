//! Todos resource plugin.
//!
//! The crate is split along the same seam as the plugin contract:
//!
//! - [`application`] holds the backend route table over a [`StorageAdapter`]
//!   plus the pure metadata and sitemap builders.
//! - [`client`] holds the route bundle a host composes: the API invoker, the
//!   server-side prefetch loader, the optimistic mutation hooks and the route
//!   descriptors.
//! - [`cache`] is the session-scoped query cache shared by the loader, the
//!   queries and the mutations.
//! - [`infra`] wires everything into an axum host with telemetry.
//!
//! [`StorageAdapter`]: application::repos::StorageAdapter

pub mod application;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
