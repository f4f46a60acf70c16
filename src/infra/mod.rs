//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http;
pub mod local_invoker;
pub mod memory;
pub mod telemetry;
