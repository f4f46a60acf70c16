//! Backend routes and the pure builders shared with the client bundle.

pub mod error;
pub mod metadata;
pub mod repos;
pub mod sitemap;
pub mod todos;
