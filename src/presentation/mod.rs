//! Server-rendered documents for the todos pages.

pub mod views;
