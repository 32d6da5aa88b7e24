//! HTTP handlers, one module per resource.
//!
//! Handlers stay thin: extract, check the caller's role where the route demands
//! it, delegate to the matching service, and pick the status code.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
