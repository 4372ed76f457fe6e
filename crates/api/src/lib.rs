//! HTTP API layer for meshwork.
//!
//! This crate provides the REST surface over the core services:
//!
//! - **Endpoints**: feed, connection, and like routes
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: shared state and the auth layer
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
