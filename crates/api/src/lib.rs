//! HTTP API layer for futo-media.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: posts, nested comments, and like toggles
//! - **Middleware**: application state shared across handlers
//! - **Responses**: uniform success/error envelopes
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
