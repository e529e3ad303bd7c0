//! API endpoints.

mod comments;
mod likes;
mod posts;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest("/posts", posts::router())
}
