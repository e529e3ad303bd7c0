//! Like toggle endpoint, scoped to a post by slug.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{ConnectInfo, FromRequest, Path, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
};
use futo_common::{AppError, AppResult};
use futo_core::LikeToggle;
use serde::Deserialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Toggle like request. The body is optional.
#[derive(Debug, Default, Deserialize)]
struct ToggleLikeRequest {
    visitor_id: Option<String>,
}

/// Like toggle response.
#[derive(Debug, serde::Serialize)]
pub struct LikeToggleResponse {
    pub likes_count: i64,
    pub liked: bool,
}

impl From<LikeToggle> for LikeToggleResponse {
    fn from(toggle: LikeToggle) -> Self {
        Self {
            likes_count: toggle.likes_count,
            liked: toggle.liked,
        }
    }
}

/// Toggle the caller's like on a post.
async fn toggle(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    req: Request,
) -> AppResult<ApiResponse<LikeToggleResponse>> {
    // Peer address is present when the server is built with connect info;
    // absent (e.g. under test harnesses) it simply drops out of the
    // visitor fallback chain.
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let body = if is_json {
        let Json(body) = Json::<ToggleLikeRequest>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        body
    } else {
        ToggleLikeRequest::default()
    };

    let result = state
        .like_service
        .toggle(&slug, body.visitor_id, remote_addr)
        .await?;
    Ok(ApiResponse::ok(result.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}/like", post(toggle))
}
