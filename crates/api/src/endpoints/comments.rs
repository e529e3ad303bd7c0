//! Comment endpoints, scoped to a post by slug.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use futo_common::AppResult;
use futo_core::{CommentThread, CreateCommentInput};
use futo_db::entities::comment;
use serde::Deserialize;
use validator::Validate;

use crate::{middleware::AppState, response::ApiResponse};

/// Comment response with nested active replies.
#[derive(Debug, serde::Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post: i64,
    pub parent: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub content: String,
    pub created_at: String,
    pub is_active: bool,
    pub replies: Vec<CommentResponse>,
}

impl CommentResponse {
    fn new(comment: comment::Model, replies: Vec<Self>) -> Self {
        Self {
            id: comment.id,
            post: comment.post_id,
            parent: comment.parent_id,
            name: comment.name,
            email: comment.email,
            content: comment.content,
            created_at: comment.created_at.to_rfc3339(),
            is_active: comment.is_active,
            replies,
        }
    }

    pub(crate) fn from_thread(thread: CommentThread) -> Self {
        let replies = thread
            .replies
            .into_iter()
            .map(Self::from_thread)
            .collect();
        Self::new(thread.comment, replies)
    }
}

impl From<comment::Model> for CommentResponse {
    fn from(comment: comment::Model) -> Self {
        Self::new(comment, Vec::new())
    }
}

/// Create comment request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// Parent comment id for a reply; must belong to the same post.
    pub parent: Option<i64>,
}

/// Active top-level comments with nested replies, oldest first.
async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let threads = state.comment_service.list_for_post(&slug).await?;
    Ok(ApiResponse::ok(
        threads.into_iter().map(CommentResponse::from_thread).collect(),
    ))
}

/// Create a comment or reply on a post.
async fn create(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, ApiResponse<CommentResponse>)> {
    req.validate()?;

    let created = state
        .comment_service
        .create(
            &slug,
            CreateCommentInput {
                name: req.name,
                email: req.email,
                content: req.content,
                parent_id: req.parent,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(created.into())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}/comments", get(list).post(create))
}
