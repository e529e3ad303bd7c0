//! Post endpoints.

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    routing::get,
};
use futo_common::{AppError, AppResult, image_ref};
use futo_core::{CreatePostInput, ImageUpload, PostView, UpdatePostInput};
use futo_db::entities::post;
use serde::Deserialize;
use validator::Validate;

use crate::endpoints::comments::CommentResponse;
use crate::{middleware::AppState, response::ApiResponse, response::no_content};

/// Post response for listings.
#[derive(Debug, serde::Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub content: String,
    /// Normalized absolute URL, or null when no image resolves.
    pub image_url: Option<String>,
    pub created_at: String,
    pub likes_count: i64,
    pub comments_count: i64,
}

impl PostResponse {
    fn new(post: post::Model, likes_count: i64, comments_count: i64, state: &AppState) -> Self {
        let image_url = image_url_for(&post, state);
        Self {
            id: post.id,
            title: post.title,
            subtitle: post.subtitle,
            slug: post.slug,
            content: post.content,
            image_url,
            created_at: post.created_at.to_rfc3339(),
            likes_count,
            comments_count,
        }
    }
}

/// Post detail response: listing fields plus the comment threads.
#[derive(Debug, serde::Serialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub top_level_comments: Vec<CommentResponse>,
}

/// Reduce a stored reference to one absolute URL for clients.
pub(crate) fn image_url_for(post: &post::Model, state: &AppState) -> Option<String> {
    let name = post.image.as_deref();
    // Relative stored names historically served from the local media tree.
    let resolved = name.and_then(|n| {
        if n.starts_with("http://") || n.starts_with("https://") {
            None
        } else {
            Some(format!("/media/{}", n.trim_start_matches('/')))
        }
    });
    image_ref::resolve_image_url(
        name,
        resolved.as_deref(),
        Some(&state.base_url),
        &state.cdn_host,
    )
}

/// Write-request fields shared by create and update, for both JSON and
/// multipart bodies.
#[derive(Debug, Default, Deserialize, Validate)]
struct PostForm {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    title: Option<String>,
    #[validate(length(max = 255, message = "subtitle must be at most 255 characters"))]
    subtitle: Option<String>,
    #[validate(length(min = 1, message = "content must not be empty"))]
    content: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    image_url: Option<String>,
}

/// Parse a JSON or multipart write request into form fields plus an
/// optional direct file upload.
async fn parse_post_request(req: Request) -> AppResult<(PostForm, Option<ImageUpload>)> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let mut form = PostForm::default();
        let mut upload: Option<ImageUpload> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "image" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?
                        .to_vec();
                    if !data.is_empty() {
                        upload = Some(ImageUpload { filename, data });
                    }
                }
                "title" | "subtitle" | "content" | "image_url" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    match name.as_str() {
                        "title" => form.title = Some(text),
                        "subtitle" => form.subtitle = Some(text),
                        "content" => form.content = Some(text),
                        _ => {
                            if !text.is_empty() {
                                form.image_url = Some(text);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok((form, upload))
    } else {
        let Json(form) = Json::<PostForm>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok((form, None))
    }
}

/// Build the detail body for a view: live counters (when unannotated) and
/// the active comment threads.
async fn detail_response(state: &AppState, view: PostView) -> AppResult<PostDetailResponse> {
    let (likes_count, comments_count) = state.post_service.counts(&view).await?;
    let threads = state.comment_service.list_for_post(&view.post.slug).await?;
    Ok(PostDetailResponse {
        post: PostResponse::new(view.post, likes_count, comments_count, state),
        top_level_comments: threads.into_iter().map(CommentResponse::from_thread).collect(),
    })
}

/// List all posts, newest first.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let views = state.post_service.list().await?;

    let mut responses = Vec::with_capacity(views.len());
    for view in views {
        let (likes_count, comments_count) = state.post_service.counts(&view).await?;
        responses.push(PostResponse::new(
            view.post,
            likes_count,
            comments_count,
            &state,
        ));
    }

    Ok(ApiResponse::ok(responses))
}

/// Get one post with its comment threads.
async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<ApiResponse<PostDetailResponse>> {
    let view = state.post_service.get_by_slug(&slug).await?;
    let detail = detail_response(&state, view).await?;
    Ok(ApiResponse::ok(detail))
}

/// Create a new post.
async fn create(
    State(state): State<AppState>,
    req: Request,
) -> AppResult<(StatusCode, ApiResponse<PostDetailResponse>)> {
    let (form, upload) = parse_post_request(req).await?;
    form.validate()?;

    let title = form
        .title
        .ok_or_else(|| AppError::Field("title".to_string(), "This field is required.".to_string()))?;
    let content = form.content.ok_or_else(|| {
        AppError::Field("content".to_string(), "This field is required.".to_string())
    })?;

    let created = state
        .post_service
        .create(CreatePostInput {
            title,
            subtitle: form.subtitle,
            content,
            author_id: None,
            image_upload: upload,
            image_url: form.image_url,
        })
        .await?;

    // Fresh post: no likes, no comments.
    let detail = PostDetailResponse {
        post: PostResponse::new(created, 0, 0, &state),
        top_level_comments: Vec::new(),
    };
    Ok((StatusCode::CREATED, ApiResponse::ok(detail)))
}

/// Partially or fully update a post. The slug never changes.
async fn update(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    req: Request,
) -> AppResult<ApiResponse<PostDetailResponse>> {
    let (form, upload) = parse_post_request(req).await?;
    form.validate()?;

    let updated = state
        .post_service
        .update(
            &slug,
            UpdatePostInput {
                title: form.title,
                subtitle: form.subtitle,
                content: form.content,
                image_upload: upload,
                image_url: form.image_url,
            },
        )
        .await?;

    let view = PostView {
        post: updated,
        likes_count: None,
        comments_count: None,
    };
    let detail = detail_response(&state, view).await?;
    Ok(ApiResponse::ok(detail))
}

/// Hard-delete a post; comments and likes cascade.
async fn remove(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.post_service.delete(&slug).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{slug}",
            get(show).put(update).patch(update).delete(remove),
        )
        .merge(super::comments::router())
        .merge(super::likes::router())
}
