//! API middleware and shared state.

use futo_core::{CommentService, LikeService, PostService};
use url::Url;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub like_service: LikeService,
    /// Public base origin; last-resort base for relative image references.
    pub base_url: Url,
    /// Canonical image CDN host.
    pub cdn_host: String,
}
