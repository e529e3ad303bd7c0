//! Like service.

use futo_common::AppResult;
use futo_db::{
    entities::like,
    repositories::{LikeRepository, PostRepository},
};
use sea_orm::{ActiveValue::NotSet, Set};

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    post_repo: PostRepository,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    /// The post's like count after the toggle.
    pub likes_count: i64,
    /// Whether the visitor now likes the post.
    pub liked: bool,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(like_repo: LikeRepository, post_repo: PostRepository) -> Self {
        Self {
            like_repo,
            post_repo,
        }
    }

    /// Toggle a visitor's like on a post.
    ///
    /// Visitor identity falls back from the caller-supplied id to the
    /// caller's network address to the post's own id. The last resort is a
    /// shared identifier that disables per-visitor uniqueness; preserved as
    /// observed behavior.
    ///
    /// Two concurrent toggles for the same (post, visitor) can race between
    /// the existence check and the write; last-writer-wins is accepted and
    /// the unique index bounds the damage to one failed insert.
    pub async fn toggle(
        &self,
        slug: &str,
        visitor_id: Option<String>,
        remote_addr: Option<String>,
    ) -> AppResult<LikeToggle> {
        let post = self.post_repo.get_by_slug(slug).await?;

        let visitor_id = visitor_id
            .filter(|v| !v.is_empty())
            .or(remote_addr)
            .unwrap_or_else(|| post.id.to_string());
        let visitor_id = visitor_id.as_str();

        let liked = if self.like_repo.has_liked(post.id, visitor_id).await? {
            self.like_repo
                .delete_by_post_and_visitor(post.id, visitor_id)
                .await?;
            false
        } else {
            let model = like::ActiveModel {
                id: NotSet,
                post_id: Set(post.id),
                visitor_id: Set(visitor_id.to_string()),
                created_at: Set(chrono::Utc::now().into()),
            };
            self.like_repo.create(model).await?;
            true
        };

        let likes_count = self.like_repo.count_by_post(post.id).await? as i64;
        Ok(LikeToggle { likes_count, liked })
    }
}
