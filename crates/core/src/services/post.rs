//! Post service.

use std::sync::LazyLock;

use futo_common::{AppError, AppResult, MediaStorageService};
use futo_db::{
    entities::post,
    repositories::{CommentRepository, LikeRepository, PostRepository},
};
use regex::Regex;
use sea_orm::{ActiveValue::NotSet, Set};

/// Slug length cap; suffixes for uniqueness are appended after truncation.
const SLUG_MAX_LEN: usize = 200;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    like_repo: LikeRepository,
    storage: MediaStorageService,
    upload_folder: String,
}

/// An uploaded image file carried with a write request.
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Input for creating a new post.
pub struct CreatePostInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub author_id: Option<i64>,
    /// Direct file upload; superseded by `image_url` when both are given.
    pub image_upload: Option<ImageUpload>,
    /// Remote-URL hint; pushed through the storage provider before persisting.
    pub image_url: Option<String>,
}

/// Input for a partial or full post update. Absent fields stay untouched.
#[derive(Default)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub image_upload: Option<ImageUpload>,
    pub image_url: Option<String>,
}

/// A post read model carrying optional precomputed counters.
///
/// The query layer fills the counters for listings (one GROUP BY per
/// relation); when a counter is absent the service falls back to a live
/// count instead of inspecting instance state.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: post::Model,
    pub likes_count: Option<i64>,
    pub comments_count: Option<i64>,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        like_repo: LikeRepository,
        storage: MediaStorageService,
        upload_folder: String,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            like_repo,
            storage,
            upload_folder,
        }
    }

    /// Create a new post. The slug is assigned here and never changes.
    pub async fn create(&self, input: CreatePostInput) -> AppResult<post::Model> {
        // Resolve the image before anything is persisted; a post must never
        // be stored with a dangling upload hint.
        let image = self
            .store_image(input.image_upload, input.image_url)
            .await?;

        let slug = self.generate_unique_slug(&input.title).await?;
        let now = chrono::Utc::now();

        let model = post::ActiveModel {
            id: NotSet,
            author_id: Set(input.author_id),
            title: Set(input.title),
            subtitle: Set(input.subtitle.filter(|s| !s.is_empty())),
            content: Set(input.content),
            image: Set(image),
            slug: Set(slug),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.post_repo.create(model).await
    }

    /// Update a post addressed by slug. The slug itself is immutable.
    pub async fn update(&self, slug: &str, input: UpdatePostInput) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_slug(slug).await?;

        let image = self.store_image(input.image_upload, input.image_url).await?;

        let mut model: post::ActiveModel = post.into();
        if let Some(title) = input.title {
            model.title = Set(title);
        }
        if let Some(subtitle) = input.subtitle {
            model.subtitle = Set(Some(subtitle).filter(|s| !s.is_empty()));
        }
        if let Some(content) = input.content {
            model.content = Set(content);
        }
        if let Some(image) = image {
            model.image = Set(Some(image));
        }
        model.updated_at = Set(chrono::Utc::now().into());

        self.post_repo.update(model).await
    }

    /// Delete a post; comments and likes cascade.
    pub async fn delete(&self, slug: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_slug(slug).await?;
        self.post_repo.delete(post.id).await
    }

    /// Get a single post by slug. Counters are left unannotated; callers
    /// resolve them through [`Self::counts`].
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<PostView> {
        let post = self.post_repo.get_by_slug(slug).await?;
        Ok(PostView {
            post,
            likes_count: None,
            comments_count: None,
        })
    }

    /// List all posts, newest first, with batched counter annotations.
    pub async fn list(&self) -> AppResult<Vec<PostView>> {
        let posts = self.post_repo.find_all().await?;
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

        let likes = self.like_repo.count_by_posts(&ids).await?;
        let comments = self.comment_repo.count_active_by_posts(&ids).await?;

        Ok(posts
            .into_iter()
            .map(|post| {
                let likes_count = Some(likes.get(&post.id).copied().unwrap_or(0));
                let comments_count = Some(comments.get(&post.id).copied().unwrap_or(0));
                PostView {
                    post,
                    likes_count,
                    comments_count,
                }
            })
            .collect())
    }

    /// Resolve a view's counters: annotated values when present, live
    /// counts otherwise.
    pub async fn counts(&self, view: &PostView) -> AppResult<(i64, i64)> {
        let likes = match view.likes_count {
            Some(n) => n,
            None => self.like_repo.count_by_post(view.post.id).await? as i64,
        };
        let comments = match view.comments_count {
            Some(n) => n,
            None => {
                self.comment_repo
                    .count_active_by_post(view.post.id)
                    .await? as i64
            }
        };
        Ok((likes, comments))
    }

    /// Push the request's image (remote hint wins over a direct upload)
    /// through the storage provider, returning the canonical URL to store.
    async fn store_image(
        &self,
        upload: Option<ImageUpload>,
        url_hint: Option<String>,
    ) -> AppResult<Option<String>> {
        if let Some(hint) = url_hint.filter(|u| !u.is_empty()) {
            let stored = self
                .storage
                .upload_url(&hint, &self.upload_folder)
                .await
                .map_err(|e| AppError::Field("image_url".to_string(), e.to_string()))?;
            return Ok(Some(stored.secure_url));
        }

        if let Some(file) = upload {
            let stored = self
                .storage
                .upload_bytes(file.data, &file.filename, &self.upload_folder)
                .await
                .map_err(|e| AppError::Field("image".to_string(), e.to_string()))?;
            return Ok(Some(stored.secure_url));
        }

        Ok(None)
    }

    /// Derive a unique slug from a title, suffixing `-N` until free.
    async fn generate_unique_slug(&self, title: &str) -> AppResult<String> {
        let base = slugify(title);
        let base = if base.is_empty() { "post".to_string() } else { base };

        let mut slug = base.clone();
        let mut counter = 1u32;
        while self.post_repo.slug_exists(&slug).await? {
            slug = format!("{base}-{counter}");
            counter += 1;
        }
        Ok(slug)
    }
}

/// Lowercase, collapse non-alphanumeric runs to hyphens, cap the length.
fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    slug.chars().take(SLUG_MAX_LEN).collect()
}
