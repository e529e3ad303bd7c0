//! Comment service.

use std::collections::HashMap;

use futo_common::{AppError, AppResult};
use futo_db::{
    entities::comment,
    repositories::{CommentRepository, PostRepository},
};
use sea_orm::{ActiveValue::NotSet, Set};

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
}

/// Input for creating a comment or reply.
pub struct CreateCommentInput {
    pub name: String,
    pub email: Option<String>,
    pub content: String,
    /// Parent comment id for replies; must belong to the same post.
    pub parent_id: Option<i64>,
}

/// A comment with its active replies nested, oldest first at every level.
#[derive(Debug, Clone)]
pub struct CommentThread {
    pub comment: comment::Model,
    pub replies: Vec<CommentThread>,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(comment_repo: CommentRepository, post_repo: PostRepository) -> Self {
        Self {
            comment_repo,
            post_repo,
        }
    }

    /// Active top-level comments of a post with nested active replies.
    pub async fn list_for_post(&self, slug: &str) -> AppResult<Vec<CommentThread>> {
        let post = self.post_repo.get_by_slug(slug).await?;
        let comments = self.comment_repo.find_active_by_post(post.id).await?;
        Ok(assemble_threads(comments))
    }

    /// Create a comment (or a reply, when `parent_id` is set) on a post.
    pub async fn create(
        &self,
        slug: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        let post = self.post_repo.get_by_slug(slug).await?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| {
                    AppError::Field("parent".to_string(), "Parent comment not found.".to_string())
                })?;
            if parent.post_id != post.id {
                return Err(AppError::Field(
                    "parent".to_string(),
                    "Parent comment does not belong to this post.".to_string(),
                ));
            }
        }

        let model = comment::ActiveModel {
            id: NotSet,
            post_id: Set(post.id),
            parent_id: Set(input.parent_id),
            name: Set(input.name),
            email: Set(input.email.filter(|e| !e.is_empty())),
            content: Set(input.content),
            created_at: Set(chrono::Utc::now().into()),
            is_active: Set(true),
        };

        self.comment_repo.create(model).await
    }
}

/// Build reply trees from one flat, already-ordered fetch. Replies whose
/// parent is inactive never attach anywhere and drop out, the same as the
/// read path hiding an entire subtree under a hidden comment.
fn assemble_threads(comments: Vec<comment::Model>) -> Vec<CommentThread> {
    let mut children: HashMap<i64, Vec<comment::Model>> = HashMap::new();
    let mut roots: Vec<comment::Model> = Vec::new();

    for comment in comments {
        match comment.parent_id {
            Some(parent_id) => children.entry(parent_id).or_default().push(comment),
            None => roots.push(comment),
        }
    }

    roots
        .into_iter()
        .map(|c| attach_replies(c, &mut children))
        .collect()
}

fn attach_replies(
    comment: comment::Model,
    children: &mut HashMap<i64, Vec<comment::Model>>,
) -> CommentThread {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|c| attach_replies(c, children))
        .collect();
    CommentThread { comment, replies }
}
