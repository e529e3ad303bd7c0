//! Comment repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Comment, comment};
use futo_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

#[derive(FromQueryResult)]
struct CountRow {
    post_id: i64,
    count: i64,
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All active comments of a post, oldest first. Thread assembly happens
    /// in the service layer from this single flat fetch.
    pub async fn find_active_by_post(&self, post_id: i64) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::IsActive.eq(true))
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count active comments on a post.
    pub async fn count_active_by_post(&self, post_id: i64) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::IsActive.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Batched active-comment counts for a set of posts. Posts without
    /// comments are absent from the map.
    pub async fn count_active_by_posts(&self, post_ids: &[i64]) -> AppResult<HashMap<i64, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids.to_vec()))
            .filter(comment::Column::IsActive.eq(true))
            .group_by(comment::Column::PostId)
            .into_model::<CountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.post_id, r.count)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_comment(id: i64, post_id: i64, parent_id: Option<i64>) -> comment::Model {
        comment::Model {
            id,
            post_id,
            parent_id,
            name: "Visitor".to_string(),
            email: None,
            content: "Nice post".to_string(),
            created_at: Utc::now().into(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let comment = create_test_comment(1, 10, None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment.clone()]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_id(1).await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().post_id, 10);
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_id(42).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_active_by_post() {
        let c1 = create_test_comment(1, 10, None);
        let c2 = create_test_comment(2, 10, Some(1));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_active_by_post(10).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].parent_id, Some(1));
    }

    #[tokio::test]
    async fn test_count_active_by_posts_empty_input() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = CommentRepository::new(db);
        let result = repo.count_active_by_posts(&[]).await.unwrap();

        assert!(result.is_empty());
    }
}
