//! Like repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Like, like};
use futo_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, ModelTrait,
    PaginatorTrait, QueryFilter, QuerySelect,
};

#[derive(FromQueryResult)]
struct CountRow {
    post_id: i64,
    count: i64,
}

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a like by post and visitor.
    pub async fn find_by_post_and_visitor(
        &self,
        post_id: i64,
        visitor_id: &str,
    ) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .filter(like::Column::VisitorId.eq(visitor_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a visitor has liked a post.
    pub async fn has_liked(&self, post_id: i64, visitor_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_post_and_visitor(post_id, visitor_id)
            .await?
            .is_some())
    }

    /// Create a new like.
    pub async fn create(&self, model: like::ActiveModel) -> AppResult<like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a like by post and visitor.
    pub async fn delete_by_post_and_visitor(
        &self,
        post_id: i64,
        visitor_id: &str,
    ) -> AppResult<()> {
        let like = self.find_by_post_and_visitor(post_id, visitor_id).await?;
        if let Some(l) = like {
            l.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Count likes on a post.
    pub async fn count_by_post(&self, post_id: i64) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Batched like counts for a set of posts. Posts without likes are
    /// absent from the map.
    pub async fn count_by_posts(&self, post_ids: &[i64]) -> AppResult<HashMap<i64, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Like::find()
            .select_only()
            .column(like::Column::PostId)
            .column_as(like::Column::Id.count(), "count")
            .filter(like::Column::PostId.is_in(post_ids.to_vec()))
            .group_by(like::Column::PostId)
            .into_model::<CountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.post_id, r.count)).collect())
    }
}
