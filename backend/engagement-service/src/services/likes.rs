use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::domain::{CounterField, LikeView};
use crate::error::{AppError, Result};
use crate::pagination::PaginationConfig;
use crate::services::counters;
use crate::store::RelationStore;

/// Like service - one like per (user, post), counter kept in lockstep
#[derive(Clone)]
pub struct LikeService {
    store: Arc<dyn RelationStore>,
    paging: PaginationConfig,
}

impl LikeService {
    pub fn new(store: Arc<dyn RelationStore>, paging: PaginationConfig) -> Self {
        Self { store, paging }
    }

    /// Like a post. The row insert and the `+1` run in one transaction; a
    /// duplicate surfaces from the store's uniqueness constraint as
    /// `AlreadyLiked` and nothing is committed.
    ///
    /// Returns the post's like count after the increment.
    pub async fn like(&self, viewer: Option<Identity>, post_id: Uuid) -> Result<i64> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        if tx.post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }

        if tx.insert_like(viewer.0, post_id).await?.is_none() {
            tx.rollback().await?;
            return Err(AppError::AlreadyLiked);
        }
        counters::apply_delta(tx.as_mut(), post_id, CounterField::Likes, 1).await?;

        let likes_count = tx
            .post_by_id(post_id)
            .await?
            .map(|p| p.likes_count)
            .unwrap_or(0);
        tx.commit().await?;

        info!("Post liked: user={} post={}", viewer.0, post_id);
        Ok(likes_count)
    }

    /// Remove a like. `NotLiked` when no row exists; otherwise the delete
    /// and the `-1` commit together.
    pub async fn unlike(&self, viewer: Option<Identity>, post_id: Uuid) -> Result<i64> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        if tx.post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }

        if !tx.delete_like(viewer.0, post_id).await? {
            tx.rollback().await?;
            return Err(AppError::NotLiked);
        }
        counters::apply_delta(tx.as_mut(), post_id, CounterField::Likes, -1).await?;

        let likes_count = tx
            .post_by_id(post_id)
            .await?
            .map(|p| p.likes_count)
            .unwrap_or(0);
        tx.commit().await?;

        info!("Post unliked: user={} post={}", viewer.0, post_id);
        Ok(likes_count)
    }

    /// Users who liked a post, newest first. Offset paging - a per-post
    /// listing, low churn.
    pub async fn likes_for_post(
        &self,
        post_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<LikeView>> {
        let limit = self.paging.normalize_limit(limit);
        let offset = self.paging.normalize_offset(offset);

        let mut tx = self.store.begin().await?;
        if tx.post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }
        let likes = tx.likes_for_post(post_id, limit, offset).await?;
        tx.commit().await?;

        Ok(likes)
    }
}
