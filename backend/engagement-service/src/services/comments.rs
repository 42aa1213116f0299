use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::domain::{Comment, CommentView, CounterField, NewComment};
use crate::error::{AppError, Result};
use crate::pagination::PaginationConfig;
use crate::services::counters;
use crate::store::RelationStore;

/// Comment service - row mutations plus the `comments_count` delta on the
/// parent post, committed as one unit
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn RelationStore>,
    paging: PaginationConfig,
}

impl CommentService {
    pub fn new(store: Arc<dyn RelationStore>, paging: PaginationConfig) -> Self {
        Self { store, paging }
    }

    /// Add a comment with server-assigned timestamps. Blank content is
    /// rejected before any store access.
    pub async fn add_comment(
        &self,
        viewer: Option<Identity>,
        post_id: Uuid,
        content: &str,
    ) -> Result<Comment> {
        let viewer = auth::require_identity(viewer)?;
        if content.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "comment content is required".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        if tx.post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }

        let comment = tx
            .insert_comment(NewComment {
                post_id,
                author_id: viewer.0,
                content: content.to_string(),
            })
            .await?;
        counters::apply_delta(tx.as_mut(), post_id, CounterField::Comments, 1).await?;
        tx.commit().await?;

        info!("Comment added: user={} post={}", viewer.0, post_id);
        Ok(comment)
    }

    /// Edit a comment's content. Only the owning identity may edit; a blank
    /// replacement is a successful no-op rather than an error.
    pub async fn update_comment(
        &self,
        viewer: Option<Identity>,
        comment_id: Uuid,
        new_content: &str,
    ) -> Result<Comment> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let comment = tx
            .comment_by_id(comment_id)
            .await?
            .ok_or(AppError::NotFound("comment"))?;
        if !auth::is_owner(viewer, comment.author_id) {
            return Err(AppError::Forbidden("comment"));
        }

        if new_content.trim().is_empty() {
            tx.rollback().await?;
            return Ok(comment);
        }

        tx.update_comment_content(comment_id, new_content).await?;
        let updated = tx
            .comment_by_id(comment_id)
            .await?
            .ok_or(AppError::NotFound("comment"))?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a comment and apply `-1` to its parent post, as one unit.
    pub async fn delete_comment(&self, viewer: Option<Identity>, comment_id: Uuid) -> Result<()> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let comment = tx
            .comment_by_id(comment_id)
            .await?
            .ok_or(AppError::NotFound("comment"))?;
        if !auth::is_owner(viewer, comment.author_id) {
            return Err(AppError::Forbidden("comment"));
        }

        tx.delete_comment(comment_id).await?;
        counters::apply_delta(tx.as_mut(), comment.post_id, CounterField::Comments, -1).await?;
        tx.commit().await?;

        info!(
            "Comment deleted: user={} comment={} post={}",
            viewer.0, comment_id, comment.post_id
        );
        Ok(())
    }

    /// Comments on a post with author summaries, newest first. Offset paging
    /// - a per-post listing, low churn.
    pub async fn comments_for_post(
        &self,
        post_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CommentView>> {
        let limit = self.paging.normalize_limit(limit);
        let offset = self.paging.normalize_offset(offset);

        let mut tx = self.store.begin().await?;
        if tx.post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }
        let comments = tx.comments_for_post(post_id, limit, offset).await?;
        tx.commit().await?;

        Ok(comments)
    }
}
