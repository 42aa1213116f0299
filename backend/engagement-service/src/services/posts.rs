use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::domain::{FeedPost, NewPost, Post};
use crate::error::{AppError, Result};
use crate::pagination::PaginationConfig;
use crate::store::RelationStore;

/// Post service
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn RelationStore>,
    paging: PaginationConfig,
}

impl PostService {
    pub fn new(store: Arc<dyn RelationStore>, paging: PaginationConfig) -> Self {
        Self { store, paging }
    }

    /// Create a post. `media_url` arrives pre-stored from the media layer;
    /// the core never performs uploads. Counters start at zero.
    pub async fn create_post(
        &self,
        viewer: Option<Identity>,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<Post> {
        let viewer = auth::require_identity(viewer)?;
        if content.trim().is_empty() {
            return Err(AppError::InvalidInput("post content is required".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let post = tx
            .insert_post(NewPost {
                author_id: viewer.0,
                content: content.to_string(),
                media_url: media_url.map(str::to_string),
            })
            .await?;
        tx.commit().await?;

        info!("Post created: user={} post={}", viewer.0, post.id);
        Ok(post)
    }

    /// Single post with its author summary.
    pub async fn get_post(&self, viewer: Option<Identity>, post_id: Uuid) -> Result<FeedPost> {
        auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let view = tx
            .post_view(post_id)
            .await?
            .ok_or(AppError::NotFound("post"))?;
        tx.commit().await?;

        Ok(view)
    }

    /// Edit content and/or media reference. Fields left `None` are
    /// unchanged.
    pub async fn update_post(
        &self,
        viewer: Option<Identity>,
        post_id: Uuid,
        content: Option<&str>,
        media_url: Option<&str>,
    ) -> Result<Post> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let post = tx
            .post_by_id(post_id)
            .await?
            .ok_or(AppError::NotFound("post"))?;
        if !auth::is_owner(viewer, post.author_id) {
            return Err(AppError::Forbidden("post"));
        }

        let updated = tx
            .update_post(post_id, content, media_url)
            .await?
            .ok_or(AppError::NotFound("post"))?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Hard delete; the post's comments and likes go with it (cascade,
    /// recorded as the deletion policy for this core).
    pub async fn delete_post(&self, viewer: Option<Identity>, post_id: Uuid) -> Result<()> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let post = tx
            .post_by_id(post_id)
            .await?
            .ok_or(AppError::NotFound("post"))?;
        if !auth::is_owner(viewer, post.author_id) {
            return Err(AppError::Forbidden("post"));
        }

        tx.delete_post(post_id).await?;
        tx.commit().await?;

        info!("Post deleted: user={} post={}", viewer.0, post_id);
        Ok(())
    }

    /// The viewer's own posts, newest first. Offset paging - a per-owner
    /// listing, low churn, documented as such.
    pub async fn my_posts(
        &self,
        viewer: Option<Identity>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<FeedPost>> {
        let viewer = auth::require_identity(viewer)?;
        let limit = self.paging.normalize_limit(limit);
        let offset = self.paging.normalize_offset(offset);

        let mut tx = self.store.begin().await?;
        let posts = tx.posts_by_author(viewer.0, limit, offset).await?;
        tx.commit().await?;

        Ok(posts)
    }
}
