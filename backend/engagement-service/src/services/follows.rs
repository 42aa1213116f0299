use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::error::{AppError, Result};
use crate::store::RelationStore;

/// Follow service - directed edges consumed by the feed builder
#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn RelationStore>,
}

impl FollowService {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self { store }
    }

    /// Idempotent follow; returns true if a new edge was created.
    /// Self-follow is rejected - the feed already includes own posts.
    pub async fn follow(&self, viewer: Option<Identity>, followee_id: Uuid) -> Result<bool> {
        let viewer = auth::require_identity(viewer)?;
        if viewer.0 == followee_id {
            return Err(AppError::InvalidInput("cannot follow yourself".to_string()));
        }

        let mut tx = self.store.begin().await?;
        if tx.user_by_id(followee_id).await?.is_none() {
            return Err(AppError::NotFound("user"));
        }
        let created = tx.insert_follow(viewer.0, followee_id).await?;
        tx.commit().await?;

        if created {
            info!("Follow created: {} -> {}", viewer.0, followee_id);
        }
        Ok(created)
    }

    /// Idempotent unfollow; returns true if an edge was removed.
    pub async fn unfollow(&self, viewer: Option<Identity>, followee_id: Uuid) -> Result<bool> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let removed = tx.delete_follow(viewer.0, followee_id).await?;
        tx.commit().await?;

        if removed {
            info!("Follow removed: {} -> {}", viewer.0, followee_id);
        }
        Ok(removed)
    }
}
