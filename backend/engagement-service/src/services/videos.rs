use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::domain::{NewVideo, Video, VideoView};
use crate::error::{AppError, Result};
use crate::pagination::PaginationConfig;
use crate::store::RelationStore;

/// Video service. Views are fire-and-forget: every read increments, no
/// uniqueness per viewer.
#[derive(Clone)]
pub struct VideoService {
    store: Arc<dyn RelationStore>,
    paging: PaginationConfig,
}

impl VideoService {
    pub fn new(store: Arc<dyn RelationStore>, paging: PaginationConfig) -> Self {
        Self { store, paging }
    }

    /// Register a video whose file (and optional thumbnail) the media layer
    /// has already stored.
    pub async fn create_video(&self, viewer: Option<Identity>, new: VideoInput) -> Result<Video> {
        let viewer = auth::require_identity(viewer)?;
        if new.title.trim().is_empty() || new.file_url.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "video title and file are required".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let video = tx
            .insert_video(NewVideo {
                owner_id: viewer.0,
                title: new.title,
                description: new.description,
                file_url: new.file_url,
                thumbnail_url: new.thumbnail_url,
                duration_seconds: new.duration_seconds,
            })
            .await?;
        tx.commit().await?;

        info!("Video created: user={} video={}", viewer.0, video.id);
        Ok(video)
    }

    /// Fetch a video and count the view, returning the post-increment count
    /// in the view row.
    pub async fn get_video(&self, viewer: Option<Identity>, video_id: Uuid) -> Result<VideoView> {
        auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let mut view = tx
            .video_view(video_id)
            .await?
            .ok_or(AppError::NotFound("video"))?;
        if let Some(views) = tx.bump_video_views(video_id).await? {
            view.views_count = views;
        }
        tx.commit().await?;

        Ok(view)
    }

    /// Edit title/description. Fields left `None` are unchanged.
    pub async fn update_video(
        &self,
        viewer: Option<Identity>,
        video_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Video> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let video = tx
            .video_by_id(video_id)
            .await?
            .ok_or(AppError::NotFound("video"))?;
        if !auth::is_owner(viewer, video.owner_id) {
            return Err(AppError::Forbidden("video"));
        }

        let updated = tx
            .update_video(video_id, title, description)
            .await?
            .ok_or(AppError::NotFound("video"))?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Delete the row; file cleanup belongs to the media layer.
    pub async fn delete_video(&self, viewer: Option<Identity>, video_id: Uuid) -> Result<()> {
        let viewer = auth::require_identity(viewer)?;

        let mut tx = self.store.begin().await?;
        let video = tx
            .video_by_id(video_id)
            .await?
            .ok_or(AppError::NotFound("video"))?;
        if !auth::is_owner(viewer, video.owner_id) {
            return Err(AppError::Forbidden("video"));
        }

        tx.delete_video(video_id).await?;
        tx.commit().await?;

        info!("Video deleted: user={} video={}", viewer.0, video_id);
        Ok(())
    }

    /// All videos with owner summaries, newest first.
    pub async fn list_videos(
        &self,
        viewer: Option<Identity>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<VideoView>> {
        auth::require_identity(viewer)?;
        let limit = self.paging.normalize_limit(limit);
        let offset = self.paging.normalize_offset(offset);

        let mut tx = self.store.begin().await?;
        let videos = tx.videos_page(limit, offset).await?;
        tx.commit().await?;

        Ok(videos)
    }
}

/// Creation input; media references arrive already stored.
#[derive(Debug, Clone)]
pub struct VideoInput {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i32,
}
