//! Abstract transactional relation store.
//!
//! Services never touch a database handle directly: they open a [`StoreTx`]
//! through [`RelationStore::begin`], perform typed row operations plus
//! counter deltas inside it, and commit. An uncommitted transaction rolls
//! back when dropped, so an early `?` return never leaves a partial counter
//! update behind.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Comment, CommentView, CounterField, FeedPost, Like, LikeView, NewComment, NewPost, NewUser,
    NewVideo, Post, User, Video, VideoView,
};
use crate::pagination::FeedCursor;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("transaction timed out")]
    Timeout,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Open a transaction. All reads and writes inside it see a consistent
    /// snapshot; nothing is visible to other callers until commit.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// One open transaction over the relation tables.
///
/// The operations map the abstract store contract (get / insert / update /
/// delete / atomic increment / ordered query) onto the entity set of this
/// service.
#[async_trait]
pub trait StoreTx: Send {
    // ---- users ----
    async fn insert_user(&mut self, new: NewUser) -> StoreResult<User>;
    async fn user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    // ---- posts ----
    async fn insert_post(&mut self, new: NewPost) -> StoreResult<Post>;
    async fn post_by_id(&mut self, id: Uuid) -> StoreResult<Option<Post>>;
    /// Denormalized single-post view (post fields + author summary).
    async fn post_view(&mut self, id: Uuid) -> StoreResult<Option<FeedPost>>;
    /// Update the given fields; `None` leaves a field unchanged.
    async fn update_post(
        &mut self,
        id: Uuid,
        content: Option<&str>,
        media_url: Option<&str>,
    ) -> StoreResult<Option<Post>>;
    /// Hard delete; comments and likes of the post go with it.
    async fn delete_post(&mut self, id: Uuid) -> StoreResult<bool>;
    async fn posts_by_author(
        &mut self,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FeedPost>>;

    // ---- likes ----
    /// Insert a like row. Returns `None` when the (user, post) row already
    /// exists - the uniqueness constraint is checked by the same transaction
    /// that inserts, so two concurrent likes cannot both succeed.
    async fn insert_like(&mut self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<Like>>;
    async fn delete_like(&mut self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool>;
    async fn likes_for_post(
        &mut self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LikeView>>;
    async fn count_likes(&mut self, post_id: Uuid) -> StoreResult<i64>;

    // ---- comments ----
    async fn insert_comment(&mut self, new: NewComment) -> StoreResult<Comment>;
    async fn comment_by_id(&mut self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn update_comment_content(&mut self, id: Uuid, content: &str) -> StoreResult<bool>;
    async fn delete_comment(&mut self, id: Uuid) -> StoreResult<bool>;
    async fn comments_for_post(
        &mut self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CommentView>>;
    async fn count_comments(&mut self, post_id: Uuid) -> StoreResult<i64>;

    // ---- counters ----
    /// Single-row atomic add, clamped at a lower bound of 0. Never
    /// read-modify-write from application memory.
    async fn apply_counter_delta(
        &mut self,
        post_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> StoreResult<()>;
    /// Recompute both cached counters from their relation rows.
    async fn recount_post_counters(&mut self, post_id: Uuid) -> StoreResult<()>;

    // ---- follows ----
    /// Idempotent edge insert; returns true if a new edge was created.
    async fn insert_follow(&mut self, follower_id: Uuid, followee_id: Uuid) -> StoreResult<bool>;
    /// Idempotent delete; returns true if an edge was removed.
    async fn delete_follow(&mut self, follower_id: Uuid, followee_id: Uuid) -> StoreResult<bool>;

    // ---- videos ----
    async fn insert_video(&mut self, new: NewVideo) -> StoreResult<Video>;
    async fn video_by_id(&mut self, id: Uuid) -> StoreResult<Option<Video>>;
    async fn video_view(&mut self, id: Uuid) -> StoreResult<Option<VideoView>>;
    async fn update_video(
        &mut self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Option<Video>>;
    async fn delete_video(&mut self, id: Uuid) -> StoreResult<bool>;
    async fn videos_page(&mut self, limit: i64, offset: i64) -> StoreResult<Vec<VideoView>>;
    /// Unclamped fire-and-forget view increment; returns the new count, or
    /// `None` when the video does not exist.
    async fn bump_video_views(&mut self, id: Uuid) -> StoreResult<Option<i64>>;

    // ---- feed ----
    /// One page of posts authored by `viewer_id` or by anyone they follow,
    /// in `(created_at DESC, id DESC)` order, strictly after `cursor` when
    /// present. Single query, author summary included - no per-post lookups.
    async fn feed_page(
        &mut self,
        viewer_id: Uuid,
        cursor: Option<&FeedCursor>,
        limit: i64,
    ) -> StoreResult<Vec<FeedPost>>;

    // ---- transaction demarcation ----
    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
