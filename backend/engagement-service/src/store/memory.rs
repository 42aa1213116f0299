//! In-memory relation store.
//!
//! Observable semantics match the PostgreSQL store: clamped counters, like
//! uniqueness inside the inserting transaction, the feed total order, and
//! rollback-on-drop. Transactions serialize through an owned mutex guard,
//! which gives the strictest isolation - appropriate for a deterministic
//! test double and for embedded hosts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    Comment, CommentView, CounterField, FeedPost, Follow, Like, LikeView, NewComment, NewPost,
    NewUser, NewVideo, Post, User, Video, VideoView,
};
use crate::pagination::FeedCursor;
use crate::store::{RelationStore, StoreError, StoreResult, StoreTx};

#[derive(Default, Clone)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    likes: Vec<Like>,
    follows: Vec<Follow>,
    videos: HashMap<Uuid, Video>,
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// PostgreSQL's timestamptz stores microseconds; truncate so cursor
/// round-trips compare identically across both stores.
fn now() -> DateTime<Utc> {
    let n = Utc::now();
    DateTime::<Utc>::from_timestamp_micros(n.timestamp_micros()).unwrap_or(n)
}

/// Strictly-descending total order key: true when `row` sorts after `cursor`
/// (i.e. is older) in (created_at DESC, id DESC).
fn before_cursor(row_created: DateTime<Utc>, row_id: Uuid, cursor: &FeedCursor) -> bool {
    (row_created, row_id) < (cursor.created_at, cursor.post_id)
}

fn page<T>(mut rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = offset.max(0) as usize;
    if offset >= rows.len() {
        return Vec::new();
    }
    rows.drain(..offset);
    rows.truncate(limit.max(0) as usize);
    rows
}

struct MemTx {
    guard: OwnedMutexGuard<Tables>,
    /// Pre-transaction state; restored on drop unless committed.
    snapshot: Option<Tables>,
}

impl Drop for MemTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl MemTx {
    fn user_summary(&self, user_id: Uuid) -> StoreResult<User> {
        self.guard
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| StoreError::Database(format!("user {user_id} missing")))
    }

    fn feed_post(&self, post: &Post) -> StoreResult<FeedPost> {
        let author = self.user_summary(post.author_id)?;
        Ok(FeedPost {
            id: post.id,
            content: post.content.clone(),
            media_url: post.media_url.clone(),
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            shares_count: post.shares_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
            author_id: author.id,
            author_username: author.username,
            author_email: author.email,
            author_avatar_url: author.avatar_url,
        })
    }

    fn video_view_row(&self, video: &Video) -> StoreResult<VideoView> {
        let owner = self.user_summary(video.owner_id)?;
        Ok(VideoView {
            id: video.id,
            title: video.title.clone(),
            description: video.description.clone(),
            file_url: video.file_url.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            duration_seconds: video.duration_seconds,
            views_count: video.views_count,
            created_at: video.created_at,
            updated_at: video.updated_at,
            owner_id: owner.id,
            owner_username: owner.username,
            owner_email: owner.email,
        })
    }
}

#[async_trait]
impl StoreTx for MemTx {
    async fn insert_user(&mut self, new: NewUser) -> StoreResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            username: new.username,
            avatar_url: new.avatar_url,
            created_at: now(),
        };
        self.guard.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.guard.users.get(&id).cloned())
    }

    async fn insert_post(&mut self, new: NewPost) -> StoreResult<Post> {
        let ts = now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: new.author_id,
            content: new.content,
            media_url: new.media_url,
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        self.guard.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn post_by_id(&mut self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.guard.posts.get(&id).cloned())
    }

    async fn post_view(&mut self, id: Uuid) -> StoreResult<Option<FeedPost>> {
        match self.guard.posts.get(&id).cloned() {
            Some(post) => Ok(Some(self.feed_post(&post)?)),
            None => Ok(None),
        }
    }

    async fn update_post(
        &mut self,
        id: Uuid,
        content: Option<&str>,
        media_url: Option<&str>,
    ) -> StoreResult<Option<Post>> {
        let ts = now();
        let Some(post) = self.guard.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = content {
            post.content = content.to_string();
        }
        if let Some(media_url) = media_url {
            post.media_url = Some(media_url.to_string());
        }
        post.updated_at = ts;
        Ok(Some(post.clone()))
    }

    async fn delete_post(&mut self, id: Uuid) -> StoreResult<bool> {
        if self.guard.posts.remove(&id).is_none() {
            return Ok(false);
        }
        self.guard.comments.retain(|_, c| c.post_id != id);
        self.guard.likes.retain(|l| l.post_id != id);
        Ok(true)
    }

    async fn posts_by_author(
        &mut self,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FeedPost>> {
        let mut posts: Vec<Post> = self
            .guard
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        page(posts, limit, offset)
            .iter()
            .map(|p| self.feed_post(p))
            .collect()
    }

    async fn insert_like(&mut self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<Like>> {
        let duplicate = self
            .guard
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id);
        if duplicate {
            return Ok(None);
        }
        let like = Like {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            created_at: now(),
        };
        self.guard.likes.push(like.clone());
        Ok(Some(like))
    }

    async fn delete_like(&mut self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        let before = self.guard.likes.len();
        self.guard
            .likes
            .retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        Ok(self.guard.likes.len() < before)
    }

    async fn likes_for_post(
        &mut self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LikeView>> {
        let mut likes: Vec<Like> = self
            .guard
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        page(likes, limit, offset)
            .into_iter()
            .map(|l| {
                let user = self.user_summary(l.user_id)?;
                Ok(LikeView {
                    user_id: user.id,
                    username: user.username,
                    email: user.email,
                    avatar_url: user.avatar_url,
                    liked_at: l.created_at,
                })
            })
            .collect()
    }

    async fn count_likes(&mut self, post_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .guard
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .count() as i64)
    }

    async fn insert_comment(&mut self, new: NewComment) -> StoreResult<Comment> {
        let ts = now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new.post_id,
            author_id: new.author_id,
            content: new.content,
            likes_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        self.guard.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn comment_by_id(&mut self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.guard.comments.get(&id).cloned())
    }

    async fn update_comment_content(&mut self, id: Uuid, content: &str) -> StoreResult<bool> {
        let ts = now();
        match self.guard.comments.get_mut(&id) {
            Some(comment) => {
                comment.content = content.to_string();
                comment.updated_at = ts;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.guard.comments.remove(&id).is_some())
    }

    async fn comments_for_post(
        &mut self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CommentView>> {
        let mut comments: Vec<Comment> = self
            .guard
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        page(comments, limit, offset)
            .into_iter()
            .map(|c| {
                let author = self.user_summary(c.author_id)?;
                Ok(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    content: c.content,
                    likes_count: c.likes_count,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                    author_id: author.id,
                    author_username: author.username,
                    author_email: author.email,
                    author_avatar_url: author.avatar_url,
                })
            })
            .collect()
    }

    async fn count_comments(&mut self, post_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .guard
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count() as i64)
    }

    async fn apply_counter_delta(
        &mut self,
        post_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> StoreResult<()> {
        if let Some(post) = self.guard.posts.get_mut(&post_id) {
            let slot = match field {
                CounterField::Likes => &mut post.likes_count,
                CounterField::Comments => &mut post.comments_count,
                CounterField::Shares => &mut post.shares_count,
            };
            *slot = (*slot + delta).max(0);
        }
        Ok(())
    }

    async fn recount_post_counters(&mut self, post_id: Uuid) -> StoreResult<()> {
        let likes = self
            .guard
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .count() as i64;
        let comments = self
            .guard
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count() as i64;
        if let Some(post) = self.guard.posts.get_mut(&post_id) {
            post.likes_count = likes;
            post.comments_count = comments;
        }
        Ok(())
    }

    async fn insert_follow(&mut self, follower_id: Uuid, followee_id: Uuid) -> StoreResult<bool> {
        let exists = self
            .guard
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id);
        if exists {
            return Ok(false);
        }
        self.guard.follows.push(Follow {
            follower_id,
            followee_id,
            created_at: now(),
        });
        Ok(true)
    }

    async fn delete_follow(&mut self, follower_id: Uuid, followee_id: Uuid) -> StoreResult<bool> {
        let before = self.guard.follows.len();
        self.guard
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.followee_id == followee_id));
        Ok(self.guard.follows.len() < before)
    }

    async fn insert_video(&mut self, new: NewVideo) -> StoreResult<Video> {
        let ts = now();
        let video = Video {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            file_url: new.file_url,
            thumbnail_url: new.thumbnail_url,
            duration_seconds: new.duration_seconds,
            views_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        self.guard.videos.insert(video.id, video.clone());
        Ok(video)
    }

    async fn video_by_id(&mut self, id: Uuid) -> StoreResult<Option<Video>> {
        Ok(self.guard.videos.get(&id).cloned())
    }

    async fn video_view(&mut self, id: Uuid) -> StoreResult<Option<VideoView>> {
        match self.guard.videos.get(&id).cloned() {
            Some(video) => Ok(Some(self.video_view_row(&video)?)),
            None => Ok(None),
        }
    }

    async fn update_video(
        &mut self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Option<Video>> {
        let ts = now();
        let Some(video) = self.guard.videos.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            video.title = title.to_string();
        }
        if let Some(description) = description {
            video.description = Some(description.to_string());
        }
        video.updated_at = ts;
        Ok(Some(video.clone()))
    }

    async fn delete_video(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.guard.videos.remove(&id).is_some())
    }

    async fn videos_page(&mut self, limit: i64, offset: i64) -> StoreResult<Vec<VideoView>> {
        let mut videos: Vec<Video> = self.guard.videos.values().cloned().collect();
        videos.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        page(videos, limit, offset)
            .iter()
            .map(|v| self.video_view_row(v))
            .collect()
    }

    async fn bump_video_views(&mut self, id: Uuid) -> StoreResult<Option<i64>> {
        match self.guard.videos.get_mut(&id) {
            Some(video) => {
                video.views_count += 1;
                Ok(Some(video.views_count))
            }
            None => Ok(None),
        }
    }

    async fn feed_page(
        &mut self,
        viewer_id: Uuid,
        cursor: Option<&FeedCursor>,
        limit: i64,
    ) -> StoreResult<Vec<FeedPost>> {
        let mut posts: Vec<Post> = self
            .guard
            .posts
            .values()
            .filter(|p| {
                p.author_id == viewer_id
                    || self
                        .guard
                        .follows
                        .iter()
                        .any(|f| f.follower_id == viewer_id && f.followee_id == p.author_id)
            })
            .filter(|p| match cursor {
                Some(cur) => before_cursor(p.created_at, p.id, cur),
                None => true,
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts.truncate(limit.max(0) as usize);
        posts.iter().map(|p| self.feed_post(p)).collect()
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        // Forget the snapshot so Drop keeps the mutated state.
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}
