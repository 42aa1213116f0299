use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::{
    Comment, CommentView, CounterField, FeedPost, Like, LikeView, NewComment, NewPost, NewUser,
    NewVideo, Post, User, Video, VideoView,
};
use crate::pagination::FeedCursor;
use crate::store::{RelationStore, StoreError, StoreResult, StoreTx};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            other => StoreError::Database(other.to_string()),
        }
    }
}

const POST_COLUMNS: &str = "id, author_id, content, media_url, likes_count, comments_count, \
                            shares_count, created_at, updated_at";

const POST_VIEW_SELECT: &str = r#"
    SELECT p.id, p.content, p.media_url, p.likes_count, p.comments_count, p.shares_count,
           p.created_at, p.updated_at,
           u.id AS author_id, u.username AS author_username, u.email AS author_email,
           u.avatar_url AS author_avatar_url
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

/// PostgreSQL relation store (source of truth)
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool using the configured bounds.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply the schema migrations shipped with the crate.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RelationStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// One open PostgreSQL transaction. Dropped uncommitted, sqlx rolls it back.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_user(&mut self, new: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, avatar_url, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, email, username, avatar_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.email)
        .bind(new.username)
        .bind(new.avatar_url)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, username, avatar_url, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn insert_post(&mut self, new: NewPost) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, author_id, content, media_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.author_id)
        .bind(new.content)
        .bind(new.media_url)
        .fetch_one(&mut *self.tx)
        .await?;

        debug!("Created post {} by {}", post.id, post.author_id);
        Ok(post)
    }

    async fn post_by_id(&mut self, id: Uuid) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(post)
    }

    async fn post_view(&mut self, id: Uuid) -> StoreResult<Option<FeedPost>> {
        let view = sqlx::query_as::<_, FeedPost>(&format!("{POST_VIEW_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(view)
    }

    async fn update_post(
        &mut self,
        id: Uuid,
        content: Option<&str>,
        media_url: Option<&str>,
    ) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET content = COALESCE($2, content),
                media_url = COALESCE($3, media_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(content)
        .bind(media_url)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(post)
    }

    async fn delete_post(&mut self, id: Uuid) -> StoreResult<bool> {
        // comments and likes cascade at the schema level
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn posts_by_author(
        &mut self,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<FeedPost>> {
        let posts = sqlx::query_as::<_, FeedPost>(&format!(
            r#"{POST_VIEW_SELECT}
            WHERE p.author_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(posts)
    }

    async fn insert_like(&mut self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<Like>> {
        // DO NOTHING on the (user_id, post_id) unique constraint: no row back
        // means the pair already exists, detected inside this transaction.
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (id, user_id, post_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING id, user_id, post_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(like)
    }

    async fn delete_like(&mut self, user_id: Uuid, post_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn likes_for_post(
        &mut self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<LikeView>> {
        let likes = sqlx::query_as::<_, LikeView>(
            r#"
            SELECT l.user_id, u.username, u.email, u.avatar_url, l.created_at AS liked_at
            FROM likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.post_id = $1
            ORDER BY l.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(likes)
    }

    async fn count_likes(&mut self, post_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    async fn insert_comment(&mut self, new: NewComment) -> StoreResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, post_id, author_id, content, likes_count, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.post_id)
        .bind(new.author_id)
        .bind(new.content)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(comment)
    }

    async fn comment_by_id(&mut self, id: Uuid) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, author_id, content, likes_count, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(comment)
    }

    async fn update_comment_content(&mut self, id: Uuid, content: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn comments_for_post(
        &mut self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.post_id, c.content, c.likes_count, c.created_at, c.updated_at,
                   u.id AS author_id, u.username AS author_username, u.email AS author_email,
                   u.avatar_url AS author_avatar_url
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(comments)
    }

    async fn count_comments(&mut self, post_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    async fn apply_counter_delta(
        &mut self,
        post_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> StoreResult<()> {
        // Single-row atomic arithmetic, clamped at 0; the column name comes
        // from a closed enum, never from caller input.
        let sql = format!(
            "UPDATE posts SET {col} = GREATEST({col} + $2, 0) WHERE id = $1",
            col = field.column()
        );
        sqlx::query(&sql)
            .bind(post_id)
            .bind(delta)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn recount_post_counters(&mut self, post_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET likes_count = (SELECT COUNT(*) FROM likes WHERE post_id = posts.id),
                comments_count = (SELECT COUNT(*) FROM comments WHERE post_id = posts.id)
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_follow(&mut self, follower_id: Uuid, followee_id: Uuid) -> StoreResult<bool> {
        let inserted = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            RETURNING follower_id
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(inserted.is_some())
    }

    async fn delete_follow(&mut self, follower_id: Uuid, followee_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(follower_id)
                .bind(followee_id)
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_video(&mut self, new: NewVideo) -> StoreResult<Video> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (id, owner_id, title, description, file_url, thumbnail_url,
                                duration_seconds, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING id, owner_id, title, description, file_url, thumbnail_url,
                      duration_seconds, views_count, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.owner_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.file_url)
        .bind(new.thumbnail_url)
        .bind(new.duration_seconds)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(video)
    }

    async fn video_by_id(&mut self, id: Uuid) -> StoreResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, owner_id, title, description, file_url, thumbnail_url,
                   duration_seconds, views_count, created_at, updated_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(video)
    }

    async fn video_view(&mut self, id: Uuid) -> StoreResult<Option<VideoView>> {
        let view = sqlx::query_as::<_, VideoView>(
            r#"
            SELECT v.id, v.title, v.description, v.file_url, v.thumbnail_url,
                   v.duration_seconds, v.views_count, v.created_at, v.updated_at,
                   u.id AS owner_id, u.username AS owner_username, u.email AS owner_email
            FROM videos v
            JOIN users u ON u.id = v.owner_id
            WHERE v.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(view)
    }

    async fn update_video(
        &mut self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, description, file_url, thumbnail_url,
                      duration_seconds, views_count, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(video)
    }

    async fn delete_video(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn videos_page(&mut self, limit: i64, offset: i64) -> StoreResult<Vec<VideoView>> {
        let videos = sqlx::query_as::<_, VideoView>(
            r#"
            SELECT v.id, v.title, v.description, v.file_url, v.thumbnail_url,
                   v.duration_seconds, v.views_count, v.created_at, v.updated_at,
                   u.id AS owner_id, u.username AS owner_username, u.email AS owner_email
            FROM videos v
            JOIN users u ON u.id = v.owner_id
            ORDER BY v.created_at DESC, v.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(videos)
    }

    async fn bump_video_views(&mut self, id: Uuid) -> StoreResult<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE videos SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn feed_page(
        &mut self,
        viewer_id: Uuid,
        cursor: Option<&FeedCursor>,
        limit: i64,
    ) -> StoreResult<Vec<FeedPost>> {
        // Keyset predicate over the (created_at, id) total order: strictly
        // less than the cursor pair, so pages never skip or duplicate rows
        // when new posts land between fetches.
        let posts = if let Some(cur) = cursor {
            sqlx::query_as::<_, FeedPost>(&format!(
                r#"{POST_VIEW_SELECT}
                WHERE (p.author_id = $1
                       OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = $1))
                  AND (p.created_at, p.id) < ($2, $3)
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT $4
                "#
            ))
            .bind(viewer_id)
            .bind(cur.created_at)
            .bind(cur.post_id)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?
        } else {
            sqlx::query_as::<_, FeedPost>(&format!(
                r#"{POST_VIEW_SELECT}
                WHERE (p.author_id = $1
                       OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = $1))
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT $2
                "#
            ))
            .bind(viewer_id)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?
        };

        Ok(posts)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
