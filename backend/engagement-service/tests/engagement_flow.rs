//! Interaction-service behavior: counter consistency, like uniqueness,
//! ownership enforcement, validation ordering, cascade and rollback.

mod common;

use std::sync::Arc;

use engagement_service::domain::CounterField;
use engagement_service::error::AppError;
use engagement_service::services::{
    CommentService, FollowService, LikeService, PostService, VideoInput, VideoService,
};
use engagement_service::store::{MemoryStore, RelationStore};

use common::{paging, seed_user};

#[tokio::test]
async fn counters_match_relation_rows_after_interleaved_ops() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let likes = LikeService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let carol = seed_user(&store, "carol").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    likes.like(Some(alice), post.id).await.unwrap();
    likes.like(Some(bob), post.id).await.unwrap();
    let first = comments
        .add_comment(Some(bob), post.id, "first")
        .await
        .unwrap();
    comments
        .add_comment(Some(carol), post.id, "second")
        .await
        .unwrap();
    likes.unlike(Some(alice), post.id).await.unwrap();
    comments.delete_comment(Some(bob), first.id).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let like_rows = tx.count_likes(post.id).await.unwrap();
    let comment_rows = tx.count_comments(post.id).await.unwrap();
    let settled = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    assert_eq!(like_rows, 1);
    assert_eq!(comment_rows, 1);
    assert_eq!(settled.likes_count, like_rows);
    assert_eq!(settled.comments_count, comment_rows);
}

#[tokio::test]
async fn second_like_is_rejected_without_double_count() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let likes = LikeService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    assert_eq!(likes.like(Some(bob), post.id).await.unwrap(), 1);
    let err = likes.like(Some(bob), post.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyLiked));

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.count_likes(post.id).await.unwrap(), 1);
    let settled = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(settled.likes_count, 1);
}

#[tokio::test]
async fn unlike_without_like_is_rejected_and_counter_unchanged() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let likes = LikeService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    let err = likes.unlike(Some(bob), post.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotLiked));

    let mut tx = store.begin().await.unwrap();
    let settled = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(settled.likes_count, 0);
}

#[tokio::test]
async fn only_the_comment_owner_may_edit_or_delete() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();
    let comment = comments
        .add_comment(Some(alice), post.id, "mine")
        .await
        .unwrap();

    let err = comments
        .update_comment(Some(bob), comment.id, "hijacked")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = comments
        .delete_comment(Some(bob), comment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let mut tx = store.begin().await.unwrap();
    let untouched = tx.comment_by_id(comment.id).await.unwrap().unwrap();
    let settled = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(untouched.content, "mine");
    assert_eq!(settled.comments_count, 1);
}

#[tokio::test]
async fn blank_comment_is_rejected_before_any_mutation() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    for blank in ["", "   ", "\n\t"] {
        let err = comments
            .add_comment(Some(alice), post.id, blank)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.count_comments(post.id).await.unwrap(), 0);
    let settled = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(settled.comments_count, 0);
}

#[tokio::test]
async fn blank_comment_edit_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();
    let comment = comments
        .add_comment(Some(alice), post.id, "original")
        .await
        .unwrap();

    let unchanged = comments
        .update_comment(Some(alice), comment.id, "   ")
        .await
        .unwrap();
    assert_eq!(unchanged.content, "original");

    let edited = comments
        .update_comment(Some(alice), comment.id, "edited")
        .await
        .unwrap();
    assert_eq!(edited.content, "edited");
}

#[tokio::test]
async fn anonymous_callers_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let likes = LikeService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    assert!(matches!(
        likes.like(None, post.id).await.unwrap_err(),
        AppError::Unauthorized
    ));
    assert!(matches!(
        posts.create_post(None, "anon", None).await.unwrap_err(),
        AppError::Unauthorized
    ));
}

#[tokio::test]
async fn interactions_with_missing_post_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let likes = LikeService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let ghost = uuid::Uuid::new_v4();

    assert!(matches!(
        likes.like(Some(alice), ghost).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        comments
            .add_comment(Some(alice), ghost, "hello")
            .await
            .unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments_and_likes() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let likes = LikeService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();
    likes.like(Some(bob), post.id).await.unwrap();
    let comment = comments
        .add_comment(Some(bob), post.id, "nice")
        .await
        .unwrap();

    // non-owner cannot delete
    assert!(matches!(
        posts.delete_post(Some(bob), post.id).await.unwrap_err(),
        AppError::Forbidden(_)
    ));

    posts.delete_post(Some(alice), post.id).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(tx.post_by_id(post.id).await.unwrap().is_none());
    assert_eq!(tx.count_likes(post.id).await.unwrap(), 0);
    assert_eq!(tx.count_comments(post.id).await.unwrap(), 0);
    assert!(tx.comment_by_id(comment.id).await.unwrap().is_none());
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn dropped_transaction_rolls_back_cleanly() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_like(bob.0, post.id).await.unwrap();
    tx.apply_counter_delta(post.id, CounterField::Likes, 1)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.count_likes(post.id).await.unwrap(), 0);
    let settled = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(settled.likes_count, 0);
}

#[tokio::test]
async fn counter_decrement_saturates_at_zero() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.apply_counter_delta(post.id, CounterField::Likes, -1)
        .await
        .unwrap();
    tx.apply_counter_delta(post.id, CounterField::Shares, -1)
        .await
        .unwrap();
    tx.apply_counter_delta(post.id, CounterField::Shares, 1)
        .await
        .unwrap();
    let clamped = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(clamped.likes_count, 0);
    assert_eq!(clamped.shares_count, 1);
}

#[tokio::test]
async fn recount_repairs_a_skewed_counter() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let likes = LikeService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();
    likes.like(Some(bob), post.id).await.unwrap();

    // skew the cache, then reconcile it from the relation rows
    let mut tx = store.begin().await.unwrap();
    tx.apply_counter_delta(post.id, CounterField::Likes, 5)
        .await
        .unwrap();
    engagement_service::services::counters::recount(tx.as_mut(), post.id)
        .await
        .unwrap();
    let repaired = tx.post_by_id(post.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(repaired.likes_count, 1);
    assert_eq!(repaired.comments_count, 0);
}

#[tokio::test]
async fn follow_is_idempotent_and_self_follow_rejected() {
    let store = Arc::new(MemoryStore::new());
    let follows = FollowService::new(store.clone());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;

    assert!(follows.follow(Some(alice), bob.0).await.unwrap());
    assert!(!follows.follow(Some(alice), bob.0).await.unwrap());
    assert!(matches!(
        follows.follow(Some(alice), alice.0).await.unwrap_err(),
        AppError::InvalidInput(_)
    ));
    assert!(matches!(
        follows
            .follow(Some(alice), uuid::Uuid::new_v4())
            .await
            .unwrap_err(),
        AppError::NotFound(_)
    ));

    assert!(follows.unfollow(Some(alice), bob.0).await.unwrap());
    assert!(!follows.unfollow(Some(alice), bob.0).await.unwrap());
}

#[tokio::test]
async fn every_video_read_counts_a_view() {
    let store = Arc::new(MemoryStore::new());
    let videos = VideoService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let video = videos
        .create_video(
            Some(alice),
            VideoInput {
                title: "clip".to_string(),
                description: None,
                file_url: "/uploads/videos/clip.mp4".to_string(),
                thumbnail_url: None,
                duration_seconds: 120,
            },
        )
        .await
        .unwrap();
    assert_eq!(video.views_count, 0);

    // no per-viewer uniqueness: repeat reads keep counting
    assert_eq!(videos.get_video(Some(bob), video.id).await.unwrap().views_count, 1);
    assert_eq!(videos.get_video(Some(bob), video.id).await.unwrap().views_count, 2);
    assert_eq!(
        videos.get_video(Some(alice), video.id).await.unwrap().views_count,
        3
    );

    // ownership still guards mutation
    assert!(matches!(
        videos
            .update_video(Some(bob), video.id, Some("stolen"), None)
            .await
            .unwrap_err(),
        AppError::Forbidden(_)
    ));
    videos.delete_video(Some(alice), video.id).await.unwrap();
    assert!(matches!(
        videos.get_video(Some(bob), video.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}
