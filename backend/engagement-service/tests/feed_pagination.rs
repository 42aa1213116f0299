//! Feed ordering, cursor stability under concurrent inserts, and the shared
//! pagination policy on listing paths.

mod common;

use std::sync::Arc;

use engagement_service::error::AppError;
use engagement_service::services::{CommentService, FeedService, FollowService, PostService};
use engagement_service::store::MemoryStore;
use uuid::Uuid;

use common::{paging, seed_user, tick};

#[tokio::test]
async fn feed_is_newest_first_and_cursor_pages_are_stable() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let follows = FollowService::new(store.clone());
    let feed = FeedService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    follows.follow(Some(alice), bob.0).await.unwrap();

    let mut ids: Vec<Uuid> = Vec::new();
    for n in 1..=5 {
        ids.push(
            posts
                .create_post(Some(bob), &format!("p{n}"), None)
                .await
                .unwrap()
                .id,
        );
        tick().await;
    }

    let page1 = feed
        .build_feed(Some(alice), None, Some(2))
        .await
        .unwrap();
    assert_eq!(
        page1.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![ids[4], ids[3]]
    );
    assert!(page1.has_more);

    // a post landing between page fetches must not shift the next page
    let p6 = posts.create_post(Some(bob), "p6", None).await.unwrap();

    let page2 = feed
        .build_feed(Some(alice), page1.next_cursor.as_deref(), Some(2))
        .await
        .unwrap();
    assert_eq!(
        page2.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );
    assert!(page2.has_more);

    let page3 = feed
        .build_feed(Some(alice), page2.next_cursor.as_deref(), Some(2))
        .await
        .unwrap();
    assert_eq!(
        page3.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![ids[0]]
    );
    assert!(!page3.has_more);
    assert!(page3.next_cursor.is_none());

    // no post skipped or duplicated across the three pages
    let mut seen: Vec<Uuid> = page1
        .posts
        .iter()
        .chain(page2.posts.iter())
        .chain(page3.posts.iter())
        .map(|p| p.id)
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);

    // the new post heads a fresh first page
    let fresh = feed.build_feed(Some(alice), None, Some(10)).await.unwrap();
    assert_eq!(fresh.posts.first().map(|p| p.id), Some(p6.id));
    assert_eq!(fresh.posts.len(), 6);
}

#[tokio::test]
async fn feed_merges_own_posts_and_excludes_strangers() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let follows = FollowService::new(store.clone());
    let feed = FeedService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let carol = seed_user(&store, "carol").await;
    follows.follow(Some(alice), bob.0).await.unwrap();

    let own = posts.create_post(Some(alice), "mine", None).await.unwrap();
    tick().await;
    let followed = posts.create_post(Some(bob), "bobs", None).await.unwrap();
    tick().await;
    posts.create_post(Some(carol), "strangers", None).await.unwrap();

    let page = feed.build_feed(Some(alice), None, None).await.unwrap();
    let ids: Vec<Uuid> = page.posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![followed.id, own.id]);

    // rows carry the author summary, assembled in the same query
    let bob_row = page.posts.iter().find(|p| p.id == followed.id).unwrap();
    assert_eq!(bob_row.author_username, "bob");
    assert_eq!(bob_row.author_email, "bob@example.com");
}

#[tokio::test]
async fn page_size_is_normalized_and_bad_cursors_rejected() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let feed = FeedService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    for n in 0..25 {
        posts
            .create_post(Some(alice), &format!("post {n}"), None)
            .await
            .unwrap();
    }

    // zero/negative page sizes fall back to the default of 20
    let page = feed.build_feed(Some(alice), None, Some(0)).await.unwrap();
    assert_eq!(page.posts.len(), 20);
    let page = feed.build_feed(Some(alice), None, Some(-3)).await.unwrap();
    assert_eq!(page.posts.len(), 20);

    // oversized requests clamp to the hard ceiling
    let page = feed
        .build_feed(Some(alice), None, Some(10_000))
        .await
        .unwrap();
    assert_eq!(page.posts.len(), 25);

    assert!(matches!(
        feed.build_feed(Some(alice), Some("!!not-a-cursor!!"), None)
            .await
            .unwrap_err(),
        AppError::InvalidInput(_)
    ));

    assert!(matches!(
        feed.build_feed(None, None, None).await.unwrap_err(),
        AppError::Unauthorized
    ));
}

#[tokio::test]
async fn offset_listings_clamp_and_return_empty_past_the_end() {
    let store = Arc::new(MemoryStore::new());
    let posts = PostService::new(store.clone(), paging());
    let comments = CommentService::new(store.clone(), paging());

    let alice = seed_user(&store, "alice").await;
    let bob = seed_user(&store, "bob").await;
    let post = posts.create_post(Some(alice), "hello", None).await.unwrap();
    for n in 0..3 {
        comments
            .add_comment(Some(bob), post.id, &format!("c{n}"))
            .await
            .unwrap();
        tick().await;
    }

    let listed = comments
        .comments_for_post(post.id, Some(2), Some(0))
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    // newest first
    assert_eq!(listed[0].content, "c2");

    // negative offset clamps to 0, offset past the end yields an empty page
    let listed = comments
        .comments_for_post(post.id, None, Some(-5))
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    let listed = comments
        .comments_for_post(post.id, None, Some(100))
        .await
        .unwrap();
    assert!(listed.is_empty());

    let mine = posts.my_posts(Some(alice), None, Some(50)).await.unwrap();
    assert!(mine.is_empty());
    let mine = posts.my_posts(Some(alice), None, None).await.unwrap();
    assert_eq!(mine.len(), 1);
}
