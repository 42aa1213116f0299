//! Shared test fixtures: a fresh in-memory store and seeded users.

use std::time::Duration;

use engagement_service::auth::Identity;
use engagement_service::domain::NewUser;
use engagement_service::pagination::PaginationConfig;
use engagement_service::store::{MemoryStore, RelationStore};

pub fn paging() -> PaginationConfig {
    PaginationConfig::default()
}

pub async fn seed_user(store: &MemoryStore, name: &str) -> Identity {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .insert_user(NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            avatar_url: None,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    Identity(user.id)
}

/// Space out inserts so creation timestamps are strictly increasing at the
/// store's microsecond resolution.
#[allow(dead_code)]
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(2)).await;
}
