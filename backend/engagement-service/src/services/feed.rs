use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::auth::{self, Identity};
use crate::domain::FeedPost;
use crate::error::Result;
use crate::pagination::{FeedCursor, PaginationConfig};
use crate::store::RelationStore;

/// One page of the home feed
#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    /// Opaque token for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Feed builder.
///
/// Merges the viewer's own posts with posts from followed users, newest
/// first with post id as the tie-break, and pages with a cursor over that
/// total order. Unlike offset paging, a cursor page never skips or
/// duplicates a row when new posts are inserted between fetches.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn RelationStore>,
    paging: PaginationConfig,
}

impl FeedService {
    pub fn new(store: Arc<dyn RelationStore>, paging: PaginationConfig) -> Self {
        Self { store, paging }
    }

    pub async fn build_feed(
        &self,
        viewer: Option<Identity>,
        cursor: Option<&str>,
        page_size: Option<i64>,
    ) -> Result<FeedPage> {
        let viewer = auth::require_identity(viewer)?;
        let limit = self.paging.normalize_limit(page_size);
        let cursor = match cursor {
            Some(token) if !token.is_empty() => Some(FeedCursor::decode(token)?),
            _ => None,
        };

        // Fetch one extra row to learn whether another page exists.
        let mut tx = self.store.begin().await?;
        let mut posts = tx.feed_page(viewer.0, cursor.as_ref(), limit + 1).await?;
        tx.commit().await?;

        let has_more = posts.len() as i64 > limit;
        if has_more {
            posts.truncate(limit as usize);
        }
        let next_cursor = if has_more {
            posts.last().map(|p| {
                FeedCursor {
                    created_at: p.created_at,
                    post_id: p.id,
                }
                .encode()
            })
        } else {
            None
        };

        debug!(
            "Feed built: viewer={} rows={} has_more={}",
            viewer.0,
            posts.len(),
            has_more
        );

        Ok(FeedPage {
            posts,
            next_cursor,
            has_more,
        })
    }
}
