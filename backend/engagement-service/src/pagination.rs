//! Pagination policy shared by the feed builder and the listing queries.
//!
//! The feed pages with an opaque cursor over the total order
//! `(created_at DESC, id DESC)`, which stays stable under concurrent inserts;
//! offset paging is allowed only for low-churn per-owner listings.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Configured page-size bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "max_limit")]
    pub max_limit: i64,
}

fn default_limit() -> i64 {
    20
}

fn max_limit() -> i64 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: max_limit(),
        }
    }
}

impl PaginationConfig {
    /// Missing, zero or negative limits fall back to the default; anything
    /// above the hard ceiling is clamped to it.
    pub fn normalize_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(v) if v > 0 => v.min(self.max_limit),
            _ => self.default_limit,
        }
    }

    /// Offsets are clamped to >= 0; an offset past the end of a collection
    /// yields an empty page, not an error.
    pub fn normalize_offset(&self, requested: Option<i64>) -> i64 {
        requested.unwrap_or(0).max(0)
    }
}

/// Cursor for feed pagination: the sort key of the last row of the previous
/// page. Encoded as base64 "micros:post_id" so callers treat it as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub post_id: Uuid,
}

impl FeedCursor {
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.created_at.timestamp_micros(), self.post_id);
        general_purpose::STANDARD.encode(raw)
    }

    pub fn decode(token: &str) -> Result<Self> {
        let bytes = general_purpose::STANDARD
            .decode(token)
            .map_err(|_| AppError::InvalidInput("invalid cursor format".to_string()))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| AppError::InvalidInput("invalid cursor encoding".to_string()))?;

        let (ts_str, id_str) = raw
            .split_once(':')
            .ok_or_else(|| AppError::InvalidInput("invalid cursor format".to_string()))?;
        let micros = ts_str
            .parse::<i64>()
            .map_err(|_| AppError::InvalidInput("invalid cursor timestamp".to_string()))?;
        let created_at = DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| AppError::InvalidInput("invalid cursor timestamp".to_string()))?;
        let post_id = Uuid::parse_str(id_str)
            .map_err(|_| AppError::InvalidInput("invalid cursor post id".to_string()))?;

        Ok(Self {
            created_at,
            post_id,
        })
    }
}
