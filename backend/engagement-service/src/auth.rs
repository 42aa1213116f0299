//! Caller identity and ownership checks.
//!
//! The core never authenticates; the host supplies the current caller's user
//! id (or none, for anonymous requests) and every mutate/delete path
//! authorizes through the single `is_owner` predicate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// The authenticated caller's user id, as supplied by the host's identity
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity(pub Uuid);

/// Reject anonymous callers before any store access.
pub fn require_identity(identity: Option<Identity>) -> Result<Identity> {
    identity.ok_or(AppError::Unauthorized)
}

/// Identity-equality ownership check (not a role check).
pub fn is_owner(identity: Identity, owner_id: Uuid) -> bool {
    identity.0 == owner_id
}
