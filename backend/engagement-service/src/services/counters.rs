//! Counter maintainer.
//!
//! Keeps the cached engagement counters on a post consistent with their
//! relation rows. Every delta runs inside the caller's open transaction as a
//! store-level atomic increment clamped at 0, so two concurrent deltas on
//! the same post cannot lose an update and a decrement can never drive a
//! counter negative.

use tracing::debug;
use uuid::Uuid;

use crate::domain::CounterField;
use crate::store::{StoreResult, StoreTx};

/// Add `delta` (+1 or -1) to the named counter of `post_id` within `tx`.
///
/// The row mutation that triggered the delta must sit in the same
/// transaction: either both commit or both roll back.
pub async fn apply_delta(
    tx: &mut dyn StoreTx,
    post_id: Uuid,
    field: CounterField,
    delta: i64,
) -> StoreResult<()> {
    tx.apply_counter_delta(post_id, field, delta).await?;
    debug!(
        "Applied counter delta: post={} field={} delta={}",
        post_id,
        field.column(),
        delta
    );
    Ok(())
}

/// Reconcile both cached counters of `post_id` from their relation rows.
///
/// Not part of any interaction path - counters stay exact through
/// `apply_delta` - but lets operators repair a post after manual data
/// surgery.
pub async fn recount(tx: &mut dyn StoreTx, post_id: Uuid) -> StoreResult<()> {
    tx.recount_post_counters(post_id).await
}
