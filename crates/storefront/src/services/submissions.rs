//! In-flight and placed order submissions.
//!
//! The draft lives in the session, and `tower-sessions` only persists it after
//! the response is sent. Two requests carrying the same session cookie can
//! therefore both load a draft that is not yet `Submitting`, and a widget
//! request that loaded the draft before an order was placed can write it back
//! after the submission removed it.
//!
//! The registry tracks both sides of that: a draft id can be held by one
//! submission at a time across the whole process, and the ids of drafts that
//! became orders are remembered so a draft written back to the session is
//! recognized as already placed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chopho_core::OrderId;
use moka::future::Cache;
use uuid::Uuid;

/// How long placed draft ids are remembered. Outlives the session's
/// inactivity expiry.
const PLACED_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Process-wide record of order submissions by draft id.
#[derive(Debug, Clone)]
pub struct SubmissionRegistry {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    placed: Cache<Uuid, OrderId>,
}

impl Default for SubmissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Arc::default(),
            placed: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(PLACED_TTL)
                .build(),
        }
    }

    /// Claim `draft_id` for a submission.
    ///
    /// Returns `None` if another submission already holds it. The claim is
    /// released when the returned ticket is dropped or finished.
    #[must_use]
    pub fn try_acquire(&self, draft_id: Uuid) -> Option<SubmissionTicket> {
        if self.lock().insert(draft_id) {
            Some(SubmissionTicket {
                registry: self.clone(),
                draft_id,
            })
        } else {
            None
        }
    }

    /// Whether a submission for `draft_id` is currently running.
    #[must_use]
    pub fn is_in_flight(&self, draft_id: Uuid) -> bool {
        self.lock().contains(&draft_id)
    }

    /// The order `draft_id` became, if it was placed.
    pub async fn placed_order(&self, draft_id: Uuid) -> Option<OrderId> {
        self.placed.get(&draft_id).await
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        // The set stays consistent even if a holder panicked mid-insert.
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Claim on a draft id, released on drop.
#[derive(Debug)]
pub struct SubmissionTicket {
    registry: SubmissionRegistry,
    draft_id: Uuid,
}

impl SubmissionTicket {
    /// Record that the draft became `order_id`, then release the claim.
    ///
    /// The placed record is written before the claim goes away, so the draft
    /// is never seen as neither in flight nor placed.
    pub async fn finish(self, order_id: OrderId) {
        self.registry.placed.insert(self.draft_id, order_id).await;
    }
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.draft_id);
    }
}
