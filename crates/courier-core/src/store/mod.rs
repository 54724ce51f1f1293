//! Queue store: the single shared resource all coordination funnels through.

mod memory;
mod record;
mod retry;

pub use memory::{InMemoryStore, StoreConfig};
pub use record::{JobRecord, JobStatus};
pub use retry::RetryPolicy;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CourierError;
use crate::job::JobId;

/// Per-state record counters for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// Store port (interface).
///
/// Producers push records; dispatchers claim and mark them. `claim_next`
/// hands each pending record to exactly one caller; that atomic claim is
/// the only cross-worker coordination this core relies on, so workers need
/// no lock of their own.
///
/// The in-process [`InMemoryStore`] serves tests, development, and
/// single-process deployments; this trait is the seam where a durable
/// external backing (SQL, Redis) plugs in.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Durably append a new pending record.
    async fn push(&self, record: JobRecord) -> Result<(), CourierError>;

    /// Claim the next ready record, blocking up to `timeout`.
    ///
    /// Moves the record to `in_progress`, increments `attempts`, stamps
    /// `started_at`, and starts a visibility lease; if the claimant dies
    /// before marking a terminal state, the lease expiry makes the record
    /// claimable again (at-least-once delivery). Returns `Ok(None)` when
    /// nothing became ready within `timeout`.
    async fn claim_next(&self, timeout: Duration) -> Result<Option<JobRecord>, CourierError>;

    /// Terminal success. Idempotent: repeat calls and calls on missing or
    /// already-terminal records are no-ops.
    async fn mark_completed(&self, id: JobId) -> Result<(), CourierError>;

    /// Record a failed attempt and make the record pending again once
    /// `retry_in` has elapsed (the store's visibility mechanism enforces
    /// the backoff delay). No-op on terminal records.
    async fn mark_failed(
        &self,
        id: JobId,
        error: String,
        retry_in: Duration,
    ) -> Result<(), CourierError>;

    /// Terminal failure. Idempotent, like `mark_completed`.
    async fn mark_dead_lettered(&self, id: JobId, error: String) -> Result<(), CourierError>;

    /// Snapshot of a single record, if it exists.
    async fn fetch(&self, id: JobId) -> Result<Option<JobRecord>, CourierError>;

    /// Per-state counters.
    async fn counts(&self) -> Result<StoreCounts, CourierError>;
}
