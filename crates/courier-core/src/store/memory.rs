//! In-memory store implementation.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{JobRecord, JobStatus, QueueStore, StoreCounts};
use crate::error::CourierError;
use crate::job::JobId;

/// Tuning for the in-memory store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a claimed record stays invisible before it is handed out
    /// again. Covers claimants that died mid-attempt.
    pub visibility_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

/// Deadline entry for the backoff and lease heaps.
///
/// Reverse ordering so `BinaryHeap` acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Deadline {
    at: Instant,
    id: JobId,
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.at.cmp(&self.at).then_with(|| other.id.cmp(&self.id))
    }
}

/// In-memory store state.
struct StoreState {
    /// All records (single source of truth).
    records: HashMap<JobId, JobRecord>,

    /// Ready queue (ids only).
    ready: VecDeque<JobId>,

    /// Failed records waiting out their retry backoff.
    delayed: BinaryHeap<Deadline>,

    /// Visibility leases for in-progress records.
    leases: BinaryHeap<Deadline>,

    config: StoreConfig,
}

impl StoreState {
    fn new(config: StoreConfig) -> Self {
        Self {
            records: HashMap::new(),
            ready: VecDeque::new(),
            delayed: BinaryHeap::new(),
            leases: BinaryHeap::new(),
            config,
        }
    }

    /// Requeue failed records whose backoff elapsed and in-progress records
    /// whose visibility lease expired.
    fn promote_due(&mut self) {
        let now = Instant::now();

        while self.delayed.peek().is_some_and(|entry| entry.at <= now) {
            let Some(entry) = self.delayed.pop() else { break };
            if let Some(record) = self.records.get_mut(&entry.id)
                && record.status == JobStatus::Failed
            {
                record.requeue();
                self.ready.push_back(entry.id);
            }
        }

        while self.leases.peek().is_some_and(|entry| entry.at <= now) {
            let Some(entry) = self.leases.pop() else { break };
            if let Some(record) = self.records.get_mut(&entry.id)
                && record.status == JobStatus::InProgress
            {
                // claimant vanished mid-attempt; hand the record out again
                record.requeue();
                self.ready.push_back(entry.id);
            }
        }
    }

    /// Earliest moment anything scheduled becomes due.
    fn next_deadline(&self) -> Option<Instant> {
        let delayed = self.delayed.peek().map(|entry| entry.at);
        let lease = self.leases.peek().map(|entry| entry.at);
        match (delayed, lease) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn counts(&self) -> StoreCounts {
        let mut counts = StoreCounts::default();
        for record in self.records.values() {
            match record.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::InProgress => counts.in_progress += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::DeadLettered => counts.dead_lettered += 1,
            }
        }
        counts
    }
}

/// In-memory [`QueueStore`].
///
/// A single mutex guards all state; claims pop from the ready queue under
/// the lock, which is what makes them atomic. The lock is never held across
/// an await point, so one slow handler cannot stall other claimants.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    notify: Notify,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            state: Mutex::new(StoreState::new(config)),
            notify: Notify::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn push(&self, record: JobRecord) -> Result<(), CourierError> {
        {
            let mut state = self.state.lock().await;
            state.ready.push_back(record.id);
            state.records.insert(record.id, record);
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn claim_next(&self, timeout: Duration) -> Result<Option<JobRecord>, CourierError> {
        let deadline = Instant::now() + timeout;

        loop {
            let next_wake = {
                let mut state = self.state.lock().await;
                state.promote_due();

                if let Some(id) = state.ready.pop_front() {
                    let visibility = state.config.visibility_timeout;
                    if let Some(record) = state.records.get_mut(&id) {
                        record.start_attempt();
                        let snapshot = record.clone();
                        state.leases.push(Deadline {
                            at: Instant::now() + visibility,
                            id,
                        });
                        return Ok(Some(snapshot));
                    }
                    // record already gone; look again immediately
                    continue;
                }

                state.next_deadline()
            };

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // Wait for a push/retry notification, the next scheduled
            // deadline, or the caller's timeout, whichever comes first.
            let wake = next_wake.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(wake.into()) => {}
            }
        }
    }

    async fn mark_completed(&self, id: JobId) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.get_mut(&id) {
            record.mark_completed();
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: JobId,
        error: String,
        retry_in: Duration,
    ) -> Result<(), CourierError> {
        {
            let mut state = self.state.lock().await;
            let Some(record) = state.records.get_mut(&id) else {
                return Ok(());
            };
            if record.status.is_terminal() {
                return Ok(());
            }
            record.mark_failed(error);
            state.delayed.push(Deadline {
                at: Instant::now() + retry_in,
                id,
            });
        }
        // Parked claimants must recompute their wake deadline.
        self.notify.notify_one();
        Ok(())
    }

    async fn mark_dead_lettered(&self, id: JobId, error: String) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.get_mut(&id) {
            record.mark_dead_lettered(error);
        }
        Ok(())
    }

    async fn fetch(&self, id: JobId) -> Result<Option<JobRecord>, CourierError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&id).cloned())
    }

    async fn counts(&self) -> Result<StoreCounts, CourierError> {
        let state = self.state.lock().await;
        Ok(state.counts())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::job::JobKey;

    fn record(key: &str) -> JobRecord {
        JobRecord::new(JobKey::new(key), json!({"n": 1}))
    }

    fn short_lease() -> StoreConfig {
        StoreConfig {
            visibility_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn push_then_claim_returns_identical_key_and_payload() {
        let store = InMemoryStore::default();
        let pushed = JobRecord::new(
            JobKey::new("RegistrationMail"),
            json!({"studentName": "Ana", "TotalPrice": 357.0}),
        );
        let id = pushed.id;
        store.push(pushed.clone()).await.unwrap();

        let claimed = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .expect("one record is ready");

        assert_eq!(claimed.id, id);
        assert_eq!(claimed.key, pushed.key);
        assert_eq!(claimed.payload, pushed.payload);
        assert_eq!(claimed.status, JobStatus::InProgress);
        assert_eq!(claimed.attempts, 1);
        assert!(claimed.started_at.is_some());
    }

    #[tokio::test]
    async fn claim_times_out_on_an_empty_store() {
        let store = InMemoryStore::default();

        let started = Instant::now();
        let claimed = store.claim_next(Duration::from_millis(50)).await.unwrap();

        assert!(claimed.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn counts_track_the_lifecycle() {
        let store = InMemoryStore::default();
        store.push(record("a")).await.unwrap();
        store.push(record("b")).await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.pending, 2);

        let claimed = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        let counts = store.counts().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.in_progress, 1);

        store.mark_completed(claimed.id).await.unwrap();
        let counts = store.counts().await.unwrap();
        assert_eq!(counts.completed, 1);
    }

    #[tokio::test]
    async fn failed_record_becomes_claimable_after_its_backoff() {
        let store = InMemoryStore::default();
        store.push(record("flaky")).await.unwrap();

        let claimed = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        store
            .mark_failed(claimed.id, "boom".into(), Duration::from_millis(40))
            .await
            .unwrap();

        // still invisible while the backoff runs
        let early = store.claim_next(Duration::from_millis(10)).await.unwrap();
        assert!(early.is_none());

        let retried = store
            .claim_next(Duration::from_millis(500))
            .await
            .unwrap()
            .expect("backoff elapsed");
        assert_eq!(retried.id, claimed.id);
        assert_eq!(retried.attempts, 2);
        assert_eq!(retried.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn expired_lease_makes_the_record_claimable_again() {
        let store = InMemoryStore::new(short_lease());
        store.push(record("abandoned")).await.unwrap();

        let first = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        // claimant "dies" here: no terminal mark ever arrives

        let second = store
            .claim_next(Duration::from_millis(500))
            .await
            .unwrap()
            .expect("lease expired");
        assert_eq!(second.id, first.id);
        assert_eq!(second.attempts, 2);
    }

    #[tokio::test]
    async fn completed_record_is_not_reclaimed_when_its_lease_expires() {
        let store = InMemoryStore::new(short_lease());
        store.push(record("done")).await.unwrap();

        let claimed = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        store.mark_completed(claimed.id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        let reclaimed = store.claim_next(Duration::from_millis(20)).await.unwrap();
        assert!(reclaimed.is_none());
    }

    #[tokio::test]
    async fn terminal_marks_are_idempotent() {
        let store = InMemoryStore::default();
        store.push(record("once")).await.unwrap();
        let claimed = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();

        store.mark_completed(claimed.id).await.unwrap();
        store.mark_completed(claimed.id).await.unwrap();
        store
            .mark_dead_lettered(claimed.id, "too late".into())
            .await
            .unwrap();
        store
            .mark_failed(claimed.id, "too late".into(), Duration::from_millis(1))
            .await
            .unwrap();

        let record = store.fetch(claimed.id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.last_error.is_none());

        // marking an unknown id is a quiet no-op too
        store.mark_completed(JobId::generate()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_never_hand_out_the_same_record_twice() {
        let store = Arc::new(InMemoryStore::default());
        let total = 20;

        let mut ids = HashSet::new();
        for _ in 0..total {
            let record = record("fanout");
            ids.insert(record.id);
            store.push(record).await.unwrap();
        }

        let mut claimers = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            claimers.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                while let Some(record) =
                    store.claim_next(Duration::from_millis(50)).await.unwrap()
                {
                    claimed.push(record.id);
                }
                claimed
            }));
        }

        let mut seen = Vec::new();
        for claimer in claimers {
            seen.extend(claimer.await.unwrap());
        }

        assert_eq!(seen.len(), total);
        assert_eq!(seen.iter().copied().collect::<HashSet<_>>(), ids);
    }
}
