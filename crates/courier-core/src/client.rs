//! Producer-side queue client.

use std::sync::Arc;

use crate::error::CourierError;
use crate::job::{Job, JobId, JobKey};
use crate::store::{JobRecord, QueueStore};

/// Producer API used by request handlers after their primary mutation has
/// been committed.
///
/// Fire-and-forget: `enqueue` returns as soon as the store has durably
/// accepted the record. It never waits on execution and never reports
/// post-enqueue failures; those are observable only through the record's
/// status and the dead-letter state.
///
/// The client deliberately holds no registry. Whether a key has a handler
/// is discovered lazily at dispatch time, where an unknown key
/// dead-letters.
#[derive(Clone)]
pub struct QueueClient {
    store: Arc<dyn QueueStore>,
}

impl QueueClient {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Enqueue a typed job.
    pub async fn enqueue<J: Job>(&self, job: &J) -> Result<JobId, CourierError> {
        let payload = serde_json::to_value(job)?;
        self.enqueue_raw(JobKey::new(J::KEY), payload).await
    }

    /// Enqueue by key with an already-built JSON payload.
    ///
    /// The only enqueue-time validation is that the key is non-empty;
    /// a `StoreUnavailable` error means the record was not accepted and the
    /// caller decides whether to fail its own request or proceed without
    /// the deferred delivery.
    pub async fn enqueue_raw(
        &self,
        key: JobKey,
        payload: serde_json::Value,
    ) -> Result<JobId, CourierError> {
        if key.as_str().is_empty() {
            return Err(CourierError::EmptyJobKey);
        }

        let record = JobRecord::new(key, payload);
        let id = record.id;
        tracing::debug!(job_id = %id, key = %record.key, "enqueuing job");
        self.store.push(record).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::store::{InMemoryStore, JobStatus, StoreCounts};

    #[derive(Debug, Serialize, Deserialize)]
    struct WelcomeMail {
        name: String,
        total: f64,
    }

    impl Job for WelcomeMail {
        const KEY: &'static str = "WelcomeMail";
    }

    /// Store whose writes always fail, as if the backing service were down.
    struct DownStore;

    #[async_trait]
    impl QueueStore for DownStore {
        async fn push(&self, _record: JobRecord) -> Result<(), CourierError> {
            Err(CourierError::StoreUnavailable("connection refused".into()))
        }

        async fn claim_next(
            &self,
            _timeout: Duration,
        ) -> Result<Option<JobRecord>, CourierError> {
            Err(CourierError::StoreUnavailable("connection refused".into()))
        }

        async fn mark_completed(&self, _id: JobId) -> Result<(), CourierError> {
            Ok(())
        }

        async fn mark_failed(
            &self,
            _id: JobId,
            _error: String,
            _retry_in: Duration,
        ) -> Result<(), CourierError> {
            Ok(())
        }

        async fn mark_dead_lettered(&self, _id: JobId, _error: String) -> Result<(), CourierError> {
            Ok(())
        }

        async fn fetch(&self, _id: JobId) -> Result<Option<JobRecord>, CourierError> {
            Ok(None)
        }

        async fn counts(&self) -> Result<StoreCounts, CourierError> {
            Ok(StoreCounts::default())
        }
    }

    #[tokio::test]
    async fn typed_enqueue_writes_a_pending_record() {
        let store = Arc::new(InMemoryStore::default());
        let client = QueueClient::new(store.clone());

        let id = client
            .enqueue(&WelcomeMail {
                name: "Ana".into(),
                total: 357.0,
            })
            .await
            .unwrap();

        let record = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(record.key, JobKey::new("WelcomeMail"));
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.payload, json!({"name": "Ana", "total": 357.0}));
    }

    #[tokio::test]
    async fn enqueued_payload_survives_the_claim_unchanged() {
        let store = Arc::new(InMemoryStore::default());
        let client = QueueClient::new(store.clone());

        let payload = json!({"helpOrder": {"id": 3, "question": "Horário?"}});
        let id = client
            .enqueue_raw(JobKey::new("QuestionAnsweredMail"), payload.clone())
            .await
            .unwrap();

        let claimed = store
            .claim_next(Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.key, JobKey::new("QuestionAnsweredMail"));
        assert_eq!(claimed.payload, payload);
    }

    #[tokio::test]
    async fn empty_key_is_rejected() {
        let client = QueueClient::new(Arc::new(InMemoryStore::default()));

        let result = client.enqueue_raw(JobKey::new(""), json!({})).await;
        assert!(matches!(result, Err(CourierError::EmptyJobKey)));
    }

    #[tokio::test]
    async fn store_outage_surfaces_synchronously_to_the_producer() {
        let client = QueueClient::new(Arc::new(DownStore));

        let result = client
            .enqueue(&WelcomeMail {
                name: "Ana".into(),
                total: 357.0,
            })
            .await;
        assert!(matches!(result, Err(CourierError::StoreUnavailable(_))));
    }
}
