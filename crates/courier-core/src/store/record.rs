//! Job record: the unit persisted in the queue store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobKey};

/// Record lifecycle.
///
/// Transitions:
/// - Pending -> InProgress -> Completed
/// - Pending -> InProgress -> Failed -> Pending (until the attempt budget runs out)
/// - Pending -> InProgress -> DeadLettered
///
/// `Failed` means "awaiting retry"; the store makes the record pending again
/// once its backoff delay elapses. `Completed` and `DeadLettered` are
/// terminal and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Ready to be claimed.
    Pending,

    /// Claimed by exactly one worker.
    InProgress,

    /// Handler finished successfully.
    Completed,

    /// Last attempt failed; waiting out the retry backoff.
    Failed,

    /// Retry budget exhausted, or the key has no handler.
    DeadLettered,
}

impl JobStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::DeadLettered)
    }
}

/// Metadata + payload for one enqueued job.
///
/// Design:
/// - The record is the single source of truth for job state; store
///   structures (ready queue, backoff heap) hold `JobId`s only.
/// - Every transition goes through a method here, so the
///   terminal-immutability rule lives in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub key: JobKey,
    pub payload: serde_json::Value,
    pub status: JobStatus,

    /// Execution attempts so far; incremented exactly once per claim,
    /// whether the attempt then succeeds or fails. Never decreases.
    pub attempts: u32,

    pub enqueued_at: DateTime<Utc>,

    /// Start of the most recent attempt.
    pub started_at: Option<DateTime<Utc>>,

    /// Set when a terminal state is reached.
    pub finished_at: Option<DateTime<Utc>>,

    /// Failure reason from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl JobRecord {
    pub fn new(key: JobKey, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::generate(),
            key,
            payload,
            status: JobStatus::Pending,
            attempts: 0,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }

    /// Claimed by a worker: one more attempt begins.
    pub fn start_attempt(&mut self) {
        self.status = JobStatus::InProgress;
        self.attempts += 1;
        self.started_at = Some(Utc::now());
    }

    /// Terminal success. No-op if already terminal.
    pub fn mark_completed(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Attempt failed; the record waits out its backoff before requeue.
    /// No-op if already terminal.
    pub fn mark_failed(&mut self, error: String) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.last_error = Some(error);
    }

    /// Terminal failure. No-op if already terminal.
    pub fn mark_dead_lettered(&mut self, error: String) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::DeadLettered;
        self.last_error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    /// Failed -> Pending once the backoff delay elapsed, or
    /// InProgress -> Pending when a visibility lease expires.
    pub fn requeue(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Pending;
    }
}
