//! Worker dispatcher: claims records, resolves handlers, records outcomes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::HandlerError;
use crate::registry::JobRegistry;
use crate::store::{JobRecord, QueueStore, RetryPolicy};

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Executions a record gets before it is dead-lettered.
    pub max_attempts: u32,

    /// Upper bound on one blocking claim call; the loop re-checks shutdown
    /// every time it elapses.
    pub claim_timeout: Duration,

    /// Pause after a store error before the loop tries again. Store trouble
    /// is process-level, never attributed to the job being processed.
    pub store_backoff: Duration,

    /// Backoff between retries of a failed job.
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            claim_timeout: Duration::from_secs(5),
            store_backoff: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

/// Worker group handle.
/// - `request_shutdown()` stops taking new claims.
/// - `shutdown_and_join()` additionally waits for in-flight attempts.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` dispatchers against the same store.
    ///
    /// Dispatchers hold no shared lock; the store's atomic claim is the only
    /// cross-worker coordination, so more instances may run in other
    /// processes against the same backing.
    pub fn spawn(
        n: usize,
        store: Arc<dyn QueueStore>,
        registry: Arc<JobRegistry>,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let store = Arc::clone(&store);
            let registry = Arc::clone(&registry);
            let config = config.clone();
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                dispatch_loop(worker_id, store, registry, config, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all dispatchers. In-flight handler execution is
    /// not cancelled; the loop stops taking new claims.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for every dispatcher to finish.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn dispatch_loop(
    worker_id: usize,
    store: Arc<dyn QueueStore>,
    registry: Arc<JobRegistry>,
    config: WorkerConfig,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // the claim blocks, so race it against shutdown
        let claimed = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            claimed = store.claim_next(config.claim_timeout) => claimed,
        };

        let record = match claimed {
            Ok(Some(record)) => record,
            Ok(None) => continue, // claim timed out; re-check shutdown
            Err(err) => {
                tracing::error!(worker_id, error = %err, "claim failed; backing off");
                tokio::time::sleep(config.store_backoff).await;
                continue;
            }
        };

        run_attempt(worker_id, store.as_ref(), &registry, &config, record).await;
    }
}

/// Take one claimed record through resolve -> execute -> mark.
///
/// Attempt state machine: Claimed -> Executing -> {Succeeded,
/// Retryable-Failure, Fatal-Failure}. Nothing in here is allowed to kill
/// the dispatcher loop.
async fn run_attempt(
    worker_id: usize,
    store: &dyn QueueStore,
    registry: &JobRegistry,
    config: &WorkerConfig,
    record: JobRecord,
) {
    let job_id = record.id;
    let key = record.key.clone();

    let handler = match registry.resolve(&key) {
        Ok(handler) => handler,
        Err(err) => {
            // a missing handler can never start succeeding on its own,
            // so retrying would only burn attempts
            tracing::error!(%job_id, %key, "unknown job key; dead-lettering");
            if let Err(err) = store.mark_dead_lettered(job_id, err.to_string()).await {
                tracing::error!(%job_id, error = %err, "mark_dead_lettered failed");
            }
            return;
        }
    };

    tracing::debug!(worker_id, %job_id, %key, attempt = record.attempts, "executing");

    // Own task per attempt: a panicking handler is contained here and
    // reported as an ordinary failure.
    let payload = record.payload.clone();
    let result = match tokio::spawn(async move { handler.handle_value(payload).await }).await {
        Ok(result) => result,
        Err(join_err) => Err(HandlerError::failed(format!("handler panicked: {join_err}"))),
    };

    match result {
        Ok(()) => {
            tracing::info!(%job_id, %key, attempts = record.attempts, "job completed");
            if let Err(err) = store.mark_completed(job_id).await {
                tracing::error!(%job_id, error = %err, "mark_completed failed");
            }
        }
        Err(err) if record.attempts >= config.max_attempts => {
            tracing::warn!(
                %job_id, %key,
                attempts = record.attempts,
                error = %err,
                "retry budget exhausted; dead-lettering"
            );
            if let Err(err) = store.mark_dead_lettered(job_id, err.to_string()).await {
                tracing::error!(%job_id, error = %err, "mark_dead_lettered failed");
            }
        }
        Err(err) => {
            let delay = config.retry.next_delay(record.attempts);
            tracing::warn!(
                %job_id, %key,
                attempts = record.attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed; retry scheduled"
            );
            if let Err(err) = store.mark_failed(job_id, err.to_string(), delay).await {
                tracing::error!(%job_id, error = %err, "mark_failed failed");
            }
        }
    }
}
