//! Handler registration and resolution.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CourierError, HandlerError};
use crate::job::{Job, JobKey};

/// Typed handler for one job kind.
///
/// Delivery is at-least-once: the same payload may arrive again after a
/// crash or lease expiry, so `handle` must be idempotent or tolerate a
/// duplicate send. Failures are returned, never swallowed, so the
/// dispatcher can decide between retry and dead-letter.
#[async_trait]
pub trait JobHandler<J: Job>: Send + Sync {
    async fn handle(&self, job: J) -> Result<(), HandlerError>;
}

/// Object-safe form stored in the registry.
///
/// At dispatch time the worker only has a key and a JSON payload; the typed
/// payload is recovered inside the erased wrapper.
#[async_trait]
pub trait ErasedHandler: Send + Sync {
    async fn handle_value(&self, payload: serde_json::Value) -> Result<(), HandlerError>;
    fn key(&self) -> &'static str;
}

/// Type-erasure wrapper: `JobHandler<J>` -> `ErasedHandler`.
struct TypedHandler<J: Job, H: JobHandler<J>> {
    handler: H,
    _marker: PhantomData<J>,
}

#[async_trait]
impl<J: Job, H: JobHandler<J>> ErasedHandler for TypedHandler<J, H> {
    async fn handle_value(&self, payload: serde_json::Value) -> Result<(), HandlerError> {
        let job: J = serde_json::from_value(payload)?;
        self.handler.handle(job).await
    }

    fn key(&self) -> &'static str {
        J::KEY
    }
}

/// Registry of handlers (job key -> handler).
///
/// Design:
/// - Built once during worker bootstrap (`&mut self`).
/// - Shared read-only behind `Arc` while dispatching.
/// No synchronization is needed after initialization. There is no ambient
/// singleton: producers and workers receive their collaborators explicitly.
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<JobKey, Arc<dyn ErasedHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `J::KEY`.
    ///
    /// Two handlers for one key would make dispatch ambiguous, so the
    /// second registration fails and worker start-up should abort.
    pub fn register<J, H>(&mut self, handler: H) -> Result<(), CourierError>
    where
        J: Job,
        H: JobHandler<J> + 'static,
    {
        let key = JobKey::new(J::KEY);
        if self.handlers.contains_key(&key) {
            return Err(CourierError::DuplicateHandler(key));
        }
        self.handlers.insert(
            key,
            Arc::new(TypedHandler {
                handler,
                _marker: PhantomData,
            }),
        );
        Ok(())
    }

    /// Look up the handler for `key`.
    pub fn resolve(&self, key: &JobKey) -> Result<Arc<dyn ErasedHandler>, CourierError> {
        self.handlers
            .get(key)
            .cloned()
            .ok_or_else(|| CourierError::UnknownJob(key.clone()))
    }

    pub fn registered_keys(&self) -> Vec<JobKey> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
