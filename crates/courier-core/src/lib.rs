//! courier-core
//!
//! Deferred-work dispatch for the academy back office: request handlers
//! enqueue mail jobs, worker processes execute them with at-least-once
//! delivery, retry backoff, and a dead-letter terminal state.
//!
//! # Modules
//! - **job**: job identity (keys, record ids) and the typed `Job` trait
//! - **registry**: key -> handler resolution, built once at worker start-up
//! - **client**: producer-side enqueue API used by request handlers
//! - **store**: queue store contract, records, retry policy, in-memory impl
//! - **worker**: dispatcher loop and worker group lifecycle
//! - **mail**: outbound mail contract the job handlers call
//! - **jobs**: the academy's concrete mail job definitions

pub mod client;
pub mod error;
pub mod job;
pub mod jobs;
pub mod mail;
pub mod registry;
pub mod store;
pub mod worker;

pub use client::QueueClient;
pub use error::{CourierError, HandlerError};
pub use job::{Job, JobId, JobKey};
pub use registry::{ErasedHandler, JobHandler, JobRegistry};
pub use store::{
    InMemoryStore, JobRecord, JobStatus, QueueStore, RetryPolicy, StoreConfig, StoreCounts,
};
pub use worker::{WorkerConfig, WorkerGroup};
