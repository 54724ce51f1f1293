//! Job identity: keys, record identifiers, and the typed `Job` trait.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Name of a job kind. Every record carries one, and each key maps to
/// exactly one registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of an enqueued record.
///
/// ULIDs sort by creation time and need no coordination between producers,
/// so any number of request handlers can mint them concurrently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(Ulid);

impl JobId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for JobId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A named, deferred unit of work with a serializable payload.
///
/// The payload type itself implements `Job`; `KEY` ties it to the handler
/// registered for it.
///
/// # Trait bounds
/// - `Serialize`: producers write the payload into the store
/// - `DeserializeOwned`: the worker recovers it from the claimed record
/// - `Send + Sync + 'static`: payloads travel into worker tasks
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KEY: &'static str;
}
