use thiserror::Error;

use crate::job::JobKey;

/// Errors surfaced by the registry, queue client, and store.
#[derive(Debug, Error)]
pub enum CourierError {
    /// A handler is already registered for this key. Registry misuse;
    /// fatal at worker start-up.
    #[error("duplicate handler for job key={0}")]
    DuplicateHandler(JobKey),

    /// No handler is registered for a claimed key. No code path can ever
    /// succeed, so the dispatcher dead-letters without retry.
    #[error("no handler registered for job key={0}")]
    UnknownJob(JobKey),

    /// The backing store could not durably accept or update a record.
    /// Producers surface this to their caller; the dispatcher backs off
    /// and tries again at process level.
    #[error("queue store unavailable: {0}")]
    StoreUnavailable(String),

    /// The payload could not be serialized at enqueue time.
    #[error("job payload could not be serialized: {0}")]
    Payload(#[from] serde_json::Error),

    /// Enqueue was called with an empty job key.
    #[error("job key must not be empty")]
    EmptyJobKey,
}

/// A failure raised by a job handler.
///
/// Handlers report failures through this type instead of panicking so the
/// dispatcher can choose between retry and dead-letter. `Decode` covers
/// payloads that do not match the handler's expected shape; `Failed` covers
/// side-effect failures such as an unreachable mail sender.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("payload decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offending_key() {
        let err = CourierError::UnknownJob(JobKey::new("NoSuchMail"));
        assert!(err.to_string().contains("NoSuchMail"));

        let err = CourierError::DuplicateHandler(JobKey::new("RegistrationMail"));
        assert!(err.to_string().contains("RegistrationMail"));
    }

    #[test]
    fn handler_error_wraps_decode_failures() {
        let bad: Result<u32, _> = serde_json::from_str("not json");
        let err: HandlerError = bad.unwrap_err().into();
        assert!(matches!(err, HandlerError::Decode(_)));
    }
}
