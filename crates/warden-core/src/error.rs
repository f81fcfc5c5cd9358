//! Error types for the warden core boundary.
//!
//! Void, item-level rejection and escalated overrides are *reported states*
//! in the decision record, never Rust errors. `Err` is reserved for the
//! out-of-scope collaborators: generation backends, the audit guard, and
//! the persistence sink.

/// Generation backend failures. The embedding layer translates these into
/// a stub proposal before the core runs; the core itself has no fallback
/// generation logic.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Tagged "no provider configured" variant.
    #[error("no generation provider configured")]
    NoProvider,

    /// Transport-level failure talking to a backend.
    #[error("backend request failed: {0}")]
    Backend(String),

    /// Backend answered but the payload was unusable.
    #[error("backend returned malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GeneratorError {
    fn from(value: reqwest::Error) -> Self {
        GeneratorError::Backend(value.to_string())
    }
}

/// Pre-controller audit guard trips. A tripped guard discards the proposal;
/// it never reaches the pipeline.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("audit guard tripped: forbidden substring detected: {0}")]
    ForbiddenSubstring(String),

    #[error("audit guard tripped: forbidden behavior phrase detected: {0}")]
    ForbiddenPhrase(String),
}

/// Persistence sink failures. Sinks are fire-and-forget: a failure is
/// logged and must never corrupt in-memory runtime state.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("persistence io: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
