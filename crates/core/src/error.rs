//! Error types for the contextfuse domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant: producer failures are
//! recoverable and recorded per-producer, merge and synthesis failures
//! always surface to the caller.

use thiserror::Error;

/// The top-level error type for all contextfuse operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Snapshot / Fact construction ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Merge engine ---
    #[error("Fuse error: {0}")]
    Fuse(#[from] FuseError),

    // --- Producer errors (when driven directly, outside a coordinated run) ---
    #[error("Producer error: {0}")]
    Producer(#[from] ProducerError),

    // --- Coordinator: every producer failed, nothing to merge ---
    #[error("No usable context: all {} producer(s) failed", failures.len())]
    NoUsableContext {
        /// `(producer_id, reason)` in registration order.
        failures: Vec<(String, String)>,
    },

    // --- Synthesis boundary ---
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Rejected at construction time — malformed values never enter the merge.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Snapshot producer_id must not be empty")]
    EmptyProducerId,

    #[error("Fact key must not be empty")]
    EmptyFactKey,

    #[error("Fact confidence {0} outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f32),
}

/// Malformed arguments to a merge call — fatal to that call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FuseError {
    #[error("Cannot fuse an empty snapshot set")]
    EmptySnapshotSet,

    #[error("Duplicate producer_id in snapshot set: {0}")]
    DuplicateProducer(String),
}

/// A single producer's failure. Isolated by the coordinator: recorded in the
/// run result, never aborts sibling producers.
#[derive(Debug, Clone, Error)]
pub enum ProducerError {
    #[error("Producer '{producer_id}' failed: {reason}")]
    Failed { producer_id: String, reason: String },

    #[error("Producer '{producer_id}' timed out after {timeout_secs}s")]
    Timeout {
        producer_id: String,
        timeout_secs: u64,
    },

    #[error("Producer '{producer_id}' returned an invalid snapshot: {reason}")]
    InvalidSnapshot { producer_id: String, reason: String },
}

impl ProducerError {
    /// The producer this error belongs to.
    pub fn producer_id(&self) -> &str {
        match self {
            Self::Failed { producer_id, .. }
            | Self::Timeout { producer_id, .. }
            | Self::InvalidSnapshot { producer_id, .. } => producer_id,
        }
    }
}

/// Failures from the downstream synthesis call — fatal to the run.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_error_displays_correctly() {
        let err = Error::Producer(ProducerError::Timeout {
            producer_id: "web_search".into(),
            timeout_secs: 30,
        });
        assert!(err.to_string().contains("web_search"));
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn producer_error_exposes_id() {
        let err = ProducerError::Failed {
            producer_id: "analyzer".into(),
            reason: "boom".into(),
        };
        assert_eq!(err.producer_id(), "analyzer");
    }

    #[test]
    fn validation_errors_compare_by_value() {
        assert_eq!(
            ValidationError::ConfidenceOutOfRange(1.5),
            ValidationError::ConfidenceOutOfRange(1.5)
        );
        assert_ne!(
            ValidationError::ConfidenceOutOfRange(1.5),
            ValidationError::EmptyFactKey
        );
    }

    #[test]
    fn no_usable_context_counts_failures() {
        let err = Error::NoUsableContext {
            failures: vec![
                ("a".into(), "timeout".into()),
                ("b".into(), "panicked".into()),
            ],
        };
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn synthesis_error_displays_status() {
        let err = Error::Synthesis(SynthesisError::Api {
            status_code: 500,
            message: "upstream exploded".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }
}
