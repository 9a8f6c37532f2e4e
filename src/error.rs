//! Error types for eyes-dl
//!
//! This module provides the error taxonomy for the library:
//! - Transport-level failures (retryable, see [`crate::retry`])
//! - Long-request protocol failures (fatal terminal states)
//! - Result document decode and URL extraction failures

use thiserror::Error;

/// Result type alias for eyes-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for eyes-dl
///
/// This is the primary error type used throughout the library. Transport
/// failures are retried by the attempt executor up to the configured count;
/// every other variant aborts the enclosing operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Network error — the request never produced a status line
    /// (connection refused, timeout, DNS failure)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server discarded the asynchronous task (410 Gone)
    #[error("the server task has gone")]
    JobGone,

    /// A status code outside the long-request contract (200/201/202/410)
    #[error("unknown status {status} during long request")]
    UnknownLongRequestStatus {
        /// The unrecognized HTTP status code
        status: u16,
    },

    /// A 201/202 response arrived without the `location` header the protocol
    /// requires for the follow-up request
    #[error("response with status {status} is missing the location header")]
    MissingLocation {
        /// The status code of the offending response
        status: u16,
    },

    /// Result document body was not valid JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The results page URL did not match the expected
    /// `{server}/app/batches/{batch}/{session}` shape
    #[error("invalid results URL: {0}")]
    InvalidResultsUrl(String),

    /// I/O error while writing an artifact or preparing directories
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled through the handler's cancellation token
    #[error("operation cancelled")]
    Cancelled,
}
