//! Error types for the enrichment service client
//!
//! The taxonomy separates failures that doom a whole batch (the service
//! is unreachable for every subsequent job too) from failures scoped to
//! a single job, so callers can keep going after the latter.

use std::error::Error as _;

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error type for remote job operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Nothing listens at the configured endpoint. Unlike a rejection,
    /// this dooms every subsequent job of a batch as well.
    #[error("{endpoint} does not respond (connection refused)")]
    ConnectionRefused { endpoint: String },

    /// The service refused the submission with a non-success status.
    /// `message` carries the diagnostic header when the service sent one.
    #[error("the job was rejected with status {status}")]
    Rejected {
        status: reqwest::StatusCode,
        message: Option<String>,
    },

    /// An artifact was requested before the service assigned a job
    /// identifier. This is a caller bug, not a runtime condition.
    #[error("the job has no identifier; submit it before requesting artifacts")]
    NoJobId,

    /// The job was given neither a byte stream nor any file to send.
    #[error("no input provided: supply a byte stream or at least one file")]
    NoInput,

    /// The result stream ended without a clean end-of-stream, typically
    /// a network reset while the body was flowing.
    #[error("the result stream was interrupted: {0}")]
    Interrupted(String),

    /// A header or settings value contains bytes HTTP cannot carry.
    #[error("invalid header value: {0:?}")]
    InvalidHeader(String),

    /// Any other HTTP-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure while reading input files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Map a transport-level send error, distinguishing a missing
    /// listener from every other failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if is_connection_refused(&err) {
            let endpoint = err
                .url()
                .map(|u| u.as_str().trim_end_matches('/').to_string())
                .unwrap_or_else(|| "the configured endpoint".to_string());
            ClientError::ConnectionRefused { endpoint }
        } else {
            ClientError::Http(err)
        }
    }

    /// Whether this error dooms an entire batch rather than one job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::ConnectionRefused { .. })
    }
}

/// Walk the source chain looking for a refused TCP connection.
fn is_connection_refused(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
