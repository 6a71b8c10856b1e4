//! Error types for the ECP CLI
//!
//! Per-file failures inside a batch are logged and folded into
//! [`CliError::BatchFailed`]; only batch-fatal conditions (an
//! unreachable service, unusable arguments) propagate directly.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// A source or destination argument does not point to a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A `--header` option does not look like `"Name: value"`.
    #[error("wrong header syntax: {0:?}. Expected \"Name: value\".")]
    HeaderSyntax(String),

    /// A `--download` option does not look like `"artifact[:dest]"`.
    #[error("wrong download syntax: {0:?}. Expected \"artifact[:destination]\".")]
    DownloadSyntax(String),

    /// Some files of a batch failed; the others were still processed.
    #[error("{failed} of {total} file(s) failed. Check the logs above for details.")]
    BatchFailed { failed: usize, total: usize },

    /// A single-job run did not complete cleanly.
    #[error("the job did not complete successfully")]
    JobFailed,

    /// Failure reported by the enrichment service client.
    #[error(transparent)]
    Client(#[from] ecp_client::ClientError),

    /// The job report is not valid JSON.
    #[error("failed to parse report: {0}")]
    ReportParse(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
