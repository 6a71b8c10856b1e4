//! ECP Client Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP client for the log enrichment service. One [`Job`] wraps one
//! remote processing request: submit the input (a raw byte stream or a
//! multipart set of files), consume the streamed result, and fetch
//! named artifacts (report, traces) from the job directory afterwards.
//!
//! # Example
//!
//! ```no_run
//! use ecp_client::{Client, JobInput, REPORT_ARTIFACT};
//!
//! # async fn example() -> ecp_client::Result<()> {
//! let client = Client::from_env()?;
//! let mut job = client.create_job(JobInput::files(["access.log"]));
//!
//! let mut result = job.submit().await?;
//! while let Some(chunk) = result.chunk().await? {
//!     // write the enriched CSV somewhere
//! }
//!
//! let mut report = job.download(REPORT_ARTIFACT).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod job;
pub mod stream;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use job::{
    Client, Job, JobInput, DEFAULT_HOST, JOB_ID_HEADER, REPORT_ARTIFACT, SETTINGS_HEADER,
    STATUS_MESSAGE_HEADER,
};
pub use stream::{ByteStream, ResultStream};
