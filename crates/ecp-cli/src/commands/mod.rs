//! CLI command implementations

pub mod bulk;
pub mod download;
pub mod process;

use std::path::Path;

use ecp_client::Job;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Download a named artifact from the job directory into `dest`.
pub(crate) async fn save_artifact(job: &Job, artifact: &str, dest: &Path) -> Result<()> {
    let mut stream = job.download(artifact).await?;
    let mut file = tokio::fs::File::create(dest).await?;
    stream.write_to(&mut file).await?;
    file.flush().await?;
    Ok(())
}
