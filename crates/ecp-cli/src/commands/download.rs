//! `ecp download` command implementation
//!
//! Fetches artifacts from the directory of a job that already ran.
//! Each artifact is attempted independently so one failure does not
//! block the rest.

use std::path::PathBuf;

use ecp_client::Client;
use tracing::{error, info};

use crate::commands::save_artifact;
use crate::error::{CliError, Result};
use crate::options::ArtifactRequest;

/// Download `artifacts` from the directory of job `id`.
pub async fn run(host: &str, id: &str, artifacts: Vec<ArtifactRequest>) -> Result<()> {
    let client = Client::new(host)?;
    let job = client.resume_job(id);

    let total = artifacts.len();
    let mut failed = 0usize;

    for request in &artifacts {
        let dest = request
            .dest
            .clone()
            .unwrap_or_else(|| PathBuf::from(&request.name));
        info!("Downloading {} into {}", request.name, dest.display());
        if let Err(err) = save_artifact(&job, &request.name, &dest).await {
            failed += 1;
            error!("Failed to download {}: {err}", request.name);
        }
    }

    if failed > 0 {
        return Err(CliError::BatchFailed { failed, total });
    }
    Ok(())
}
