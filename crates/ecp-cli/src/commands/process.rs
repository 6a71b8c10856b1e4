//! `ecp process` command implementation
//!
//! Runs one job for a set of files (multipart) or standard input (raw
//! stream) and writes the result to a file or standard output. Extra
//! artifacts can be fetched afterwards, each attempted independently.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ecp_client::{Client, ClientError, JobInput, ResultStream};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

use crate::commands::save_artifact;
use crate::error::{CliError, Result};
use crate::options::{ArtifactRequest, ProcessOptions};

/// Run a single job over `files` (standard input when empty).
pub async fn run(host: &str, files: Vec<PathBuf>, opts: ProcessOptions) -> Result<()> {
    let client = Client::new(host)?;

    let input = if files.is_empty() {
        JobInput::stream(tokio::io::stdin())
    } else {
        JobInput::files(files)
    };

    let mut job = client.create_job(input).headers(opts.headers.clone());
    if let Some(profile) = &opts.settings {
        job = job.settings(profile)?;
    }

    let start = Instant::now();
    let mut failed = false;

    let mut stream = match job.submit().await {
        Ok(stream) => stream,
        Err(ClientError::Rejected { status, message }) => {
            error!("The job failed with status {status}");
            if let Some(message) = message {
                error!("Service message: {message}");
            }
            return Err(CliError::JobFailed);
        }
        Err(err) => {
            error!("{err}");
            return Err(err.into());
        }
    };

    debug!("Job started (ID: {})", job.id().unwrap_or("n/a"));

    let piped = match &opts.output {
        Some(path) => {
            let mut file = fs::File::create(path).await?;
            pipe(&mut stream, &mut file).await
        }
        None => {
            let mut stdout = tokio::io::stdout();
            pipe(&mut stream, &mut stdout).await
        }
    };
    if let Err(err) = piped {
        failed = true;
        error!("The job has been interrupted: {err}");
    }

    for request in &opts.downloads {
        let dest = artifact_destination(request, opts.output.as_deref());
        debug!("Downloading {} into {}", request.name, dest.display());
        if let Err(err) = save_artifact(&job, &request.name, &dest).await {
            failed = true;
            error!("Failed to download {}: {err}", request.name);
        }
    }

    debug!("Job terminated in {}s", start.elapsed().as_secs());

    if failed {
        return Err(CliError::JobFailed);
    }
    Ok(())
}

async fn pipe<W>(stream: &mut ResultStream, writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = stream.chunk().await? {
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Where an artifact lands: the explicit destination when given, else a
/// name derived from the output file, else the artifact name in the
/// current directory.
fn artifact_destination(request: &ArtifactRequest, output: Option<&Path>) -> PathBuf {
    if let Some(dest) = &request.dest {
        return dest.clone();
    }
    match output {
        Some(output) => {
            let stem = output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            output.with_file_name(format!("{stem}.{}", request.name))
        }
        None => PathBuf::from(&request.name),
    }
}
