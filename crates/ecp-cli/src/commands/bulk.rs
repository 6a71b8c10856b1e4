//! `ecp bulk` command implementation
//!
//! Submits every log file found under a source directory to the
//! enrichment service, one job at a time, and stores the result, the
//! job report and any extra artifacts in a destination tree mirroring
//! the source. A file's outcome never leaves partial state behind: the
//! result streams into a staging file that is renamed to its final
//! name (or to a failure marker) only once the outcome is known.
//!
//! No single file's failure halts the batch. The one exception is a
//! refused connection during submit: nothing later in the batch can
//! succeed either, so the whole run aborts.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ecp_client::{Client, ClientError, JobInput, ResultStream, REPORT_ARTIFACT};
use reqwest::header::{HeaderValue, CONTENT_ENCODING};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::commands::save_artifact;
use crate::discover::{ensure_dir, find_in_dir, InputFile};
use crate::error::{CliError, Result};
use crate::options::BulkOptions;
use crate::report::{self, Report};

/// Input suffixes recognized as log files, compressed spelling first.
const LOG_SUFFIXES: [&str; 2] = [".log.gz", ".log"];

const RESULT_SUFFIX: &str = ".ec.csv";
const REPORT_SUFFIX: &str = ".report.json";

/// Process all log files under `source_dir` and store results under
/// `dest_dir` (the source directory when absent).
pub async fn run(
    host: &str,
    source_dir: PathBuf,
    dest_dir: Option<PathBuf>,
    opts: BulkOptions,
) -> Result<()> {
    let dest_dir = dest_dir.unwrap_or_else(|| source_dir.clone());

    ensure_dir(&source_dir).await?;
    ensure_dir(&dest_dir).await?;

    let files: Vec<InputFile> = find_in_dir(&source_dir, opts.recursive)
        .await?
        .into_iter()
        .filter(|f| is_log_file(&f.name))
        .collect();

    if files.is_empty() {
        info!("No log files found");
        return Ok(());
    }

    if opts.list {
        for file in &files {
            println!("{}", file.path.display());
        }
        return Ok(());
    }

    let client = Client::new(host)?;
    let start = Instant::now();
    let mut failed = 0usize;

    for file in &files {
        if let Outcome::Failed = process_file(&client, file, &source_dir, &dest_dir, &opts).await? {
            failed += 1;
        }
    }

    debug!("Terminated in {}s", start.elapsed().as_secs());

    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}

/// Per-file outcome. `Skipped` files count as neither success nor
/// failure.
enum Outcome {
    Processed,
    Skipped,
    Failed,
}

/// Drive one file through its whole lifecycle. `Err` is reserved for
/// batch-fatal conditions; everything scoped to this file comes back as
/// `Ok(Outcome::Failed)`.
async fn process_file(
    client: &Client,
    file: &InputFile,
    source_dir: &Path,
    dest_dir: &Path,
    opts: &BulkOptions,
) -> Result<Outcome> {
    let Some(out) = OutputSet::derive(file, source_dir, dest_dir) else {
        return Ok(Outcome::Skipped);
    };

    if !opts.overwrite {
        // Either spelling of the result counts as already processed.
        for existing in [&out.result, &out.result_gz] {
            if fs::try_exists(existing).await.unwrap_or(false) {
                debug!("Skipping {}", existing.display());
                return Ok(Outcome::Skipped);
            }
        }
    }

    info!("Processing {}", file.path.display());

    if let Err(err) = fs::create_dir_all(&out.dir).await {
        error!("Failed to create {}: {err}", out.dir.display());
        return Ok(Outcome::Failed);
    }

    // Leftovers from a previous aborted run on the same input would
    // otherwise masquerade as fresh outputs.
    if let Err(err) = remove_stale_outputs(&out.dir, &out.base).await {
        error!("Failed to remove stale files: {err}");
        return Ok(Outcome::Failed);
    }

    let mut headers = opts.headers.clone();
    if file.name.ends_with(".gz") && !headers.contains_key(CONTENT_ENCODING) {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }

    let source = match fs::File::open(&file.path).await {
        Ok(f) => JobInput::stream(f),
        Err(err) => {
            error!("Failed to open {}: {err}", file.path.display());
            return Ok(Outcome::Failed);
        }
    };

    let mut job = client.create_job(source).headers(headers);
    if let Some(profile) = &opts.settings {
        job = match job.settings(profile) {
            Ok(job) => job,
            Err(err) => {
                error!("Invalid settings profile: {err}");
                return Ok(Outcome::Failed);
            }
        };
    }

    let mut failed = false;
    let mut observed_lines = None;

    match job.submit().await {
        Ok(mut stream) => {
            debug!("Job started (ID: {})", job.id().unwrap_or("n/a"));
            match pipe_to_staging(&mut stream, &out.staging).await {
                Ok(lines) => observed_lines = Some(lines),
                Err(err) => {
                    failed = true;
                    error!("The job has been interrupted: {err}");
                }
            }
        }
        Err(err) if err.is_fatal() => {
            error!("{err}");
            return Err(err.into());
        }
        Err(ClientError::Rejected { status, message }) => {
            error!("The job failed with status {status}");
            if let Some(message) = message {
                error!("Service message: {message}");
            }
            fetch_failure_report(&job, &out).await;
            return Ok(Outcome::Failed);
        }
        Err(err) => {
            error!("Failed to submit {}: {err}", file.path.display());
            fetch_failure_report(&job, &out).await;
            return Ok(Outcome::Failed);
        }
    }

    // The report is fetched even when the stream failed; the staging
    // file still needs a final destination either way.
    let mut parsed: Option<Report> = None;
    debug!("Downloading {}", out.report.display());
    match save_artifact(&job, REPORT_ARTIFACT, &out.report).await {
        Ok(()) => match fs::read(&out.report).await {
            Ok(bytes) => match Report::from_slice(&bytes) {
                Ok(report) => parsed = Some(report),
                Err(err) => {
                    failed = true;
                    error!("Failed to parse report file: {err}");
                }
            },
            Err(err) => {
                failed = true;
                error!("Failed to read report file: {err}");
            }
        },
        Err(err) => {
            failed = true;
            error!("Failed to download report file: {err}");
        }
    }

    if let (Some(report), Some(lines)) = (&parsed, observed_lines) {
        if let Err(err) = report::validate(report, lines) {
            failed = true;
            error!("Invalid report for {}: {err}", file.path.display());
        }
    }

    for request in &opts.downloads {
        let dest = request
            .dest
            .clone()
            .unwrap_or_else(|| out.dir.join(format!("{}.{}", out.base, request.name)));
        debug!("Downloading {}", request.name);
        if let Err(err) = save_artifact(&job, &request.name, &dest).await {
            failed = true;
            error!("Failed to download {}: {err}", request.name);
        }
    }

    // Finalize: the staging file becomes the result on success and a
    // failure marker otherwise. The staging file may not exist when the
    // stream broke before the first chunk; that is not an error of its
    // own.
    let target = if failed { &out.failed } else { &out.result };
    match fs::rename(&out.staging, target).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            failed = true;
            error!("Failed to rename {}: {err}", out.staging.display());
        }
    }

    debug!("Job terminated");
    Ok(if failed {
        Outcome::Failed
    } else {
        Outcome::Processed
    })
}

/// Best-effort fetch of the failure report after a rejected submission.
async fn fetch_failure_report(job: &ecp_client::Job, out: &OutputSet) {
    debug!("Downloading {}", out.report.display());
    if let Err(err) = save_artifact(job, REPORT_ARTIFACT, &out.report).await {
        error!("Failed to download report file: {err}");
    }
}

/// Stream the result body into the staging file, counting non-blank
/// lines along the way.
async fn pipe_to_staging(stream: &mut ResultStream, staging: &Path) -> Result<u64> {
    let mut file = fs::File::create(staging).await?;
    let mut counter = LineCounter::new();
    loop {
        match stream.chunk().await {
            Ok(Some(chunk)) => {
                counter.push(&chunk);
                file.write_all(&chunk).await?;
            }
            Ok(None) => break,
            Err(err) => {
                // Keep what arrived; finalize will mark it as failed.
                let _ = file.flush().await;
                return Err(err.into());
            }
        }
    }
    file.flush().await?;
    Ok(counter.finish())
}

/// Remove files in `dir` whose name starts with the input's base name
/// but which are not themselves log files.
async fn remove_stale_outputs(dir: &Path, base: &str) -> Result<()> {
    for entry in find_in_dir(dir, false).await? {
        if entry.name.starts_with(base) && !is_log_file(&entry.name) {
            debug!("Removing {}", entry.name);
            fs::remove_file(&entry.path).await?;
        }
    }
    Ok(())
}

/// Whether a file name carries one of the recognized input suffixes.
pub(crate) fn is_log_file(name: &str) -> bool {
    log_base_name(name).is_some()
}

/// Strip the input suffix, returning the base all output names derive
/// from.
fn log_base_name(name: &str) -> Option<&str> {
    LOG_SUFFIXES.iter().find_map(|s| name.strip_suffix(s))
}

/// Paths derived for one input file. At most one of `result` and
/// `failed` exists once processing completes, and `staging` never
/// survives a finalize.
struct OutputSet {
    dir: PathBuf,
    base: String,
    result: PathBuf,
    result_gz: PathBuf,
    report: PathBuf,
    staging: PathBuf,
    failed: PathBuf,
}

impl OutputSet {
    fn derive(file: &InputFile, source_dir: &Path, dest_dir: &Path) -> Option<Self> {
        let base = log_base_name(&file.name)?.to_string();
        let relative = file
            .path
            .parent()
            .and_then(|p| p.strip_prefix(source_dir).ok())
            .unwrap_or_else(|| Path::new(""));
        let dir = dest_dir.join(relative);
        Some(Self {
            result: dir.join(format!("{base}{RESULT_SUFFIX}")),
            result_gz: dir.join(format!("{base}{RESULT_SUFFIX}.gz")),
            report: dir.join(format!("{base}{REPORT_SUFFIX}")),
            staging: dir.join(format!("{base}{RESULT_SUFFIX}.tmp")),
            failed: dir.join(format!("{base}{RESULT_SUFFIX}.ko")),
            dir,
            base,
        })
    }
}

/// Counts non-blank lines in a byte stream fed chunk by chunk.
struct LineCounter {
    lines: u64,
    current_blank: bool,
}

impl LineCounter {
    fn new() -> Self {
        Self {
            lines: 0,
            current_blank: true,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if byte == b'\n' {
                if !self.current_blank {
                    self.lines += 1;
                }
                self.current_blank = true;
            } else if !byte.is_ascii_whitespace() {
                self.current_blank = false;
            }
        }
    }

    /// Total, counting a trailing unterminated line.
    fn finish(&self) -> u64 {
        if self.current_blank {
            self.lines
        } else {
            self.lines + 1
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_suffix_recognition() {
        assert!(is_log_file("access.log"));
        assert!(is_log_file("access.log.gz"));
        assert!(!is_log_file("access.ec.csv"));
        assert!(!is_log_file("access.txt"));
        assert!(!is_log_file("access.gz"));

        assert_eq!(log_base_name("access.log"), Some("access"));
        assert_eq!(log_base_name("access.log.gz"), Some("access"));
        assert_eq!(log_base_name("notes.txt"), None);
    }

    #[test]
    fn test_output_set_mirrors_relative_path() {
        let file = InputFile {
            name: "access.log.gz".to_string(),
            path: PathBuf::from("/src/2024/jan/access.log.gz"),
        };
        let out = OutputSet::derive(&file, Path::new("/src"), Path::new("/dest")).unwrap();

        assert_eq!(out.dir, PathBuf::from("/dest/2024/jan"));
        assert_eq!(out.base, "access");
        assert_eq!(out.result, PathBuf::from("/dest/2024/jan/access.ec.csv"));
        assert_eq!(out.result_gz, PathBuf::from("/dest/2024/jan/access.ec.csv.gz"));
        assert_eq!(out.report, PathBuf::from("/dest/2024/jan/access.report.json"));
        assert_eq!(out.staging, PathBuf::from("/dest/2024/jan/access.ec.csv.tmp"));
        assert_eq!(out.failed, PathBuf::from("/dest/2024/jan/access.ec.csv.ko"));
    }

    #[test]
    fn test_output_set_for_non_log_input_is_none() {
        let file = InputFile {
            name: "readme.md".to_string(),
            path: PathBuf::from("/src/readme.md"),
        };
        assert!(OutputSet::derive(&file, Path::new("/src"), Path::new("/dest")).is_none());
    }

    #[test]
    fn test_line_counter_skips_blank_lines() {
        let mut counter = LineCounter::new();
        counter.push(b"header\na;b\n\n  \nc;d\n");
        assert_eq!(counter.finish(), 3);
    }

    #[test]
    fn test_line_counter_across_chunk_boundaries() {
        let mut counter = LineCounter::new();
        counter.push(b"hea");
        counter.push(b"der\na;");
        counter.push(b"b\n");
        assert_eq!(counter.finish(), 2);
    }

    #[test]
    fn test_line_counter_counts_unterminated_tail() {
        let mut counter = LineCounter::new();
        counter.push(b"header\nlast line without newline");
        assert_eq!(counter.finish(), 2);
    }

    #[test]
    fn test_line_counter_empty_input() {
        let counter = LineCounter::new();
        assert_eq!(counter.finish(), 0);
    }
}
