//! Remote processing jobs
//!
//! A [`Job`] drives one request/response lifecycle against the
//! enrichment service: build the input, submit it, then fetch named
//! artifacts from the job directory once the service has assigned an
//! identifier.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Body, StatusCode};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::stream::{ByteStream, ResultStream};

// ============================================================================
// Service Protocol Constants
// ============================================================================

/// Response header carrying the identifier the service assigned to a job.
pub const JOB_ID_HEADER: &str = "job-id";

/// Request header naming a predefined settings profile applied server-side.
pub const SETTINGS_HEADER: &str = "ezpaarse-predefined-settings";

/// Response header carrying a diagnostic message on rejection.
pub const STATUS_MESSAGE_HEADER: &str = "ezpaarse-status-message";

/// Artifact name of the machine-readable job report.
pub const REPORT_ARTIFACT: &str = "job-report.json";

/// Default service address when not specified via environment variable.
pub const DEFAULT_HOST: &str = "localhost:59599";

/// Default timeout for establishing a connection, in seconds.
/// Can be overridden via the ECP_CONNECT_TIMEOUT_SECS environment variable.
/// No overall request timeout is set: result streams may run for a long
/// time on large inputs.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Client for the enrichment service
///
/// Cheap to clone per job: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    host: String,
}

impl Client {
    /// Create a new client for the service at `host` (`"host:port"`).
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let connect_timeout = std::env::var("ECP_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            host: host.into(),
        })
    }

    /// Create from environment variables (`ECP_HOST`).
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("ECP_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(host)
    }

    /// The configured service address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Create an unsubmitted job carrying `input`.
    pub fn create_job(&self, input: JobInput) -> Job {
        Job {
            http: self.http.clone(),
            host: self.host.clone(),
            id: None,
            headers: HeaderMap::new(),
            input: Some(input),
        }
    }

    /// Reattach to a job the service already knows, for artifact
    /// downloads only.
    pub fn resume_job(&self, id: impl Into<String>) -> Job {
        Job {
            http: self.http.clone(),
            host: self.host.clone(),
            id: Some(id.into()),
            headers: HeaderMap::new(),
            input: None,
        }
    }
}

/// Input of a job. Exactly one transmission mode applies per job:
/// a single live stream goes out as the raw request body, named files
/// go out as a multipart attachment set.
pub enum JobInput {
    /// A single live byte stream sent as the raw request body.
    Stream(Body),
    /// Named files sent as multipart attachments, one part per file.
    Files(Vec<PathBuf>),
}

impl JobInput {
    /// Wrap an async reader (a file, standard input) as the raw body.
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        JobInput::Stream(Body::wrap_stream(ReaderStream::new(reader)))
    }

    /// Send the given files as a multipart attachment set.
    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        JobInput::Files(paths.into_iter().map(Into::into).collect())
    }
}

/// One remote processing job.
///
/// Lifecycle: unsubmitted, then submitted once [`Job::submit`] has seen
/// the response headers (the identifier is captured at that point, even
/// on a rejection), then streaming while the result body flows.
pub struct Job {
    http: reqwest::Client,
    host: String,
    id: Option<String>,
    headers: HeaderMap,
    input: Option<JobInput>,
}

impl Job {
    /// Identifier assigned by the service, absent before submission.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Add a request header. Names are case-insensitive.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Extend the request headers with `headers`.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Apply a predefined settings profile server-side.
    pub fn settings(self, profile: &str) -> Result<Self> {
        let value = HeaderValue::from_str(profile)
            .map_err(|_| ClientError::InvalidHeader(profile.to_string()))?;
        Ok(self.header(HeaderName::from_static(SETTINGS_HEADER), value))
    }

    /// Submit the job input and return the streamed result.
    ///
    /// Resolves when the response headers arrive, not when the body
    /// completes. The job identifier is captured from the response even
    /// when the service rejects the submission, so a failure report can
    /// still be fetched afterwards.
    pub async fn submit(&mut self) -> Result<ResultStream> {
        let input = self.input.take().ok_or(ClientError::NoInput)?;

        let url = match self.id.as_deref() {
            Some(id) => format!("http://{}/{}", self.host, id),
            None => format!("http://{}/", self.host),
        };

        let mut headers = self.headers.clone();
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("text/csv"));
        }

        let request = self.http.post(&url).headers(headers);
        let request = match input {
            JobInput::Stream(body) => request.body(body),
            JobInput::Files(paths) => {
                if paths.is_empty() {
                    return Err(ClientError::NoInput);
                }
                let mut form = Form::new();
                for path in &paths {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    let file = tokio::fs::File::open(path).await?;
                    let part = Part::stream(Body::wrap_stream(ReaderStream::new(file)))
                        .file_name(name.clone());
                    form = form.part(name, part);
                }
                request.multipart(form)
            }
        };

        let response = request.send().await.map_err(ClientError::from_transport)?;

        self.id = response
            .headers()
            .get(JOB_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let status = response.status();
        debug!(job_id = ?self.id, %status, "job submitted");

        if status != StatusCode::OK {
            let message = response
                .headers()
                .get(STATUS_MESSAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            return Err(ClientError::Rejected { status, message });
        }

        Ok(ResultStream::new(response))
    }

    /// Fetch a named artifact from the job directory.
    pub async fn download(&self, artifact: &str) -> Result<ByteStream> {
        let id = self.id.as_deref().ok_or(ClientError::NoJobId)?;
        let url = format!("http://{}/{}/{}", self.host, id, artifact);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ClientError::from_transport)?
            .error_for_status()?;

        Ok(ByteStream::new(response))
    }
}
