//! Parsing of repeatable CLI options and per-command settings
//!
//! Headers arrive as `"Name: value"` strings and artifact requests as
//! `"artifact[:destination]"`; both are validated up front so a typo
//! fails the invocation before any network traffic.

use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{CliError, Result};

/// A named artifact to fetch from a job directory, with an optional
/// destination override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub name: String,
    pub dest: Option<PathBuf>,
}

/// Settings for one `bulk` invocation.
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    /// Overwrite results that already exist.
    pub overwrite: bool,
    /// Look for log files in subdirectories.
    pub recursive: bool,
    /// Only list candidate files, do not process anything.
    pub list: bool,
    /// Extra request headers.
    pub headers: HeaderMap,
    /// Predefined settings profile applied server-side.
    pub settings: Option<String>,
    /// Extra artifacts to download for every job.
    pub downloads: Vec<ArtifactRequest>,
}

/// Settings for one `process` invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Extra request headers.
    pub headers: HeaderMap,
    /// Predefined settings profile applied server-side.
    pub settings: Option<String>,
    /// Extra artifacts to download after the job.
    pub downloads: Vec<ArtifactRequest>,
    /// Result file; standard output when absent.
    pub output: Option<PathBuf>,
}

/// Coerce `"Name: value"` options into a header map.
///
/// Names are trimmed and lowercased, values trimmed. Later options win
/// over earlier ones for the same name.
pub fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for header in raw {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| CliError::HeaderSyntax(header.clone()))?;
        let name = HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
            .map_err(|_| CliError::HeaderSyntax(header.clone()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| CliError::HeaderSyntax(header.clone()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Coerce `"artifact[:destination]"` options into artifact requests.
pub fn parse_downloads(raw: &[String]) -> Result<Vec<ArtifactRequest>> {
    raw.iter()
        .map(|download| {
            let (name, dest) = match download.split_once(':') {
                Some((name, dest)) if !dest.is_empty() => (name, Some(PathBuf::from(dest))),
                Some((name, _)) => (name, None),
                None => (download.as_str(), None),
            };
            if name.is_empty() {
                return Err(CliError::DownloadSyntax(download.clone()));
            }
            Ok(ArtifactRequest {
                name: name.to_string(),
                dest,
            })
        })
        .collect()
}
