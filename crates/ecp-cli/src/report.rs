//! Job report parsing and validation
//!
//! The service writes a JSON report next to each job. Only its
//! `general` section matters here: the completion flag and the
//! enrichment count are cross-checked against the line count observed
//! while the result streamed in. The report is never mutated and is
//! discarded after validation.

use serde::Deserialize;
use thiserror::Error;

/// Machine-readable job report returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    /// Summary section. A report without it is invalid.
    pub general: Option<General>,
}

/// The `general` section of a job report.
#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Whether the job ran to completion on the service side.
    #[serde(rename = "Job-Done")]
    pub job_done: Option<bool>,

    /// Number of consultation events written to the result.
    #[serde(rename = "nb-ecs")]
    pub nb_ecs: Option<Count>,
}

/// Integer field that the service serializes either as a JSON number
/// or as a numeric string, depending on its version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Report {
    /// Parse a report from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Reason a report failed validation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("the report has no \"general\" section")]
    MissingGeneral,

    #[error("the job did not run to completion (Job-Done is not true)")]
    NotDone,

    #[error("the \"nb-ecs\" field is missing or not an integer")]
    InvalidCount,

    #[error("the result holds {observed} consultation event(s) but the report says {reported}")]
    CountMismatch { observed: i64, reported: i64 },
}

/// Cross-check a parsed report against the observed result line count.
///
/// `observed_lines` is the number of non-blank lines in the result,
/// including the CSV header line. Rules are checked in order and the
/// first violated one is returned.
pub fn validate(report: &Report, observed_lines: u64) -> Result<(), ReportError> {
    let general = report.general.as_ref().ok_or(ReportError::MissingGeneral)?;

    if general.job_done != Some(true) {
        return Err(ReportError::NotDone);
    }

    let reported = general
        .nb_ecs
        .as_ref()
        .and_then(Count::as_i64)
        .ok_or(ReportError::InvalidCount)?;

    let observed = observed_lines as i64 - 1;
    if observed != reported {
        return Err(ReportError::CountMismatch { observed, reported });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn report(json: serde_json::Value) -> Report {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_valid_report_passes() {
        let report = report(serde_json::json!({
            "general": { "Job-Done": true, "nb-ecs": 3 }
        }));
        assert_eq!(validate(&report, 4), Ok(()));
    }

    #[test]
    fn test_count_as_numeric_string_passes() {
        let report = report(serde_json::json!({
            "general": { "Job-Done": true, "nb-ecs": "3" }
        }));
        assert_eq!(validate(&report, 4), Ok(()));
    }

    #[test]
    fn test_missing_general_section() {
        let report = report(serde_json::json!({ "stats": {} }));
        assert_eq!(validate(&report, 4), Err(ReportError::MissingGeneral));
    }

    #[test]
    fn test_job_not_done() {
        let report = report(serde_json::json!({
            "general": { "Job-Done": false, "nb-ecs": 3 }
        }));
        assert_eq!(validate(&report, 4), Err(ReportError::NotDone));
    }

    #[test]
    fn test_missing_flag_counts_as_not_done() {
        let report = report(serde_json::json!({
            "general": { "nb-ecs": 3 }
        }));
        assert_eq!(validate(&report, 4), Err(ReportError::NotDone));
    }

    #[test]
    fn test_missing_count_field() {
        let report = report(serde_json::json!({
            "general": { "Job-Done": true }
        }));
        assert_eq!(validate(&report, 4), Err(ReportError::InvalidCount));
    }

    #[test]
    fn test_non_numeric_count_field() {
        let report = report(serde_json::json!({
            "general": { "Job-Done": true, "nb-ecs": "lots" }
        }));
        assert_eq!(validate(&report, 4), Err(ReportError::InvalidCount));
    }

    #[test]
    fn test_count_mismatch_reports_both_sides() {
        let report = report(serde_json::json!({
            "general": { "Job-Done": true, "nb-ecs": 5 }
        }));
        assert_eq!(
            validate(&report, 4),
            Err(ReportError::CountMismatch {
                observed: 3,
                reported: 5
            })
        );
    }

    #[test]
    fn test_rules_check_in_order() {
        // Completion is checked before the count, so an undone job with
        // a broken count reports NotDone.
        let report = report(serde_json::json!({
            "general": { "Job-Done": false, "nb-ecs": "lots" }
        }));
        assert_eq!(validate(&report, 4), Err(ReportError::NotDone));
    }
}
