//! Core records passed between the pipeline stages.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::classifier::ThematicLabel;
use crate::domain::Domain;
use crate::error_handling::ErrorCause;
use crate::metrics::DropMetrics;

/// CDX timestamp layout (`YYYYMMDDhhmmss`).
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One archived capture of a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// URL as it was captured
    pub original_url: String,
    /// HTTP status recorded by the crawler (`None` for revisits and redirects without one)
    pub status_code: Option<u16>,
    /// Content digest reported by the archive
    pub digest: Option<String>,
    /// Compressed record length in bytes
    pub length: Option<u64>,
}

impl Snapshot {
    /// Capture timestamp in the archive's `YYYYMMDDhhmmss` form.
    pub fn archive_timestamp(&self) -> String {
        self.timestamp.format(ARCHIVE_TIMESTAMP_FORMAT).to_string()
    }

    /// Whether the crawler recorded a 2xx response.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(200..=299))
    }

    /// Whether the crawler recorded a 4xx/5xx response.
    pub fn is_error(&self) -> bool {
        matches!(self.status_code, Some(400..=599))
    }

    /// Replay URL of this capture on the given archive.
    pub fn replay_url(&self, archive_base: &str) -> String {
        format!(
            "{}/web/{}/{}",
            archive_base.trim_end_matches('/'),
            self.archive_timestamp(),
            self.original_url
        )
    }
}

/// The captures of one domain, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    domain: Domain,
    snapshots: Vec<Snapshot>,
    truncated: bool,
}

impl Timeline {
    /// Builds a timeline, ordering the snapshots by timestamp.
    ///
    /// The sort is stable: captures sharing a timestamp keep their fetch order.
    pub fn new(domain: Domain, mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by_key(|s| s.timestamp);
        Timeline {
            domain,
            snapshots,
            truncated: false,
        }
    }

    /// Marks the timeline as cut off by the archive's row limit.
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// An empty timeline (domain never archived).
    pub fn empty(domain: Domain) -> Self {
        Self::new(domain, Vec::new())
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Whether the archive returned as many rows as were requested.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Outcome of one domain's analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Metrics derived from the complete timeline
    Succeeded,
    /// Metrics derived from a timeline cut off at the row limit
    Partial,
    /// No metrics; see the failure cause
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Succeeded => "succeeded",
            AnalysisStatus::Partial => "partial",
            AnalysisStatus::Failed => "failed",
        }
    }
}

/// Why an analysis failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub cause: ErrorCause,
    pub message: String,
}

/// The per-domain aggregate handed from the orchestrator to the report assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Normalized domain, or the trimmed input when it failed validation
    pub domain: String,
    pub status: AnalysisStatus,
    /// Present unless the analysis failed
    pub metrics: Option<DropMetrics>,
    /// Present only when enrichment was requested and succeeded
    pub label: Option<ThematicLabel>,
    /// Present only when the analysis failed
    pub failure: Option<FailureInfo>,
    /// Non-fatal problems (e.g. classifier unavailable)
    pub warnings: Vec<String>,
    /// Archive attempts made (0 when rejected before fetching)
    pub attempts: u32,
}

impl AnalysisResult {
    /// A completed analysis; `Partial` when the timeline was truncated.
    pub fn completed(
        domain: &Domain,
        metrics: DropMetrics,
        label: Option<ThematicLabel>,
        truncated: bool,
        warnings: Vec<String>,
        attempts: u32,
    ) -> Self {
        AnalysisResult {
            domain: domain.to_string(),
            status: if truncated {
                AnalysisStatus::Partial
            } else {
                AnalysisStatus::Succeeded
            },
            metrics: Some(metrics),
            label,
            failure: None,
            warnings,
            attempts,
        }
    }

    /// A failed analysis with its cause.
    pub fn failed(
        domain: impl Into<String>,
        cause: ErrorCause,
        message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        AnalysisResult {
            domain: domain.into(),
            status: AnalysisStatus::Failed,
            metrics: None,
            label: None,
            failure: Some(FailureInfo {
                cause,
                message: message.into(),
            }),
            warnings: Vec::new(),
            attempts,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == AnalysisStatus::Failed
    }

    /// Failure cause, if the analysis failed.
    pub fn cause(&self) -> Option<ErrorCause> {
        self.failure.as_ref().map(|f| f.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(ts: (i32, u32, u32), status: Option<u16>) -> Snapshot {
        Snapshot {
            timestamp: Utc.with_ymd_and_hms(ts.0, ts.1, ts.2, 0, 0, 0).unwrap(),
            original_url: "http://example.com/".to_string(),
            status_code: status,
            digest: None,
            length: None,
        }
    }

    #[test]
    fn test_timeline_orders_snapshots() {
        let domain = Domain::parse("example.com").unwrap();
        let timeline = Timeline::new(
            domain,
            vec![
                snapshot((2021, 1, 1), Some(200)),
                snapshot((2019, 1, 1), Some(200)),
                snapshot((2020, 1, 1), Some(404)),
            ],
        );
        let years: Vec<i32> = timeline
            .snapshots()
            .iter()
            .map(|s| s.timestamp.format("%Y").to_string().parse().unwrap())
            .collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
    }

    #[test]
    fn test_timeline_stable_for_equal_timestamps() {
        let domain = Domain::parse("example.com").unwrap();
        let mut first = snapshot((2020, 1, 1), Some(200));
        first.original_url = "http://example.com/a".to_string();
        let mut second = snapshot((2020, 1, 1), Some(200));
        second.original_url = "http://example.com/b".to_string();
        let timeline = Timeline::new(domain, vec![first, second]);
        assert_eq!(timeline.snapshots()[0].original_url, "http://example.com/a");
        assert_eq!(timeline.snapshots()[1].original_url, "http://example.com/b");
    }

    #[test]
    fn test_snapshot_status_helpers() {
        assert!(snapshot((2020, 1, 1), Some(200)).is_success());
        assert!(!snapshot((2020, 1, 1), Some(301)).is_success());
        assert!(snapshot((2020, 1, 1), Some(404)).is_error());
        assert!(!snapshot((2020, 1, 1), None).is_error());
    }

    #[test]
    fn test_snapshot_replay_url() {
        let s = snapshot((2020, 6, 1), Some(200));
        assert_eq!(s.archive_timestamp(), "20200601000000");
        assert_eq!(
            s.replay_url("https://web.archive.org/"),
            "https://web.archive.org/web/20200601000000/http://example.com/"
        );
    }

    #[test]
    fn test_failed_result() {
        let result = AnalysisResult::failed("", ErrorCause::Validation, "domain is empty", 0);
        assert!(result.is_failed());
        assert_eq!(result.cause(), Some(ErrorCause::Validation));
        assert!(result.metrics.is_none());
    }
}
