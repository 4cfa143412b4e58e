//! Format-agnostic tabular projection of a report.

use chrono::{DateTime, Utc};

use crate::models::AnalysisResult;

/// Column names, in output order.
pub const REPORT_COLUMNS: [&str; 22] = [
    "domain",
    "analysis_status",
    "drop_status",
    "first_seen",
    "last_seen",
    "last_seen_age_days",
    "longest_gap_days",
    "average_interval_days",
    "total_captures",
    "years_covered",
    "capture_density",
    "error_tail",
    "oldest_url",
    "newest_url",
    "primary_category",
    "main_topics",
    "keywords",
    "label_confidence",
    "label_summary",
    "failure_cause",
    "failure_message",
    "warnings",
];

const LIST_SEPARATOR: &str = "; ";

/// Header plus one row of string cells per report row.
///
/// Absent values are empty cells. Renderers only need to write cells out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        ReportTable {
            columns: REPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: results.iter().map(project).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of `row` in the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

fn project(result: &AnalysisResult) -> Vec<String> {
    let metrics = result.metrics.as_ref();
    let label = result.label.as_ref();
    let failure = result.failure.as_ref();

    vec![
        result.domain.clone(),
        result.status.as_str().to_string(),
        metrics.map(|m| m.status.as_str().to_string()).unwrap_or_default(),
        format_time(metrics.and_then(|m| m.first_seen)),
        format_time(metrics.and_then(|m| m.last_seen)),
        format_days(metrics.and_then(|m| m.last_seen_age_days())),
        format_days(metrics.and_then(|m| m.longest_gap_days())),
        format_days(metrics.and_then(|m| m.average_interval_days())),
        metrics.map(|m| m.total_captures.to_string()).unwrap_or_default(),
        metrics.map(|m| m.years_covered.to_string()).unwrap_or_default(),
        metrics
            .map(|m| format!("{:.2}", m.capture_density))
            .unwrap_or_default(),
        metrics.map(|m| m.error_tail.to_string()).unwrap_or_default(),
        metrics.and_then(|m| m.oldest_url.clone()).unwrap_or_default(),
        metrics.and_then(|m| m.newest_url.clone()).unwrap_or_default(),
        label.map(|l| l.primary_category.clone()).unwrap_or_default(),
        label
            .map(|l| l.main_topics.join(LIST_SEPARATOR))
            .unwrap_or_default(),
        label
            .map(|l| l.keywords.join(LIST_SEPARATOR))
            .unwrap_or_default(),
        label
            .map(|l| format!("{:.2}", l.confidence))
            .unwrap_or_default(),
        label.and_then(|l| l.summary.clone()).unwrap_or_default(),
        failure.map(|f| f.cause.as_str().to_string()).unwrap_or_default(),
        failure.map(|f| f.message.clone()).unwrap_or_default(),
        result.warnings.join(LIST_SEPARATOR),
    ]
}

fn format_time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

fn format_days(value: Option<f64>) -> String {
    value.map(|d| format!("{d:.1}")).unwrap_or_default()
}
