//! Report assembly: filtering analysed results and summarising the batch.
//!
//! Summary counts always describe the full result list, so callers can see
//! how much the criteria excluded.

mod filter;
mod table;

pub use filter::FilterCriteria;
pub use table::{ReportTable, REPORT_COLUMNS};

use crate::error_handling::{ErrorCause, ValidationError};
use crate::models::{AnalysisResult, AnalysisStatus};

/// Whether the report was filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Every result, failures included
    General,
    /// Only results matching the criteria
    Filtered,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::General => "general",
            ReportKind::Filtered => "filtered",
        }
    }
}

/// Batch-wide counts, computed before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Results received (one per submitted domain)
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// Failed because the batch was cancelled before they ran
    pub cancelled: usize,
    /// Results carrying a thematic label
    pub enriched: usize,
    /// Results with at least one warning
    pub with_warnings: usize,
    /// Rows in the report
    pub included: usize,
    /// Results left out of the report
    pub excluded: usize,
}

impl ReportSummary {
    fn from_results(results: &[AnalysisResult]) -> Self {
        let mut summary = ReportSummary {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.status {
                AnalysisStatus::Succeeded => summary.succeeded += 1,
                AnalysisStatus::Partial => summary.partial += 1,
                AnalysisStatus::Failed => summary.failed += 1,
            }
            if result.cause() == Some(ErrorCause::Cancelled) {
                summary.cancelled += 1;
            }
            if result.label.is_some() {
                summary.enriched += 1;
            }
            if !result.warnings.is_empty() {
                summary.with_warnings += 1;
            }
        }
        summary
    }

    /// `succeeded + partial + failed == total`
    pub fn is_reconciled(&self) -> bool {
        self.succeeded + self.partial + self.failed == self.total
    }
}

/// The filtered result rows plus batch-wide summary counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub criteria: Option<FilterCriteria>,
    /// Surviving results, in submission order
    pub rows: Vec<AnalysisResult>,
    pub summary: ReportSummary,
}

impl Report {
    /// Tabular projection of the rows.
    pub fn table(&self) -> ReportTable {
        ReportTable::from_results(&self.rows)
    }
}

/// Applies `criteria` to `results` and computes the summary.
///
/// Without criteria the report is `General` and keeps every result.
///
/// # Errors
///
/// Returns `ValidationError::InvalidCriteria` if the criteria do not validate.
pub fn assemble_report(
    results: Vec<AnalysisResult>,
    criteria: Option<FilterCriteria>,
) -> Result<Report, ValidationError> {
    if let Some(criteria) = &criteria {
        criteria.validate()?;
    }

    let mut summary = ReportSummary::from_results(&results);
    let (kind, rows): (ReportKind, Vec<AnalysisResult>) = match &criteria {
        Some(criteria) => (
            ReportKind::Filtered,
            results.into_iter().filter(|r| criteria.matches(r)).collect(),
        ),
        None => (ReportKind::General, results),
    };
    summary.included = rows.len();
    summary.excluded = summary.total - rows.len();

    log::info!(
        "Assembled {} report: {} of {} results included",
        kind.as_str(),
        summary.included,
        summary.total
    );

    Ok(Report {
        kind,
        criteria,
        rows,
        summary,
    })
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
