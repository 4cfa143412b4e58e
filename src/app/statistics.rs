//! Statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorCause, ProcessingStats};
use crate::report::ReportSummary;

/// Prints failure and warning counts per cause to the log.
pub fn print_error_statistics(error_stats: &ProcessingStats) {
    let total_failures = error_stats.total_failures();
    let total_warnings = error_stats.total_warnings();
    let retries = error_stats.retry_count();

    if total_failures > 0 {
        info!("Failure Counts ({} total):", total_failures);
        for cause in ErrorCause::iter() {
            let count = error_stats.get_failure_count(cause);
            if count > 0 {
                info!("   {}: {}", cause.as_str(), count);
            }
        }
    }

    if total_warnings > 0 {
        info!("Warning Counts ({} total):", total_warnings);
        for cause in ErrorCause::iter() {
            let count = error_stats.get_warning_count(cause);
            if count > 0 {
                info!("   {}: {}", cause.as_str(), count);
            }
        }
    }

    if retries > 0 {
        info!("Archive retries: {}", retries);
    }
}

/// Prints a one-line summary of the batch.
pub fn print_simple_summary(summary: &ReportSummary, elapsed_seconds: f64) {
    info!(
        "✅ Analyzed {} domain{} ({} succeeded, {} partial, {} failed) in {:.1}s, {} in report",
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.succeeded,
        summary.partial,
        summary.failed,
        elapsed_seconds,
        summary.included
    );
}
