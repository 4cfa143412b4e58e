//! Batch finalization.
//!
//! Stops the background tasks, assembles the report and prints the
//! end-of-run statistics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::app::{log_progress, print_error_statistics, print_simple_summary, shutdown_gracefully};
use crate::error_handling::BatchError;
use crate::models::AnalysisResult;
use crate::report::{assemble_report, FilterCriteria};

use super::resources::UnitContext;
use super::BatchOutcome;

/// State handed from the scheduling loop to finalization.
pub(super) struct BatchRun {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub start_time: std::time::Instant,
    pub cancelled: bool,
    pub logging_cancel: CancellationToken,
    pub logging_task: Option<tokio::task::JoinHandle<()>>,
    pub results: Vec<AnalysisResult>,
}

/// Finalize a batch and produce its outcome.
///
/// # Errors
///
/// Returns `BatchError::Validation` if the criteria do not validate. Callers
/// validate them before scheduling, so this only fires for criteria that were
/// never checked.
pub(super) async fn finalize_batch(
    ctx: &UnitContext,
    run: BatchRun,
    criteria: Option<FilterCriteria>,
) -> Result<BatchOutcome, BatchError> {
    let BatchRun {
        batch_id,
        started_at,
        start_time,
        cancelled,
        logging_cancel,
        logging_task,
        results,
    } = run;

    shutdown_gracefully(logging_cancel, logging_task, &ctx.limiters).await;
    log_progress(start_time, &ctx.progress);

    let finished_at = Utc::now();
    let elapsed_seconds = start_time.elapsed().as_secs_f64();

    let report = assemble_report(results, criteria)?;
    if !report.summary.is_reconciled() {
        log::error!("Report summary does not reconcile: {:?}", report.summary);
    }

    print_error_statistics(&ctx.stats);
    print_simple_summary(&report.summary, elapsed_seconds);
    if cancelled {
        log::warn!(
            "Batch {} was cancelled, {} domain(s) were not analyzed",
            batch_id,
            report.summary.cancelled
        );
    }

    Ok(BatchOutcome {
        batch_id,
        report,
        cancelled,
        started_at,
        finished_at,
        elapsed_seconds,
        stats: Arc::clone(&ctx.stats),
    })
}
