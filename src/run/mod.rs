//! Batch orchestration.
//!
//! Drives the per-domain pipeline (fetch, metrics, optional enrichment) for
//! every domain of a batch:
//! - Malformed entries are rejected before they take a concurrency slot
//! - At most `max_concurrency` units run at once, each as its own task
//! - A unit's failure (or panic) is recorded on its own result only
//! - Cancellation stops scheduling; finished results are kept and the
//!   unscheduled entries are reported as cancelled
//!
//! Results come back in submission order, exactly one per entry.

mod finalize;
mod init;
mod resources;
mod task;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::app::spawn_progress_logger;
use crate::archive::SnapshotSource;
use crate::classifier::ThemeClassifier;
use crate::config::{Config, LOGGING_INTERVAL_SECS};
use crate::domain::Domain;
use crate::error_handling::{BatchError, ErrorCause, ProcessingStats};
use crate::initialization::init_semaphore;
use crate::models::AnalysisResult;
use crate::rate_limiter::Limiters;
use crate::report::{FilterCriteria, Report};

use finalize::{finalize_batch, BatchRun};
pub use init::init_batch_resources;
pub use resources::{ProgressCounters, UnitContext, UnitSettings};
pub use task::{analyze_domain, UnitState};

/// A batch submission: domains, enrichment flag and optional filter.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Raw domain entries; each yields exactly one result
    pub domains: Vec<String>,
    /// Whether to classify each domain's archived content
    pub enrich: bool,
    /// `None` produces a general (unfiltered) report
    pub criteria: Option<FilterCriteria>,
}

impl BatchRequest {
    pub fn new(domains: Vec<String>) -> Self {
        BatchRequest {
            domains,
            ..Default::default()
        }
    }

    pub fn with_enrichment(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }
}

/// Results of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Batch identifier (format: `batch_<timestamp_millis>`)
    pub batch_id: String,
    pub report: Report,
    /// Whether the batch was cancelled before every domain was scheduled
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    /// Failure, warning and retry counters of the batch
    pub stats: Arc<ProcessingStats>,
}

/// Runs one batch over a set of services.
///
/// `analyze_batch` builds one from a `Config`; tests and embedders can plug in
/// their own `SnapshotSource` and `ThemeClassifier`.
pub struct Analyzer {
    ctx: Arc<UnitContext>,
    max_concurrency: usize,
}

impl Analyzer {
    pub fn new(ctx: UnitContext, max_concurrency: usize) -> Self {
        Analyzer {
            ctx: Arc::new(ctx),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Builds an analyzer without rate limiting.
    pub fn with_services(
        source: Arc<dyn SnapshotSource>,
        classifier: Option<Arc<dyn ThemeClassifier>>,
        settings: UnitSettings,
        max_concurrency: usize,
    ) -> Self {
        Analyzer::new(
            UnitContext {
                source,
                classifier,
                limiters: Limiters::default(),
                settings,
                stats: Arc::new(ProcessingStats::new()),
                progress: Arc::new(ProgressCounters::default()),
            },
            max_concurrency,
        )
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.ctx.stats
    }

    pub fn progress(&self) -> &Arc<ProgressCounters> {
        &self.ctx.progress
    }

    /// Analyzes every entry of `domains` and returns one result per entry,
    /// in submission order.
    ///
    /// `now` is the reference time for staleness. Enrichment runs only when
    /// `enrich` is set and a classifier is configured.
    pub async fn run(
        &self,
        domains: &[String],
        enrich: bool,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Vec<AnalysisResult> {
        let ctx = &self.ctx;
        ctx.progress.total.store(domains.len(), Ordering::SeqCst);

        let semaphore = init_semaphore(self.max_concurrency);
        let mut slots: Vec<Option<AnalysisResult>> =
            std::iter::repeat_with(|| None).take(domains.len()).collect();
        let mut tasks = FuturesUnordered::new();

        for (index, raw) in domains.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            let domain = match Domain::parse(raw) {
                Ok(domain) => domain,
                Err(e) => {
                    warn!("Rejected domain entry {:?}: {e}", raw);
                    ctx.stats.increment_failure(ErrorCause::Validation);
                    ctx.progress.failed.fetch_add(1, Ordering::SeqCst);
                    slots[index] = Some(AnalysisResult::failed(
                        raw.trim(),
                        ErrorCause::Validation,
                        e.to_string(),
                        0,
                    ));
                    continue;
                }
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Semaphore closed, no further domains scheduled");
                        break;
                    }
                },
            };

            let unit_ctx = Arc::clone(&self.ctx);
            let unit_cancel = cancel.clone();
            let name = domain.to_string();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                analyze_domain(&unit_ctx, domain, enrich, now, &unit_cancel).await
            });
            tasks.push(async move { (index, name, handle.await) });
        }

        while let Some((index, name, joined)) = tasks.next().await {
            slots[index] = Some(match joined {
                Ok(result) => result,
                Err(join_error) => {
                    warn!("Analysis task for {name} panicked: {join_error}");
                    ctx.stats.increment_failure(ErrorCause::Internal);
                    ctx.progress.failed.fetch_add(1, Ordering::SeqCst);
                    AnalysisResult::failed(
                        name,
                        ErrorCause::Internal,
                        format!("analysis task failed: {join_error}"),
                        0,
                    )
                }
            });
        }

        slots
            .into_iter()
            .zip(domains)
            .map(|(slot, raw)| {
                slot.unwrap_or_else(|| {
                    ctx.stats.increment_failure(ErrorCause::Cancelled);
                    ctx.progress.failed.fetch_add(1, Ordering::SeqCst);
                    let name = Domain::parse(raw)
                        .map(|d| d.to_string())
                        .unwrap_or_else(|_| raw.trim().to_string());
                    AnalysisResult::failed(
                        name,
                        ErrorCause::Cancelled,
                        "batch cancelled before analysis started",
                        0,
                    )
                })
            })
            .collect()
    }

    /// Runs the whole batch: validation, analysis, report assembly.
    ///
    /// Consumes the analyzer; its limiters are stopped when the batch ends.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Validation` if the request's criteria are invalid.
    /// Per-domain problems never fail the batch.
    pub async fn analyze(
        self,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, BatchError> {
        if let Some(criteria) = &request.criteria {
            criteria.validate()?;
        }
        if request.enrich && self.ctx.classifier.is_none() {
            warn!("Enrichment requested but no classifier is configured");
        }

        let started_at = Utc::now();
        let batch_id = format!("batch_{}", started_at.timestamp_millis());
        info!(
            "Starting batch {}: {} domain(s), concurrency {}",
            batch_id,
            request.domains.len(),
            self.max_concurrency
        );

        let start_time = std::time::Instant::now();
        let logging_cancel = CancellationToken::new();
        let logging_task = spawn_progress_logger(
            start_time,
            Arc::clone(&self.ctx.progress),
            Duration::from_secs(LOGGING_INTERVAL_SECS),
            logging_cancel.clone(),
        );

        let results = self
            .run(&request.domains, request.enrich, started_at, &cancel)
            .await;

        let run = BatchRun {
            batch_id,
            started_at,
            start_time,
            cancelled: cancel.is_cancelled(),
            logging_cancel,
            logging_task: Some(logging_task),
            results,
        };
        finalize_batch(&self.ctx, run, request.criteria).await
    }
}

/// Analyzes a batch of domains with the services described by `config`.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error only when the batch cannot start: invalid configuration
/// or criteria, or an HTTP client that cannot be built.
///
/// # Example
///
/// ```no_run
/// use domain_drop::{analyze_batch, BatchRequest, Config};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let request = BatchRequest::new(vec!["example.com".to_string()]);
/// let outcome = analyze_batch(&config, request, CancellationToken::new()).await?;
/// println!("{} of {} domains in report",
///          outcome.report.summary.included, outcome.report.summary.total);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_batch(
    config: &Config,
    request: BatchRequest,
    cancel: CancellationToken,
) -> Result<BatchOutcome, BatchError> {
    config.validate()?;
    if let Some(criteria) = &request.criteria {
        criteria.validate()?;
    }

    let ctx = init_batch_resources(config, request.enrich)?;
    Analyzer::new(ctx, config.max_concurrency)
        .analyze(request, cancel)
        .await
}
