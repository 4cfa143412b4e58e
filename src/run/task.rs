//! Per-domain unit of work.
//!
//! A unit walks through an explicit state machine:
//!
//! ```text
//! pending -> fetching -> (retrying -> fetching)* -> metrics -> classifying -> done
//!                   \                                    \
//!                    +-> failed                           +-> failed
//! ```
//!
//! Every external call is throttled by the service's limiter, bounded by its
//! own timeout and reported back to the limiter.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::classifier::{
    html_to_text, select_representative, truncate_chars, ContentSample, ThematicLabel,
    ThemeClassifier,
};
use crate::domain::Domain;
use crate::error_handling::{get_retry_strategy, ClassificationError, ErrorCause, FetchError};
use crate::metrics::{compute_drop_metrics, DropMetrics};
use crate::models::{AnalysisResult, Snapshot, Timeline};
use crate::rate_limiter::{report, throttle, CallOutcome};

use super::resources::UnitContext;

/// Lifecycle state of one unit.
#[derive(Debug)]
pub enum UnitState {
    Pending,
    /// Timeline request in flight; `attempt` starts at 1
    Fetching { attempt: u32 },
    /// Waiting out the backoff after a transient failure
    Retrying {
        attempt: u32,
        delay: Duration,
        error: FetchError,
    },
    Metrics { timeline: Timeline, attempts: u32 },
    Classifying {
        timeline: Timeline,
        metrics: DropMetrics,
        attempts: u32,
    },
    Done(AnalysisResult),
    Failed(AnalysisResult),
}

impl UnitState {
    pub fn name(&self) -> &'static str {
        match self {
            UnitState::Pending => "pending",
            UnitState::Fetching { .. } => "fetching",
            UnitState::Retrying { .. } => "retrying",
            UnitState::Metrics { .. } => "metrics",
            UnitState::Classifying { .. } => "classifying",
            UnitState::Done(_) => "done",
            UnitState::Failed(_) => "failed",
        }
    }
}

/// Runs one domain from `pending` to a terminal state.
///
/// `now` is the reference time for staleness; it is fixed per batch so every
/// domain is judged against the same instant. Enrichment runs when `enrich`
/// is set and the context has a classifier. Cancellation is observed while
/// waiting for a retry and before enrichment; a unit that already holds a
/// timeline always completes.
pub async fn analyze_domain(
    ctx: &UnitContext,
    domain: Domain,
    enrich: bool,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> AnalysisResult {
    let mut delays = get_retry_strategy(&ctx.settings.retry);
    let mut state = UnitState::Pending;

    loop {
        log::trace!("{domain}: {}", state.name());
        state = match state {
            UnitState::Pending => UnitState::Fetching { attempt: 1 },

            UnitState::Fetching { attempt } => match fetch_timeline(ctx, &domain).await {
                Ok(timeline) => UnitState::Metrics {
                    timeline,
                    attempts: attempt,
                },
                Err(error) if error.is_transient() => match delays.next() {
                    Some(delay) => UnitState::Retrying {
                        attempt,
                        delay,
                        error,
                    },
                    None => fail(ctx, &domain, error.cause(), error.to_string(), attempt),
                },
                Err(error) => fail(ctx, &domain, error.cause(), error.to_string(), attempt),
            },

            UnitState::Retrying {
                attempt,
                delay,
                error,
            } => {
                log::debug!(
                    "{domain}: attempt {attempt} failed ({error}), retrying in {:?}",
                    delay
                );
                ctx.stats.increment_retry();
                tokio::select! {
                    _ = cancel.cancelled() => fail(
                        ctx,
                        &domain,
                        error.cause(),
                        format!("{error} (retry abandoned, batch cancelled)"),
                        attempt,
                    ),
                    _ = tokio::time::sleep(delay) => UnitState::Fetching { attempt: attempt + 1 },
                }
            }

            UnitState::Metrics { timeline, attempts } => {
                match compute_drop_metrics(&timeline, now, &ctx.settings.metrics) {
                    Ok(metrics) => UnitState::Classifying {
                        timeline,
                        metrics,
                        attempts,
                    },
                    Err(e) => fail(ctx, &domain, ErrorCause::Internal, e.to_string(), attempts),
                }
            }

            UnitState::Classifying {
                timeline,
                metrics,
                attempts,
            } => {
                let mut warnings = Vec::new();
                if timeline.is_truncated() {
                    warnings.push(format!(
                        "timeline truncated at {} captures",
                        timeline.len()
                    ));
                }
                let classifier = ctx.classifier.as_ref().filter(|_| enrich);
                let label = match classifier {
                    Some(_) if cancel.is_cancelled() => {
                        warnings.push("enrichment skipped: batch cancelled".to_string());
                        None
                    }
                    Some(classifier) => {
                        enrich_domain(ctx, classifier.as_ref(), &domain, &timeline, &mut warnings).await
                    }
                    None => None,
                };
                ctx.progress.completed.fetch_add(1, Ordering::SeqCst);
                log::debug!(
                    "{domain}: {} ({} captures, {} attempt(s))",
                    metrics.status.as_str(),
                    metrics.total_captures,
                    attempts
                );
                UnitState::Done(AnalysisResult::completed(
                    &domain,
                    metrics,
                    label,
                    timeline.is_truncated(),
                    warnings,
                    attempts,
                ))
            }

            UnitState::Done(result) | UnitState::Failed(result) => return result,
        };
    }
}

fn fail(
    ctx: &UnitContext,
    domain: &Domain,
    cause: ErrorCause,
    message: String,
    attempts: u32,
) -> UnitState {
    log::warn!("Failed to analyze {domain} ({cause}): {message}");
    ctx.stats.increment_failure(cause);
    ctx.progress.failed.fetch_add(1, Ordering::SeqCst);
    UnitState::Failed(AnalysisResult::failed(domain.as_str(), cause, message, attempts))
}

fn fetch_outcome<T>(result: &Result<T, FetchError>) -> CallOutcome {
    match result {
        Err(FetchError::RateLimited) => CallOutcome::RateLimited,
        Err(FetchError::Timeout) => CallOutcome::Timeout,
        _ => CallOutcome::Success,
    }
}

fn classification_outcome<T>(result: &Result<T, ClassificationError>) -> CallOutcome {
    match result {
        Err(ClassificationError::RateLimited) => CallOutcome::RateLimited,
        Err(ClassificationError::Timeout) => CallOutcome::Timeout,
        _ => CallOutcome::Success,
    }
}

async fn fetch_timeline(ctx: &UnitContext, domain: &Domain) -> Result<Timeline, FetchError> {
    let limiter = ctx.limiters.archive.as_ref();
    throttle(limiter).await;
    let result = tokio::time::timeout(
        ctx.settings.archive_timeout,
        ctx.source.fetch_timeline(domain),
    )
    .await
    .unwrap_or(Err(FetchError::Timeout));
    report(limiter, fetch_outcome(&result)).await;
    result
}

async fn fetch_content(ctx: &UnitContext, snapshot: &Snapshot) -> Result<String, FetchError> {
    let limiter = ctx.limiters.archive.as_ref();
    throttle(limiter).await;
    let result = tokio::time::timeout(
        ctx.settings.archive_timeout,
        ctx.source.fetch_content(snapshot, ctx.settings.max_body_bytes),
    )
    .await
    .unwrap_or(Err(FetchError::Timeout));
    report(limiter, fetch_outcome(&result)).await;
    result
}

/// Reduces representative captures to one bounded text sample.
///
/// Page bodies are dropped as soon as their text is extracted; each part is
/// cut to the sample cap before it is kept.
async fn collect_sample(
    ctx: &UnitContext,
    timeline: &Timeline,
    warnings: &mut Vec<String>,
) -> Option<ContentSample> {
    let picks = select_representative(timeline, ctx.settings.sample_snapshots);
    let mut parts: Vec<String> = Vec::with_capacity(picks.len());

    for snapshot in picks {
        match fetch_content(ctx, snapshot).await {
            Ok(html) => {
                let text = html_to_text(&html);
                if !text.is_empty() {
                    parts.push(truncate_chars(&text, ctx.settings.sample_max_chars).to_string());
                }
            }
            Err(e) => {
                log::debug!(
                    "{}: capture {} unavailable for sampling: {e}",
                    timeline.domain(),
                    snapshot.archive_timestamp()
                );
                warnings.push(format!(
                    "sample {} unavailable: {e}",
                    snapshot.archive_timestamp()
                ));
            }
        }
    }

    ContentSample::from_parts(&parts, ctx.settings.sample_max_chars)
}

/// Samples content and classifies it. Never fails the unit.
async fn enrich_domain(
    ctx: &UnitContext,
    classifier: &dyn ThemeClassifier,
    domain: &Domain,
    timeline: &Timeline,
    warnings: &mut Vec<String>,
) -> Option<ThematicLabel> {
    if select_representative(timeline, ctx.settings.sample_snapshots).is_empty() {
        log::debug!("{domain}: no successful capture to sample, skipping enrichment");
        return None;
    }
    let Some(sample) = collect_sample(ctx, timeline, warnings).await else {
        record_classifier_warning(ctx, domain, &ClassificationError::EmptySample, warnings);
        return None;
    };
    if sample.is_truncated() {
        log::debug!(
            "{domain}: sample cut to {} characters",
            sample.char_count()
        );
    }

    let limiter = ctx.limiters.classifier.as_ref();
    let mut retries_left = ctx.settings.classifier_retries;
    loop {
        throttle(limiter).await;
        let result = tokio::time::timeout(
            ctx.settings.classifier_timeout,
            classifier.classify(domain, &sample),
        )
        .await
        .unwrap_or(Err(ClassificationError::Timeout));
        report(limiter, classification_outcome(&result)).await;

        match result {
            Ok(label) => return Some(label),
            // Timeouts already cost a full timeout window, so they are not retried
            Err(e)
                if e.is_transient()
                    && e != ClassificationError::Timeout
                    && retries_left > 0 =>
            {
                retries_left -= 1;
                log::debug!("{domain}: classification failed ({e}), retrying");
                tokio::time::sleep(ctx.settings.retry.initial_delay).await;
            }
            Err(e) => {
                record_classifier_warning(ctx, domain, &e, warnings);
                return None;
            }
        }
    }
}

fn record_classifier_warning(
    ctx: &UnitContext,
    domain: &Domain,
    error: &ClassificationError,
    warnings: &mut Vec<String>,
) {
    match error {
        ClassificationError::NotConfigured => log::debug!("{domain}: {error}"),
        _ => log::warn!("Classification failed for {domain}: {error}"),
    }
    ctx.stats.increment_warning(ErrorCause::ClassifierUnavailable);
    warnings.push(format!("classification skipped: {error}"));
}
