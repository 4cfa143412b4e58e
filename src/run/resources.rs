//! Batch resources and shared state.
//!
//! Everything a unit of work needs is bundled in `UnitContext`, which is
//! shared read-only between units (the counters and limiters are the only
//! shared mutable state, and both are safe under concurrent access).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::archive::SnapshotSource;
use crate::classifier::ThemeClassifier;
use crate::config::{Config, CLASSIFIER_MAX_RETRIES};
use crate::error_handling::{ProcessingStats, RetryPolicy};
use crate::metrics::MetricsSettings;
use crate::rate_limiter::Limiters;

/// Per-unit tuning derived from `Config`.
#[derive(Debug, Clone)]
pub struct UnitSettings {
    /// Backoff schedule for transient archive failures
    pub retry: RetryPolicy,
    /// Retries for transient classifier failures other than timeouts
    pub classifier_retries: usize,
    /// Bound on a single timeline or content request
    pub archive_timeout: Duration,
    /// Bound on a single classification request
    pub classifier_timeout: Duration,
    pub metrics: MetricsSettings,
    pub sample_snapshots: usize,
    pub sample_max_chars: usize,
    pub max_body_bytes: usize,
}

impl Default for UnitSettings {
    fn default() -> Self {
        UnitSettings::from_config(&Config::default())
    }
}

impl UnitSettings {
    pub fn from_config(config: &Config) -> Self {
        UnitSettings {
            retry: config.retry_policy(),
            classifier_retries: CLASSIFIER_MAX_RETRIES,
            archive_timeout: config.archive_timeout(),
            classifier_timeout: config.classifier_timeout(),
            metrics: config.metrics_settings(),
            sample_snapshots: config.sample_snapshots,
            sample_max_chars: config.sample_max_chars,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// Progress counters, read by the periodic progress logger.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    /// Domains submitted in this batch
    pub total: AtomicUsize,
    /// Units that finished with metrics
    pub completed: AtomicUsize,
    /// Units that finished without metrics
    pub failed: AtomicUsize,
}

impl ProgressCounters {
    pub fn with_total(total: usize) -> Self {
        ProgressCounters {
            total: AtomicUsize::new(total),
            ..Default::default()
        }
    }

    pub fn finished(&self) -> usize {
        self.completed.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }
}

/// Shared context of every unit in a batch.
pub struct UnitContext {
    pub source: Arc<dyn SnapshotSource>,
    /// `None` when enrichment is disabled
    pub classifier: Option<Arc<dyn ThemeClassifier>>,
    pub limiters: Limiters,
    pub settings: UnitSettings,
    pub stats: Arc<ProcessingStats>,
    pub progress: Arc<ProgressCounters>,
}
