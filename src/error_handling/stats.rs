//! Processing statistics tracking.
//!
//! Thread-safe counters for failure causes, degraded enrichment and retries,
//! shared by every unit of a batch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::categorization::ErrorCause;

/// Thread-safe processing statistics tracker.
///
/// Failure causes are counted per `ErrorCause`; enrichment problems that do
/// not fail a domain are counted as warnings under their cause.
/// All counters are initialized to zero on creation.
#[derive(Debug)]
pub struct ProcessingStats {
    failures: HashMap<ErrorCause, AtomicUsize>,
    warnings: HashMap<ErrorCause, AtomicUsize>,
    retries: AtomicUsize,
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStats {
    pub fn new() -> Self {
        let failures = ErrorCause::iter()
            .map(|cause| (cause, AtomicUsize::new(0)))
            .collect();
        let warnings = ErrorCause::iter()
            .map(|cause| (cause, AtomicUsize::new(0)))
            .collect();

        ProcessingStats {
            failures,
            warnings,
            retries: AtomicUsize::new(0),
        }
    }

    /// Counts a failed unit under its cause.
    pub fn increment_failure(&self, cause: ErrorCause) {
        if let Some(counter) = self.failures.get(&cause) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("Failure cause {:?} missing from stats map", cause);
        }
    }

    /// Counts a non-fatal problem (e.g. classifier failure) under its cause.
    pub fn increment_warning(&self, cause: ErrorCause) {
        if let Some(counter) = self.warnings.get(&cause) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("Warning cause {:?} missing from stats map", cause);
        }
    }

    /// Counts one retry of a transient archive failure.
    pub fn increment_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_failure_count(&self, cause: ErrorCause) -> usize {
        self.failures
            .get(&cause)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn get_warning_count(&self, cause: ErrorCause) -> usize {
        self.warnings
            .get(&cause)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn retry_count(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn total_failures(&self) -> usize {
        self.failures.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    pub fn total_warnings(&self) -> usize {
        self.warnings.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}
