//! Drop metrics derived from a capture timeline.
//!
//! `compute_drop_metrics` is a pure function of the timeline, the injected
//! current time and the settings: the same inputs always yield identical
//! metrics. The input timeline is never mutated; captures are walked in
//! timestamp order (stable for equal timestamps) even if the caller did not
//! sort them.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error_handling::InternalError;
use crate::models::{Snapshot, Timeline};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Drop classification of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropStatus {
    /// Captured within the staleness threshold
    Active,
    /// Last capture is older than the staleness threshold
    Dropped,
    /// Never captured
    Unknown,
}

impl DropStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropStatus::Active => "active",
            DropStatus::Dropped => "dropped",
            DropStatus::Unknown => "unknown",
        }
    }
}

/// Settings for drop classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSettings {
    /// A domain whose last capture is older than this is dropped
    pub staleness_threshold: TimeDelta,
    /// When set, this many trailing error captures also mark a domain dropped
    pub error_tail_threshold: Option<usize>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            staleness_threshold: TimeDelta::days(i64::from(
                crate::config::DEFAULT_STALENESS_DAYS,
            )),
            error_tail_threshold: None,
        }
    }
}

/// Quantitative drop signals for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DropMetrics {
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Longest interval between consecutive captures (zero for one capture)
    pub longest_gap: Option<TimeDelta>,
    /// Mean interval between consecutive captures (needs two captures)
    pub average_interval: Option<TimeDelta>,
    /// Time from the last capture to the evaluation time, floored at zero
    pub last_seen_age: Option<TimeDelta>,
    pub total_captures: usize,
    /// Distinct calendar years with at least one capture
    pub years_covered: usize,
    /// Captures per year over the first-to-last span (span floored at one day)
    pub capture_density: f64,
    /// Trailing captures with an HTTP error status
    pub error_tail: usize,
    /// Original URL of the first capture
    pub oldest_url: Option<String>,
    /// Original URL of the last capture
    pub newest_url: Option<String>,
    pub status: DropStatus,
}

impl DropMetrics {
    /// Metrics of a domain that was never captured.
    pub fn unknown() -> Self {
        DropMetrics {
            first_seen: None,
            last_seen: None,
            longest_gap: None,
            average_interval: None,
            last_seen_age: None,
            total_captures: 0,
            years_covered: 0,
            capture_density: 0.0,
            error_tail: 0,
            oldest_url: None,
            newest_url: None,
            status: DropStatus::Unknown,
        }
    }

    pub fn longest_gap_days(&self) -> Option<f64> {
        self.longest_gap.map(days)
    }

    pub fn average_interval_days(&self) -> Option<f64> {
        self.average_interval.map(days)
    }

    pub fn last_seen_age_days(&self) -> Option<f64> {
        self.last_seen_age.map(days)
    }
}

/// Converts a duration to fractional days.
pub fn days(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 / SECONDS_PER_DAY
}

/// Derives drop metrics from a timeline.
///
/// Status is `Unknown` for an empty timeline, `Dropped` when
/// `now - last_seen` exceeds the staleness threshold (or, if configured, the
/// error tail reaches its threshold), and `Active` otherwise.
///
/// # Errors
///
/// Returns `InternalError` if the ordered captures violate
/// `last_seen >= first_seen` or interval arithmetic overflows.
pub fn compute_drop_metrics(
    timeline: &Timeline,
    now: DateTime<Utc>,
    settings: &MetricsSettings,
) -> Result<DropMetrics, InternalError> {
    let mut ordered: Vec<&Snapshot> = timeline.snapshots().iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
        return Ok(DropMetrics::unknown());
    };

    if last.timestamp < first.timestamp {
        return Err(InternalError(format!(
            "last capture {} precedes first capture {} for {}",
            last.timestamp,
            first.timestamp,
            timeline.domain()
        )));
    }

    let gaps: Vec<TimeDelta> = ordered
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect();
    let longest_gap = gaps.iter().max().copied().unwrap_or_else(TimeDelta::zero);

    let span = last.timestamp - first.timestamp;
    let average_interval = if gaps.is_empty() {
        None
    } else {
        let count = i32::try_from(gaps.len())
            .map_err(|_| InternalError(format!("too many captures for {}", timeline.domain())))?;
        Some(span / count)
    };

    let years_covered = ordered
        .iter()
        .map(|s| s.timestamp.year())
        .collect::<BTreeSet<_>>()
        .len();

    let span_days = days(span).max(1.0);
    let capture_density = ordered.len() as f64 / span_days * DAYS_PER_YEAR;

    let error_tail = ordered.iter().rev().take_while(|s| s.is_error()).count();

    let last_seen_age = (now - last.timestamp).max(TimeDelta::zero());
    let stale = last_seen_age > settings.staleness_threshold;
    let dead_tail = settings
        .error_tail_threshold
        .is_some_and(|threshold| error_tail >= threshold);
    let status = if stale || dead_tail {
        DropStatus::Dropped
    } else {
        DropStatus::Active
    };

    Ok(DropMetrics {
        first_seen: Some(first.timestamp),
        last_seen: Some(last.timestamp),
        longest_gap: Some(longest_gap),
        average_interval,
        last_seen_age: Some(last_seen_age),
        total_captures: ordered.len(),
        years_covered,
        capture_density,
        error_tail,
        oldest_url: Some(first.original_url.clone()),
        newest_url: Some(last.original_url.clone()),
        status,
    })
}
