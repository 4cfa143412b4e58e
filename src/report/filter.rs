//! Report filter criteria.

use serde::{Deserialize, Serialize};

use crate::error_handling::ValidationError;
use crate::metrics::{DropMetrics, DropStatus};
use crate::models::{AnalysisResult, AnalysisStatus};

/// Conjunctive predicates over analysis results.
///
/// Every criterion is optional; an unset criterion accepts everything.
/// A numeric threshold on a metric the result does not have (e.g. the
/// average interval of a single capture) rejects the result.
///
/// Thematic criteria (`topic`, `category`, `min_confidence`) reject results
/// without a label unless `absent_label_matches` is set.
///
/// Failed results carry no metrics and no label. They are kept only when
/// `include_failed` is set or `analysis_statuses` names `failed`; even then
/// any metric criterion rejects them, and thematic criteria reject them
/// unless `absent_label_matches` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Accepted drop statuses (empty: any)
    pub statuses: Vec<DropStatus>,
    /// Accepted analysis outcomes (empty: succeeded or partial)
    pub analysis_statuses: Vec<AnalysisStatus>,
    pub min_snapshots: Option<usize>,
    pub min_years: Option<usize>,
    pub max_avg_interval_days: Option<f64>,
    pub max_gap_days: Option<f64>,
    pub min_gap_days: Option<f64>,
    pub min_last_seen_age_days: Option<f64>,
    /// Case-insensitive substring of the category, a topic or a keyword
    pub topic: Option<String>,
    /// Case-insensitive primary category
    pub category: Option<String>,
    pub min_confidence: Option<f64>,
    pub include_failed: bool,
    /// Lets results without a label pass the thematic criteria
    pub absent_label_matches: bool,
}

impl FilterCriteria {
    /// Checks that thresholds are usable.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidCriteria` for negative or non-finite
    /// day thresholds, `min_gap_days > max_gap_days`, a confidence outside
    /// `[0, 1]`, or a blank topic/category.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let day_thresholds = [
            ("max_avg_interval_days", self.max_avg_interval_days),
            ("max_gap_days", self.max_gap_days),
            ("min_gap_days", self.min_gap_days),
            ("min_last_seen_age_days", self.min_last_seen_age_days),
        ];
        for (name, value) in day_thresholds {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(invalid(format!("{name} must be a non-negative number, got {v}")));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_gap_days, self.max_gap_days) {
            if min > max {
                return Err(invalid(format!(
                    "min_gap_days ({min}) exceeds max_gap_days ({max})"
                )));
            }
        }

        if let Some(c) = self.min_confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(invalid(format!("min_confidence must be within 0..=1, got {c}")));
            }
        }

        for (name, value) in [("topic", &self.topic), ("category", &self.category)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(invalid(format!("{name} must not be blank")));
            }
        }

        Ok(())
    }

    /// Whether any thematic criterion is set.
    pub fn is_thematic(&self) -> bool {
        self.topic.is_some() || self.category.is_some() || self.min_confidence.is_some()
    }

    /// Evaluates all criteria against one result.
    pub fn matches(&self, result: &AnalysisResult) -> bool {
        let status_allowed = if result.is_failed() {
            self.include_failed || self.analysis_statuses.contains(&AnalysisStatus::Failed)
        } else {
            self.analysis_statuses.is_empty() || self.analysis_statuses.contains(&result.status)
        };
        if !status_allowed {
            return false;
        }

        let metrics_ok = match result.metrics.as_ref() {
            Some(metrics) => self.matches_metrics(metrics),
            None => !self.has_metric_criteria(),
        };
        metrics_ok && self.matches_label(result)
    }

    /// Whether any criterion needs drop metrics.
    pub fn has_metric_criteria(&self) -> bool {
        !self.statuses.is_empty()
            || self.min_snapshots.is_some()
            || self.min_years.is_some()
            || self.max_avg_interval_days.is_some()
            || self.max_gap_days.is_some()
            || self.min_gap_days.is_some()
            || self.min_last_seen_age_days.is_some()
    }

    fn matches_metrics(&self, m: &DropMetrics) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&m.status) {
            return false;
        }
        at_least(Some(m.total_captures as f64), self.min_snapshots.map(|v| v as f64))
            && at_least(Some(m.years_covered as f64), self.min_years.map(|v| v as f64))
            && at_most(m.average_interval_days(), self.max_avg_interval_days)
            && at_most(m.longest_gap_days(), self.max_gap_days)
            && at_least(m.longest_gap_days(), self.min_gap_days)
            && at_least(m.last_seen_age_days(), self.min_last_seen_age_days)
    }

    fn matches_label(&self, result: &AnalysisResult) -> bool {
        if !self.is_thematic() {
            return true;
        }
        let Some(label) = result.label.as_ref() else {
            return self.absent_label_matches;
        };

        self.topic.as_deref().is_none_or(|t| label.mentions(t.trim()))
            && self.category.as_deref().is_none_or(|c| label.has_category(c))
            && self.min_confidence.is_none_or(|min| label.confidence >= min)
    }
}

fn at_least(value: Option<f64>, threshold: Option<f64>) -> bool {
    match threshold {
        None => true,
        Some(t) => value.is_some_and(|v| v >= t),
    }
}

fn at_most(value: Option<f64>, threshold: Option<f64>) -> bool {
    match threshold {
        None => true,
        Some(t) => value.is_some_and(|v| v <= t),
    }
}

fn invalid(message: String) -> ValidationError {
    ValidationError::InvalidCriteria(message)
}
