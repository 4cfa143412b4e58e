//! Error categorization and retry strategy.
//!
//! This module maps transport failures onto the pipeline's error taxonomy and
//! configures the exponential backoff used for transient archive failures.

use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;

use strum_macros::EnumIter as EnumIterMacro;

use super::types::{ClassificationError, FetchError};
use crate::config::{HTTP_STATUS_NOT_FOUND, HTTP_STATUS_TOO_MANY_REQUESTS};

/// Maximum characters of an upstream error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Stable failure category recorded on failed analysis results.
///
/// Every failed unit records exactly one cause so that reports and statistics
/// can be grouped deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIterMacro)]
pub enum ErrorCause {
    /// An archive call exceeded its timeout (after retries).
    Timeout,
    /// The archive has no record of the domain.
    NotFound,
    /// The archive kept answering 429 (after retries).
    RateLimited,
    /// The archive was unreachable or refused the query.
    Upstream,
    /// The thematic classifier failed (only ever a warning).
    ClassifierUnavailable,
    /// The submitted domain string is malformed.
    Validation,
    /// The batch was cancelled before this domain was analysed.
    Cancelled,
    /// Unexpected failure inside the pipeline.
    Internal,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCause::Timeout => "timeout",
            ErrorCause::NotFound => "not_found",
            ErrorCause::RateLimited => "rate_limited",
            ErrorCause::Upstream => "upstream",
            ErrorCause::ClassifierUnavailable => "classifier_unavailable",
            ErrorCause::Validation => "validation",
            ErrorCause::Cancelled => "cancelled",
            ErrorCause::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backoff parameters for transient archive failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub factor: u64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Retries after the initial attempt
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(crate::config::RETRY_INITIAL_DELAY_MS),
            factor: crate::config::RETRY_FACTOR,
            max_delay: Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS),
            max_retries: crate::config::RETRY_MAX_RETRIES,
        }
    }
}

/// Creates an exponential backoff retry strategy.
///
/// Yields `max_retries` delays: `initial_delay`, then multiplied by `factor`
/// on every step, each capped at `max_delay`. When the iterator is exhausted
/// the caller stops retrying.
pub fn get_retry_strategy(policy: &RetryPolicy) -> impl Iterator<Item = Duration> {
    // tokio-retry yields `factor * base^n`, so base carries the growth rate
    // and factor the initial delay.
    let base = policy.factor.max(1);
    let initial_ms = u64::try_from(policy.initial_delay.as_millis()).unwrap_or(u64::MAX);
    let scale = (initial_ms / base).max(1);
    ExponentialBackoff::from_millis(base)
        .factor(scale)
        .max_delay(policy.max_delay)
        .take(policy.max_retries)
}

/// Maps a non-success archive HTTP status to a `FetchError`.
pub fn fetch_error_for_status(status: u16, body: &str) -> FetchError {
    match status {
        HTTP_STATUS_TOO_MANY_REQUESTS => FetchError::RateLimited,
        HTTP_STATUS_NOT_FOUND => FetchError::NotFound,
        408 => FetchError::Timeout,
        500..=599 => FetchError::Upstream(format!("HTTP {status}")),
        _ => FetchError::Rejected(format!("HTTP {status}: {}", truncate_body(body))),
    }
}

/// Categorizes a `reqwest::Error` from an archive call.
///
/// Status codes are checked first, then the transport error kind.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        return fetch_error_for_status(status.as_u16(), "");
    }

    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() || error.is_request() || error.is_body() {
        FetchError::Upstream(error.to_string())
    } else if error.is_decode() {
        FetchError::Malformed(error.to_string())
    } else if error.is_builder() || error.is_redirect() {
        FetchError::Rejected(error.to_string())
    } else {
        FetchError::Upstream(error.to_string())
    }
}

/// Maps a non-success classifier HTTP status to a `ClassificationError`.
pub fn classification_error_for_status(status: u16, body: &str) -> ClassificationError {
    match status {
        HTTP_STATUS_TOO_MANY_REQUESTS => ClassificationError::RateLimited,
        408 => ClassificationError::Timeout,
        500..=599 => ClassificationError::Unavailable(format!(
            "HTTP {status}: {}",
            truncate_body(body)
        )),
        _ => ClassificationError::Rejected(format!("HTTP {status}: {}", truncate_body(body))),
    }
}

/// Categorizes a `reqwest::Error` from a classifier call.
pub fn categorize_classifier_error(error: &reqwest::Error) -> ClassificationError {
    if let Some(status) = error.status() {
        return classification_error_for_status(status.as_u16(), "");
    }

    if error.is_timeout() {
        ClassificationError::Timeout
    } else if error.is_decode() {
        ClassificationError::Malformed(error.to_string())
    } else if error.is_builder() {
        ClassificationError::Rejected(error.to_string())
    } else {
        ClassificationError::Unavailable(error.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_causes_have_distinct_labels() {
        let labels: std::collections::HashSet<_> =
            ErrorCause::iter().map(|c| c.as_str()).collect();
        assert_eq!(labels.len(), ErrorCause::iter().count());
    }

    #[test]
    fn test_cause_display_matches_label() {
        assert_eq!(ErrorCause::NotFound.to_string(), "not_found");
        assert_eq!(
            ErrorCause::ClassifierUnavailable.to_string(),
            "classifier_unavailable"
        );
    }

    #[test]
    fn test_retry_strategy_doubles_and_caps() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(500),
            factor: 2,
            max_delay: Duration::from_secs(3),
            max_retries: 4,
        };
        let delays: Vec<Duration> = get_retry_strategy(&policy).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_secs(3),
            ]
        );
    }

    #[test]
    fn test_retry_strategy_zero_retries() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(get_retry_strategy(&policy).count(), 0);
    }

    #[test]
    fn test_fetch_error_for_status() {
        assert_eq!(fetch_error_for_status(429, ""), FetchError::RateLimited);
        assert_eq!(fetch_error_for_status(404, ""), FetchError::NotFound);
        assert!(matches!(
            fetch_error_for_status(503, ""),
            FetchError::Upstream(_)
        ));
        assert!(matches!(
            fetch_error_for_status(403, "Blocked Site Error"),
            FetchError::Rejected(msg) if msg.contains("Blocked Site Error")
        ));
    }

    #[test]
    fn test_classification_error_for_status() {
        assert_eq!(
            classification_error_for_status(429, ""),
            ClassificationError::RateLimited
        );
        assert!(matches!(
            classification_error_for_status(502, "bad gateway"),
            ClassificationError::Unavailable(_)
        ));
        assert!(matches!(
            classification_error_for_status(401, "no auth"),
            ClassificationError::Rejected(_)
        ));
    }

    #[test]
    fn test_truncate_body_caps_length() {
        let body = "x".repeat(1000);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.len(), MAX_ERROR_BODY_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }
}
