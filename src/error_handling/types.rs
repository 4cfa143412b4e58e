//! Error type definitions.
//!
//! This module defines the error taxonomy of the analysis pipeline:
//! archive fetch errors, classification errors, validation errors,
//! internal errors and initialization errors.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

use super::categorization::ErrorCause;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors returned by the snapshot fetcher.
///
/// Transient variants (timeouts, rate limiting, upstream outages) may succeed
/// on retry; the others terminate a domain's analysis immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The archive did not answer within the request timeout.
    #[error("archive request timed out")]
    Timeout,

    /// The archive answered 429 Too Many Requests.
    #[error("archive rate limited the request (HTTP 429)")]
    RateLimited,

    /// Server-side or connection failure (5xx, connect, reset).
    #[error("archive unavailable: {0}")]
    Upstream(String),

    /// The archive reports the domain as unknown (HTTP 404).
    #[error("archive has no record of this domain")]
    NotFound,

    /// The archive refused the query (4xx other than 404/429, e.g. excluded sites).
    #[error("archive rejected the request: {0}")]
    Rejected(String),

    /// The archive answered with a body that is not a CDX result.
    #[error("malformed archive response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Returns `true` when the failure may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout | FetchError::RateLimited | FetchError::Upstream(_)
        )
    }

    /// Stable cause category used in reports and statistics.
    pub fn cause(&self) -> ErrorCause {
        match self {
            FetchError::Timeout => ErrorCause::Timeout,
            FetchError::RateLimited => ErrorCause::RateLimited,
            FetchError::Upstream(_) | FetchError::Rejected(_) => ErrorCause::Upstream,
            FetchError::NotFound => ErrorCause::NotFound,
            FetchError::Malformed(_) => ErrorCause::Internal,
        }
    }
}

/// Errors returned by the thematic classifier.
///
/// None of these fail a domain's analysis: the result is kept without a label
/// and the error is recorded as a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// The classifier did not answer within the request timeout.
    #[error("classifier request timed out")]
    Timeout,

    /// The classifier answered 429 Too Many Requests.
    #[error("classifier rate limited the request (HTTP 429)")]
    RateLimited,

    /// Server-side or connection failure.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// No API key was configured.
    #[error("classifier API key not configured")]
    NotConfigured,

    /// The classifier refused the request (authentication, bad request).
    #[error("classifier rejected the request: {0}")]
    Rejected(String),

    /// The reply could not be parsed into a thematic label.
    #[error("malformed classifier response: {0}")]
    Malformed(String),

    /// There was no content to classify.
    #[error("no content available for classification")]
    EmptySample,
}

impl ClassificationError {
    /// Returns `true` when the failure may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClassificationError::Timeout
                | ClassificationError::RateLimited
                | ClassificationError::Unavailable(_)
        )
    }
}

/// Errors for malformed input: domains, filter criteria or configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The domain string was empty or whitespace.
    #[error("domain is empty")]
    EmptyDomain,

    /// The domain exceeds the 253 character DNS limit.
    #[error("domain is too long ({0} characters)")]
    DomainTooLong(usize),

    /// The domain is an IP address rather than a host name.
    #[error("IP addresses are not domains: {0}")]
    IpAddress(String),

    /// The domain is not a valid host name.
    #[error("invalid domain '{input}': {reason}")]
    InvalidDomain {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// The filter criteria are inconsistent or out of range.
    #[error("invalid filter criteria: {0}")]
    InvalidCriteria(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Unexpected failure while deriving metrics for one domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("internal error: {0}")]
pub struct InternalError(pub String);

/// Errors that reject a whole batch before any domain is analysed.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The configuration or filter criteria are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A shared resource (HTTP client) could not be created.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_transience() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::Upstream("503".into()).is_transient());
        assert!(!FetchError::NotFound.is_transient());
        assert!(!FetchError::Rejected("403".into()).is_transient());
        assert!(!FetchError::Malformed("bad json".into()).is_transient());
    }

    #[test]
    fn test_fetch_error_causes() {
        assert_eq!(FetchError::Timeout.cause(), ErrorCause::Timeout);
        assert_eq!(FetchError::RateLimited.cause(), ErrorCause::RateLimited);
        assert_eq!(FetchError::NotFound.cause(), ErrorCause::NotFound);
        assert_eq!(
            FetchError::Upstream("502".into()).cause(),
            ErrorCause::Upstream
        );
        assert_eq!(
            FetchError::Malformed("x".into()).cause(),
            ErrorCause::Internal
        );
    }

    #[test]
    fn test_classification_error_transience() {
        assert!(ClassificationError::Timeout.is_transient());
        assert!(ClassificationError::Unavailable("503".into()).is_transient());
        assert!(!ClassificationError::NotConfigured.is_transient());
        assert!(!ClassificationError::Malformed("x".into()).is_transient());
        assert!(!ClassificationError::EmptySample.is_transient());
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::EmptyDomain.to_string(), "domain is empty");
        let err = ValidationError::InvalidDomain {
            input: "a..b".into(),
            reason: "empty label".into(),
        };
        assert_eq!(err.to_string(), "invalid domain 'a..b': empty label");
    }

    #[test]
    fn test_batch_error_wraps_validation() {
        let err: BatchError = ValidationError::InvalidConfig("bad".into()).into();
        assert_eq!(err.to_string(), "invalid configuration: bad");
    }
}
