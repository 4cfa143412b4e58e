//! Error handling and processing statistics.
//!
//! This module provides:
//! - The pipeline's error taxonomy (fetch, classification, validation, internal)
//! - Stable failure cause categories
//! - Retry strategy configuration
//! - Processing statistics tracking

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_classifier_error, categorize_reqwest_error, classification_error_for_status,
    fetch_error_for_status, get_retry_strategy, ErrorCause, RetryPolicy,
};
pub use stats::ProcessingStats;
pub use types::{
    BatchError, ClassificationError, FetchError, InitializationError, InternalError,
    ValidationError,
};
