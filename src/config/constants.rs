//! Configuration constants.
//!
//! This module defines the defaults used throughout the application,
//! including service endpoints, timeouts, retry policy and sampling caps.

use std::time::Duration;

// Archive service
/// Base URL of the Wayback Machine (CDX index and raw replay endpoints)
pub const DEFAULT_ARCHIVE_URL: &str = "https://web.archive.org";
/// Per-request timeout for archive calls in seconds
/// The CDX index can be slow for heavily captured domains, 20s keeps a single
/// stalled query from holding a concurrency slot for too long
pub const ARCHIVE_TIMEOUT_SECS: u64 = 20;
/// Maximum number of CDX rows requested per domain
/// A timeline that reaches this limit is reported as partial
pub const CDX_ROW_LIMIT: usize = 10_000;
/// CDX collapse rule: keep at most one capture per day
pub const CDX_COLLAPSE: &str = "timestamp:8";
/// CDX fields requested, in this order
pub const CDX_FIELDS: &str = "timestamp,original,statuscode,digest,length";
/// Default archive requests per second (shared by all units of a batch)
pub const ARCHIVE_RATE_LIMIT_RPS: u32 = 5;

// Classification service
/// Base URL of the OpenRouter-compatible chat completion API
pub const DEFAULT_CLASSIFIER_URL: &str = "https://openrouter.ai/api/v1";
/// Default model used for thematic classification
pub const DEFAULT_CLASSIFIER_MODEL: &str = "openai/gpt-3.5-turbo";
/// Environment variable holding the classifier API key
pub const CLASSIFIER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Per-request timeout for classifier calls in seconds
pub const CLASSIFIER_TIMEOUT_SECS: u64 = 60;
/// Default classifier requests per second
pub const CLASSIFIER_RATE_LIMIT_RPS: u32 = 2;
/// Retries for transient classifier failures (timeouts are not retried)
pub const CLASSIFIER_MAX_RETRIES: usize = 1;
/// Maximum keywords kept from a classifier reply
pub const MAX_LABEL_KEYWORDS: usize = 10;
/// Confidence assigned when the model does not report one
pub const DEFAULT_LABEL_CONFIDENCE: f64 = 0.5;

// Drop classification
/// Default staleness threshold in days: a domain whose last capture is older
/// than this is considered dropped
pub const DEFAULT_STALENESS_DAYS: u32 = 365;

// Content sampling
/// Number of representative snapshots sampled for classification
/// (earliest, midpoint, latest)
pub const DEFAULT_SAMPLE_SNAPSHOTS: usize = 3;
/// Maximum characters sent to the classifier for one domain
/// Roughly 3-4k tokens, enough context for a topic label at bounded cost
pub const DEFAULT_SAMPLE_MAX_CHARS: usize = 15_000;
/// Maximum bytes read from one archived page body (2MB)
/// Larger bodies are cut off on read so full pages are never retained
pub const MAX_SNAPSHOT_BODY_BYTES: usize = 2 * 1024 * 1024;

// Concurrency
/// Maximum domains analysed simultaneously
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
/// Progress logging interval in seconds
pub const LOGGING_INTERVAL_SECS: u64 = 5;

// Retry strategy
/// Initial delay in milliseconds before the first retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 15;
/// Maximum number of retries after the initial archive attempt
pub const RETRY_MAX_RETRIES: usize = 3;

// Rate limiter tuning
/// Burst capacity of a service's token bucket, in seconds of traffic
pub const RATE_LIMIT_BURST_SECS: u32 = 2;
/// Cooldown applied to a service after it answers 429, in milliseconds
pub const RATE_LIMIT_COOLDOWN_MS: u64 = 5_000;
/// How often the adaptive limiter re-evaluates its error rate
pub const RATE_LIMIT_ADJUST_INTERVAL: Duration = Duration::from_secs(5);
/// Default error-rate threshold for adaptive throttling (20%)
pub const DEFAULT_ADAPTIVE_ERROR_THRESHOLD: f64 = 0.2;

/// Default User-Agent string for archive and classifier requests.
pub const DEFAULT_USER_AGENT: &str = concat!("domain_drop/", env!("CARGO_PKG_VERSION"));

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const HTTP_STATUS_NOT_FOUND: u16 = 404;
