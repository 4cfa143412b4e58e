//! Configuration types and CLI options.
//!
//! This module defines the library configuration, which doubles as the CLI
//! option set of the `domain_drop` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

use crate::config::constants::*;
use crate::error_handling::{RetryPolicy, ValidationError};
use crate::export::ExportFormat;
use crate::metrics::{DropStatus, MetricsSettings};
use crate::models::AnalysisStatus;
use crate::report::FilterCriteria;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Report filter options.
///
/// Every flag is optional; when none is given the report is a general
/// (unfiltered) report.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep only domains with one of these drop statuses
    #[arg(long = "status", value_enum, value_delimiter = ',')]
    pub statuses: Vec<DropStatus>,

    /// Keep only results with one of these analysis outcomes
    #[arg(long = "analysis-status", value_enum, value_delimiter = ',')]
    pub analysis_statuses: Vec<AnalysisStatus>,

    /// Minimum number of archived captures
    #[arg(long)]
    pub min_snapshots: Option<usize>,

    /// Minimum number of distinct calendar years with captures
    #[arg(long)]
    pub min_years: Option<usize>,

    /// Maximum average interval between captures, in days
    #[arg(long)]
    pub max_avg_interval_days: Option<f64>,

    /// Maximum longest gap between captures, in days
    #[arg(long)]
    pub max_gap_days: Option<f64>,

    /// Minimum longest gap between captures, in days
    #[arg(long)]
    pub min_gap_days: Option<f64>,

    /// Minimum days since the last capture
    #[arg(long)]
    pub min_last_seen_age_days: Option<f64>,

    /// Case-insensitive topic substring (category, topics or keywords)
    #[arg(long)]
    pub topic: Option<String>,

    /// Exact primary category (case-insensitive)
    #[arg(long)]
    pub category: Option<String>,

    /// Minimum classifier confidence (0.0-1.0)
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Keep failed analyses in the report rows
    #[arg(long)]
    pub include_failed: bool,

    /// Treat a missing thematic label as matching topic/category criteria
    #[arg(long)]
    pub absent_label_matches: bool,
}

impl FilterArgs {
    /// Converts the flags into filter criteria, or `None` for a general report.
    pub fn to_criteria(&self) -> Option<FilterCriteria> {
        let criteria = FilterCriteria {
            statuses: self.statuses.clone(),
            analysis_statuses: self.analysis_statuses.clone(),
            min_snapshots: self.min_snapshots,
            min_years: self.min_years,
            max_avg_interval_days: self.max_avg_interval_days,
            max_gap_days: self.max_gap_days,
            min_gap_days: self.min_gap_days,
            min_last_seen_age_days: self.min_last_seen_age_days,
            topic: self.topic.clone(),
            category: self.category.clone(),
            min_confidence: self.min_confidence,
            include_failed: self.include_failed,
            absent_label_matches: self.absent_label_matches,
        };
        if criteria == FilterCriteria::default() {
            None
        } else {
            Some(criteria)
        }
    }
}

/// Library configuration.
///
/// This struct can be constructed programmatically or parsed from the command
/// line by the `domain_drop` binary.
///
/// # Examples
///
/// ```no_run
/// use domain_drop::Config;
///
/// let config = Config {
///     max_concurrency: 20,
///     staleness_days: 180,
///     ..Default::default()
/// };
/// ```
#[derive(Parser, Debug, Clone)]
#[command(
    name = "domain_drop",
    version,
    about = "Finds dropped domains by reconstructing their archived history"
)]
pub struct Config {
    /// File with one domain per line ('-' reads from stdin)
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Report output file (stdout when omitted)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Report output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: ExportFormat,

    /// Maximum domains analysed simultaneously
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Retries for transient archive failures
    #[arg(long, default_value_t = RETRY_MAX_RETRIES)]
    pub max_retries: usize,

    /// Initial retry delay in milliseconds (doubles on every retry)
    #[arg(long, default_value_t = RETRY_INITIAL_DELAY_MS)]
    pub retry_initial_delay_ms: u64,

    /// Archive base URL
    #[arg(long, default_value = DEFAULT_ARCHIVE_URL)]
    pub archive_url: String,

    /// Per-request archive timeout in seconds
    #[arg(long, default_value_t = ARCHIVE_TIMEOUT_SECS)]
    pub archive_timeout_seconds: u64,

    /// Archive requests per second (0 disables rate limiting)
    #[arg(long, default_value_t = ARCHIVE_RATE_LIMIT_RPS)]
    pub archive_rps: u32,

    /// Maximum CDX rows fetched per domain
    #[arg(long, default_value_t = CDX_ROW_LIMIT)]
    pub cdx_limit: usize,

    /// Enable thematic enrichment via the classification service
    #[arg(long)]
    pub enrich: bool,

    /// Classifier base URL (OpenRouter-compatible)
    #[arg(long, default_value = DEFAULT_CLASSIFIER_URL)]
    pub classifier_url: String,

    /// Classifier API key
    #[arg(long, env = CLASSIFIER_API_KEY_ENV, hide_env_values = true)]
    pub classifier_api_key: Option<String>,

    /// Classifier model name
    #[arg(long, default_value = DEFAULT_CLASSIFIER_MODEL)]
    pub classifier_model: String,

    /// Per-request classifier timeout in seconds
    #[arg(long, default_value_t = CLASSIFIER_TIMEOUT_SECS)]
    pub classifier_timeout_seconds: u64,

    /// Classifier requests per second (0 disables rate limiting)
    #[arg(long, default_value_t = CLASSIFIER_RATE_LIMIT_RPS)]
    pub classifier_rps: u32,

    /// Days without a capture after which a domain counts as dropped
    #[arg(long, default_value_t = DEFAULT_STALENESS_DAYS)]
    pub staleness_days: u32,

    /// Classify as dropped when at least this many trailing captures are HTTP errors
    #[arg(long)]
    pub error_tail_threshold: Option<usize>,

    /// Snapshots sampled per domain for classification
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SNAPSHOTS)]
    pub sample_snapshots: usize,

    /// Maximum characters sent to the classifier per domain
    #[arg(long, default_value_t = DEFAULT_SAMPLE_MAX_CHARS)]
    pub sample_max_chars: usize,

    /// Maximum bytes read from one archived page
    #[arg(long, default_value_t = MAX_SNAPSHOT_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Error rate threshold for adaptive rate limiting (0.0-1.0)
    #[arg(long, default_value_t = DEFAULT_ADAPTIVE_ERROR_THRESHOLD)]
    pub adaptive_error_threshold: f64,

    /// Report filters
    #[command(flatten)]
    pub filter: FilterArgs,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("domains.txt"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            output: None,
            format: ExportFormat::Csv,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: RETRY_MAX_RETRIES,
            retry_initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            archive_timeout_seconds: ARCHIVE_TIMEOUT_SECS,
            archive_rps: ARCHIVE_RATE_LIMIT_RPS,
            cdx_limit: CDX_ROW_LIMIT,
            enrich: false,
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            classifier_api_key: None,
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            classifier_timeout_seconds: CLASSIFIER_TIMEOUT_SECS,
            classifier_rps: CLASSIFIER_RATE_LIMIT_RPS,
            staleness_days: DEFAULT_STALENESS_DAYS,
            error_tail_threshold: None,
            sample_snapshots: DEFAULT_SAMPLE_SNAPSHOTS,
            sample_max_chars: DEFAULT_SAMPLE_MAX_CHARS,
            max_body_bytes: MAX_SNAPSHOT_BODY_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            adaptive_error_threshold: DEFAULT_ADAPTIVE_ERROR_THRESHOLD,
            filter: FilterArgs::default(),
        }
    }
}

impl Config {
    /// Checks the values that have no sensible zero or out-of-range meaning.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |msg: &str| Err(ValidationError::InvalidConfig(msg.to_string()));
        if self.max_concurrency == 0 {
            return invalid("max_concurrency must be greater than 0");
        }
        if self.staleness_days == 0 {
            return invalid("staleness_days must be greater than 0");
        }
        if self.sample_max_chars == 0 {
            return invalid("sample_max_chars must be greater than 0");
        }
        if self.sample_snapshots == 0 {
            return invalid("sample_snapshots must be greater than 0");
        }
        if self.max_body_bytes == 0 {
            return invalid("max_body_bytes must be greater than 0");
        }
        if self.cdx_limit == 0 {
            return invalid("cdx_limit must be greater than 0");
        }
        if self.archive_timeout_seconds == 0 || self.classifier_timeout_seconds == 0 {
            return invalid("timeouts must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.adaptive_error_threshold) {
            return invalid("adaptive_error_threshold must be between 0.0 and 1.0");
        }
        if self.error_tail_threshold == Some(0) {
            return invalid("error_tail_threshold must be greater than 0");
        }
        Ok(())
    }

    /// Drop classification settings derived from this configuration.
    pub fn metrics_settings(&self) -> MetricsSettings {
        MetricsSettings {
            staleness_threshold: chrono::TimeDelta::days(i64::from(self.staleness_days)),
            error_tail_threshold: self.error_tail_threshold,
        }
    }

    /// Retry policy for transient archive failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            factor: RETRY_FACTOR,
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
            max_retries: self.max_retries,
        }
    }

    /// Per-call archive timeout.
    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_seconds)
    }

    /// Per-call classifier timeout.
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = Config {
            max_concurrency: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));
    }

    #[test]
    fn test_zero_staleness_rejected() {
        let config = Config {
            staleness_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sample_cap_rejected() {
        let config = Config {
            sample_max_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_error_threshold_out_of_range_rejected() {
        let config = Config {
            adaptive_error_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_settings_from_days() {
        let config = Config {
            staleness_days: 30,
            error_tail_threshold: Some(4),
            ..Default::default()
        };
        let settings = config.metrics_settings();
        assert_eq!(settings.staleness_threshold, chrono::TimeDelta::days(30));
        assert_eq!(settings.error_tail_threshold, Some(4));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config {
            max_retries: 5,
            retry_initial_delay_ms: 100,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_parse_cli_defaults() {
        let config = Config::try_parse_from(["domain_drop", "domains.txt"]).unwrap();
        assert_eq!(config.file, PathBuf::from("domains.txt"));
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.staleness_days, DEFAULT_STALENESS_DAYS);
        assert!(!config.enrich);
        assert!(config.filter.to_criteria().is_none());
    }

    #[test]
    fn test_parse_cli_filters() {
        let config = Config::try_parse_from([
            "domain_drop",
            "domains.txt",
            "--status",
            "dropped,unknown",
            "--min-snapshots",
            "5",
            "--topic",
            "garden",
        ])
        .unwrap();
        let criteria = config.filter.to_criteria().expect("criteria expected");
        assert_eq!(
            criteria.statuses,
            vec![DropStatus::Dropped, DropStatus::Unknown]
        );
        assert_eq!(criteria.min_snapshots, Some(5));
        assert_eq!(criteria.topic.as_deref(), Some("garden"));
    }
}
