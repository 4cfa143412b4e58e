//! domain_drop library: finds dropped domains from their archived history
//!
//! For every domain of a batch the library fetches the capture timeline from a
//! Wayback-compatible archive, derives drop metrics (first/last seen, gaps,
//! staleness), optionally classifies sampled page content with a language
//! model, and assembles a filterable report.
//!
//! # Example
//!
//! ```no_run
//! use domain_drop::{analyze_batch, BatchRequest, Config, FilterCriteria, DropStatus};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     max_concurrency: 5,
//!     staleness_days: 365,
//!     ..Default::default()
//! };
//! let request = BatchRequest::new(vec!["example.com".into(), "example.org".into()])
//!     .with_criteria(FilterCriteria {
//!         statuses: vec![DropStatus::Dropped],
//!         ..Default::default()
//!     });
//!
//! let outcome = analyze_batch(&config, request, CancellationToken::new()).await?;
//! for row in &outcome.report.rows {
//!     println!("{} {:?}", row.domain, row.metrics.as_ref().map(|m| m.status));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod app;
mod archive;
mod classifier;
pub mod config;
mod domain;
mod error_handling;
pub mod export;
pub mod initialization;
mod metrics;
mod models;
mod rate_limiter;
mod report;
mod run;

// Re-export public API
pub use app::cancel_on_ctrl_c;
pub use archive::{ArchiveClient, SnapshotSource};
pub use classifier::{
    html_to_text, parse_label, select_representative, ContentSample, LlmClassifier,
    ThematicLabel, ThemeClassifier,
};
pub use config::{Config, LogFormat, LogLevel};
pub use domain::{normalize_domain, Domain};
pub use error_handling::{
    BatchError, ClassificationError, ErrorCause, FetchError, InitializationError, InternalError,
    ProcessingStats, RetryPolicy, ValidationError,
};
pub use metrics::{compute_drop_metrics, DropMetrics, DropStatus, MetricsSettings};
pub use models::{AnalysisResult, AnalysisStatus, FailureInfo, Snapshot, Timeline};
pub use rate_limiter::{CallOutcome, Limiters, RateLimiter, RateLimiterSettings};
pub use report::{
    assemble_report, FilterCriteria, Report, ReportKind, ReportSummary, ReportTable,
    REPORT_COLUMNS,
};
pub use run::{
    analyze_batch, analyze_domain, init_batch_resources, Analyzer, BatchOutcome, BatchRequest,
    ProgressCounters, UnitContext, UnitSettings, UnitState,
};
