//! Batch resource initialization.
//!
//! Builds the HTTP client, the service clients and the per-service limiters
//! before the first domain is scheduled.

use std::sync::Arc;

use log::info;

use crate::archive::{ArchiveClient, SnapshotSource};
use crate::classifier::{LlmClassifier, ThemeClassifier};
use crate::config::Config;
use crate::error_handling::{BatchError, InitializationError, ProcessingStats};
use crate::initialization::init_client;
use crate::rate_limiter::Limiters;

use super::resources::{ProgressCounters, UnitContext, UnitSettings};

/// Initialize the shared context of a batch.
///
/// The HTTP client timeout is the larger of the two per-service timeouts so
/// that the per-call bounds in the unit are the ones that fire. The
/// classifier is only built when `enrich` is set.
///
/// Must be called from within a tokio runtime (the limiters spawn tasks).
///
/// # Errors
///
/// Returns `BatchError::Initialization` if the HTTP client cannot be built.
pub fn init_batch_resources(config: &Config, enrich: bool) -> Result<UnitContext, BatchError> {
    let client_timeout = config.archive_timeout().max(config.classifier_timeout());
    let client = init_client(&config.user_agent, client_timeout)
        .map_err(InitializationError::HttpClientError)?;

    let source: Arc<dyn SnapshotSource> = Arc::new(ArchiveClient::new(
        Arc::clone(&client),
        &config.archive_url,
        config.cdx_limit,
    ));

    let classifier: Option<Arc<dyn ThemeClassifier>> = if enrich {
        let classifier = LlmClassifier::new(
            Arc::clone(&client),
            &config.classifier_url,
            config.classifier_api_key.clone(),
            &config.classifier_model,
            config.sample_max_chars,
        );
        info!(
            "Thematic enrichment enabled (model: {})",
            classifier.model()
        );
        Some(Arc::new(classifier))
    } else {
        None
    };

    let limiters = Limiters::from_config(config, enrich);
    if let Some(limiter) = &limiters.archive {
        info!("Archive rate limit: {} requests/sec", limiter.current_rps());
    }

    Ok(UnitContext {
        source,
        classifier,
        limiters,
        settings: UnitSettings::from_config(config),
        stats: Arc::new(ProcessingStats::new()),
        progress: Arc::new(ProgressCounters::default()),
    })
}
