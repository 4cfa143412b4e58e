//! Per-service rate limiting shared by all units of a batch.
//!
//! Each external service (archive, classifier) gets its own token-bucket
//! limiter that adapts to the service's health:
//! - Monitors 429 (Too Many Requests) and timeout outcomes
//! - Halves the rate when their share exceeds the threshold (default 20%)
//! - Raises it again once the share drops below half the threshold
//! - Pauses all callers for a cooldown after a 429
//!
//! The limiters are created once per batch and injected into the
//! orchestrator; there is no global limiter state.

mod limiter;
mod window;

use std::sync::Arc;

pub use limiter::{init_rate_limiter, RateLimiter, RateLimiterSettings};
pub use window::CallOutcome;

use crate::config::Config;

/// The limiters of one batch, one per external service.
///
/// `None` means calls to that service are not rate limited.
#[derive(Clone, Default)]
pub struct Limiters {
    pub archive: Option<Arc<RateLimiter>>,
    pub classifier: Option<Arc<RateLimiter>>,
}

impl Limiters {
    /// Builds the limiters from the configured per-service rates.
    ///
    /// The classifier limiter only exists when `enrich` is set. Must be
    /// called from within a tokio runtime.
    pub fn from_config(config: &Config, enrich: bool) -> Self {
        let archive = init_rate_limiter(
            "archive",
            RateLimiterSettings::new(config.archive_rps, config.adaptive_error_threshold),
        );
        let classifier = if enrich {
            init_rate_limiter(
                "classifier",
                RateLimiterSettings::new(config.classifier_rps, config.adaptive_error_threshold),
            )
        } else {
            None
        };
        Limiters {
            archive,
            classifier,
        }
    }

    /// Stops every limiter's background tasks.
    pub fn shutdown(&self) {
        for limiter in [&self.archive, &self.classifier].into_iter().flatten() {
            limiter.shutdown();
        }
    }
}

/// Takes a token from `limiter`, if there is one.
pub async fn throttle(limiter: Option<&Arc<RateLimiter>>) {
    if let Some(limiter) = limiter {
        limiter.acquire().await;
    }
}

/// Reports a call outcome to `limiter`, if there is one.
pub async fn report(limiter: Option<&Arc<RateLimiter>>, outcome: CallOutcome) {
    if let Some(limiter) = limiter {
        limiter.record(outcome).await;
    }
}
