//! Token-bucket limiter with error-driven rate adjustment.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::{interval, Instant};
use tokio_util::sync::CancellationToken;

use super::window::{CallOutcome, OutcomeWindow};
use crate::config::{RATE_LIMIT_ADJUST_INTERVAL, RATE_LIMIT_BURST_SECS, RATE_LIMIT_COOLDOWN_MS};

/// Fewer samples than this never trigger an adjustment.
const MIN_ADJUST_SAMPLES: usize = 10;
const REPLENISH_TICK: Duration = Duration::from_millis(100);
const WINDOW_SIZE: usize = 100;
const WINDOW_SPAN: Duration = Duration::from_secs(30);

/// Tuning of one service's limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterSettings {
    /// Starting (and maximum) requests per second
    pub rps: u32,
    /// Bucket capacity
    pub burst: usize,
    /// Floor for adaptive decreases
    pub min_rps: u32,
    /// Share of 429s and timeouts above which the rate is halved
    pub error_threshold: f64,
    pub adjust_interval: Duration,
    /// Pause applied to every caller after a 429
    pub cooldown: Duration,
}

impl RateLimiterSettings {
    pub fn new(rps: u32, error_threshold: f64) -> Self {
        RateLimiterSettings {
            rps,
            burst: rps.saturating_mul(RATE_LIMIT_BURST_SECS).max(1) as usize,
            min_rps: 1,
            error_threshold,
            adjust_interval: RATE_LIMIT_ADJUST_INTERVAL,
            cooldown: Duration::from_millis(RATE_LIMIT_COOLDOWN_MS),
        }
    }
}

/// Shared limiter for one external service.
///
/// Every call takes a token first. Tokens are replenished by a background task
/// at the current rate, up to the burst capacity. A second task halves the
/// rate while 429s and timeouts exceed the error threshold and raises it by
/// 15% (never above the configured rate) once they fall below half of it.
/// A 429 additionally holds back every caller for the cooldown period.
///
/// Both background tasks stop when the limiter is shut down or dropped.
pub struct RateLimiter {
    name: &'static str,
    permits: Arc<Semaphore>,
    current_rps: Arc<AtomicU32>,
    window: Arc<Mutex<OutcomeWindow>>,
    cooldown: Duration,
    cooldown_until: Mutex<Option<Instant>>,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Waits for a token (and for any active 429 cooldown to pass).
    pub async fn acquire(&self) {
        let cooldown_until = *self.cooldown_until.lock().await;
        if let Some(deadline) = cooldown_until {
            if deadline > Instant::now() {
                log::debug!("{} limiter cooling down after 429", self.name);
                tokio::time::sleep_until(deadline).await;
            }
        }

        match self.permits.acquire().await {
            // Tokens are consumed, only the replenisher adds them back
            Ok(permit) => permit.forget(),
            Err(_) => log::debug!("{} limiter closed", self.name),
        }
    }

    /// Records the outcome of a call made with a token from this limiter.
    pub async fn record(&self, outcome: CallOutcome) {
        self.window.lock().await.record(outcome);
        if outcome == CallOutcome::RateLimited {
            let until = Instant::now() + self.cooldown;
            *self.cooldown_until.lock().await = Some(until);
            log::warn!(
                "{} answered 429, pausing requests for {:?}",
                self.name,
                self.cooldown
            );
        }
    }

    pub fn current_rps(&self) -> u32 {
        self.current_rps.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stops the background tasks. Tokens already in the bucket stay usable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Creates a limiter for one service and starts its background tasks.
///
/// Returns `None` when `settings.rps` is 0 (rate limiting disabled). Must be
/// called from within a tokio runtime.
pub fn init_rate_limiter(
    name: &'static str,
    settings: RateLimiterSettings,
) -> Option<Arc<RateLimiter>> {
    if settings.rps == 0 {
        return None;
    }
    let capacity = settings.burst.max(1);
    let limiter = Arc::new(RateLimiter {
        name,
        permits: Arc::new(Semaphore::new(capacity)),
        current_rps: Arc::new(AtomicU32::new(settings.rps)),
        window: Arc::new(Mutex::new(OutcomeWindow::new(WINDOW_SIZE, WINDOW_SPAN))),
        cooldown: settings.cooldown,
        cooldown_until: Mutex::new(None),
        shutdown: CancellationToken::new(),
    });

    spawn_replenisher(
        name,
        Arc::clone(&limiter.permits),
        Arc::clone(&limiter.current_rps),
        capacity,
        limiter.shutdown.clone(),
    );
    spawn_adjuster(
        name,
        Arc::clone(&limiter.window),
        Arc::clone(&limiter.current_rps),
        settings,
        limiter.shutdown.clone(),
    );

    Some(limiter)
}

fn spawn_replenisher(
    name: &'static str,
    permits: Arc<Semaphore>,
    current_rps: Arc<AtomicU32>,
    capacity: usize,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(REPLENISH_TICK);
    tokio::spawn(async move {
        let mut last = Instant::now();
        let mut fractional = 0.0f64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let rps = current_rps.load(Ordering::SeqCst);
                    let due = f64::from(rps) * now.duration_since(last).as_secs_f64() + fractional;
                    last = now;

                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let whole = due as usize;
                    let room = capacity.saturating_sub(permits.available_permits());
                    if whole >= room {
                        // Bucket full: surplus tokens are discarded
                        fractional = 0.0;
                        if room > 0 {
                            permits.add_permits(room);
                        }
                    } else {
                        fractional = due - whole as f64;
                        if whole > 0 {
                            permits.add_permits(whole);
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    log::debug!("{name} limiter replenisher shutting down");
                    break;
                }
            }
        }
    });
}

fn spawn_adjuster(
    name: &'static str,
    window: Arc<Mutex<OutcomeWindow>>,
    current_rps: Arc<AtomicU32>,
    settings: RateLimiterSettings,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(settings.adjust_interval);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (samples, error_rate) = window.lock().await.stats();
                    let current = current_rps.load(Ordering::SeqCst);
                    let next = next_rps(current, samples, error_rate, &settings);
                    if next != current {
                        log::info!(
                            "{name} limiter: error rate {:.1}% (threshold {:.1}%), {current} -> {next} rps",
                            error_rate * 100.0,
                            settings.error_threshold * 100.0,
                        );
                        current_rps.store(next, Ordering::SeqCst);
                    }
                }
                _ = shutdown.cancelled() => {
                    log::debug!("{name} limiter adjuster shutting down");
                    break;
                }
            }
        }
    });
}

/// AIMD step: halve above the threshold, +15% (at least +1) below half of it.
pub(crate) fn next_rps(
    current: u32,
    samples: usize,
    error_rate: f64,
    settings: &RateLimiterSettings,
) -> u32 {
    if samples < MIN_ADJUST_SAMPLES {
        return current;
    }
    let max_rps = settings.rps;
    if error_rate > settings.error_threshold {
        (current / 2).max(settings.min_rps)
    } else if error_rate < settings.error_threshold * 0.5 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raised = (f64::from(current) * 1.15) as u32;
        raised.max(current.saturating_add(1)).min(max_rps)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn settings(rps: u32, burst: usize) -> RateLimiterSettings {
        RateLimiterSettings {
            burst,
            ..RateLimiterSettings::new(rps, 0.2)
        }
    }

    #[test]
    fn test_disabled_when_rps_zero() {
        assert!(init_rate_limiter("archive", settings(0, 5)).is_none());
    }

    #[test]
    fn test_default_burst_scales_with_rate() {
        assert_eq!(RateLimiterSettings::new(5, 0.2).burst, 10);
        assert_eq!(RateLimiterSettings::new(1, 0.2).burst, 2);
    }

    #[tokio::test]
    async fn test_burst_is_consumed() {
        let limiter = init_rate_limiter("archive", settings(1, 3)).unwrap();
        for _ in 0..3 {
            assert!(timeout(Duration::from_millis(20), limiter.acquire())
                .await
                .is_ok());
        }
        // At 1 rps the next token is a second away
        assert!(timeout(Duration::from_millis(50), limiter.acquire())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_tokens_replenish() {
        let limiter = init_rate_limiter("archive", settings(20, 1)).unwrap();
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(timeout(Duration::from_millis(100), limiter.acquire())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_bucket_never_exceeds_capacity() {
        let limiter = init_rate_limiter("archive", settings(100, 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(limiter.permits.available_permits() <= 2);
    }

    #[tokio::test]
    async fn test_rate_limited_outcome_starts_cooldown() {
        let mut s = settings(100, 10);
        s.cooldown = Duration::from_millis(150);
        let limiter = init_rate_limiter("classifier", s).unwrap();

        limiter.record(CallOutcome::RateLimited).await;
        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(140));
    }

    #[tokio::test]
    async fn test_success_does_not_cool_down() {
        let limiter = init_rate_limiter("archive", settings(10, 5)).unwrap();
        limiter.record(CallOutcome::Success).await;
        assert!(timeout(Duration::from_millis(20), limiter.acquire())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_adjuster_lowers_rate_on_errors() {
        let mut s = settings(20, 5);
        s.adjust_interval = Duration::from_millis(50);
        let limiter = init_rate_limiter("archive", s).unwrap();
        for _ in 0..12 {
            limiter.record(CallOutcome::Timeout).await;
        }
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(limiter.current_rps() < 20);
        limiter.shutdown();
    }

    #[test]
    fn test_next_rps_needs_samples() {
        let s = RateLimiterSettings::new(20, 0.2);
        assert_eq!(next_rps(20, 9, 1.0, &s), 20);
    }

    #[test]
    fn test_next_rps_halves_above_threshold() {
        let s = RateLimiterSettings::new(20, 0.2);
        assert_eq!(next_rps(20, 50, 0.3, &s), 10);
        assert_eq!(next_rps(1, 50, 0.9, &s), 1);
    }

    #[test]
    fn test_next_rps_raises_below_half_threshold() {
        let s = RateLimiterSettings::new(20, 0.2);
        assert_eq!(next_rps(10, 50, 0.0, &s), 11);
        assert_eq!(next_rps(4, 50, 0.05, &s), 5);
        assert_eq!(next_rps(20, 50, 0.0, &s), 20);
    }

    #[test]
    fn test_next_rps_holds_between_thresholds() {
        let s = RateLimiterSettings::new(20, 0.2);
        assert_eq!(next_rps(12, 50, 0.15, &s), 12);
    }
}
