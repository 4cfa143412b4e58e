//! Progress logging utilities.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio_util::sync::CancellationToken;

use crate::run::ProgressCounters;

/// Logs progress information about domain analysis.
pub fn log_progress(start_time: std::time::Instant, progress: &ProgressCounters) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let completed = progress.completed.load(Ordering::SeqCst);
    let failed = progress.failed.load(Ordering::SeqCst);
    let total = progress.total.load(Ordering::SeqCst);
    let finished = progress.finished();
    let rate = if elapsed_secs > 0.0 {
        finished as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Analyzed {}/{} domains ({} ok, {} failed) in {:.2} seconds (~{:.2} domains/sec)",
        finished, total, completed, failed, elapsed_secs, rate
    );
}

/// Spawns a task that logs progress every `interval` until `cancel` fires.
pub fn spawn_progress_logger(
    start_time: std::time::Instant,
    progress: Arc<ProgressCounters>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => log_progress(start_time, &progress),
                _ = cancel.cancelled() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_logger_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let handle = spawn_progress_logger(
            std::time::Instant::now(),
            Arc::new(ProgressCounters::with_total(3)),
            Duration::from_millis(10),
            cancel.clone(),
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        assert!(tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .is_ok());
    }

    #[test]
    fn test_log_progress_with_empty_counters() {
        log_progress(std::time::Instant::now(), &ProgressCounters::default());
    }
}
