//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

use crate::rate_limiter::Limiters;

/// Stops the background tasks of a batch.
///
/// Cancels the progress logger and waits for it, then stops the limiters'
/// replenisher and adjuster tasks.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<tokio::task::JoinHandle<()>>,
    limiters: &Limiters,
) {
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }

    limiters.shutdown();
}

/// Cancels `batch` when the process receives Ctrl-C.
///
/// Work already finished is kept; units not yet started are reported as
/// cancelled. A second Ctrl-C is left to the default handler.
pub fn cancel_on_ctrl_c(batch: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    log::warn!("Interrupt received, finishing in-flight domains and stopping");
                    batch.cancel();
                }
                Err(e) => log::warn!("Failed to listen for Ctrl-C: {e}"),
            },
            _ = batch.cancelled() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_without_logging_task() {
        let cancel = CancellationToken::new();
        shutdown_gracefully(cancel.clone(), None, &Limiters::default()).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_ctrl_c_listener_exits_when_batch_ends() {
        let batch = CancellationToken::new();
        let handle = cancel_on_ctrl_c(batch.clone());
        batch.cancel();
        assert!(handle.await.is_ok());
    }
}
