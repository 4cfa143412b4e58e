//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources of a batch:
//! - Logger
//! - HTTP client
//! - Concurrency semaphore
//!
//! Per-service rate limiters live in `crate::rate_limiter`.

mod client;
mod logger;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;

/// Initializes a semaphore for controlling concurrency.
///
/// Each analysis unit holds one permit for its whole lifetime, so `count`
/// bounds the number of domains in flight.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
