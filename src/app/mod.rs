//! Batch lifecycle helpers.
//!
//! This module provides progress logging, shutdown handling and statistics
//! printing used by the orchestrator and the binary.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::{log_progress, spawn_progress_logger};
pub use shutdown::{cancel_on_ctrl_c, shutdown_gracefully};
pub use statistics::{print_error_statistics, print_simple_summary};
