//! Snapshot fetching from the web archive.
//!
//! `SnapshotSource` is the seam between the orchestrator and the archive:
//! `ArchiveClient` talks to a Wayback-compatible CDX server, tests plug in
//! in-memory fakes.

mod cdx;
mod client;

use async_trait::async_trait;

pub use client::ArchiveClient;

use crate::domain::Domain;
use crate::error_handling::FetchError;
use crate::models::{Snapshot, Timeline};

/// Source of capture timelines and archived page content.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the capture timeline of `domain`.
    ///
    /// A domain that was never archived yields an empty timeline, not an
    /// error. Implementations must not block indefinitely; the orchestrator
    /// additionally bounds every call with its own timeout.
    async fn fetch_timeline(&self, domain: &Domain) -> Result<Timeline, FetchError>;

    /// Fetches the archived body of `snapshot`, reading at most `max_bytes`.
    async fn fetch_content(&self, snapshot: &Snapshot, max_bytes: usize)
        -> Result<String, FetchError>;
}
