//! HTTP client for a Wayback-compatible archive.

use std::sync::Arc;

use async_trait::async_trait;

use super::cdx::{parse_cdx, CdxPage};
use super::SnapshotSource;
use crate::config::{CDX_COLLAPSE, CDX_FIELDS};
use crate::domain::Domain;
use crate::error_handling::{categorize_reqwest_error, fetch_error_for_status, FetchError};
use crate::models::{Snapshot, Timeline};

/// Queries the CDX index (`/cdx/search/cdx`) for timelines and the raw replay
/// endpoint (`/web/{timestamp}id_/{url}`) for page content.
///
/// Captures are collapsed to at most one per day and capped at `row_limit`
/// rows; a timeline that reaches the cap is marked truncated. The index
/// returns rows in URL-key order, so a truncated timeline also gets the
/// root URL's newest capture from a second query.
#[derive(Clone)]
pub struct ArchiveClient {
    client: Arc<reqwest::Client>,
    base_url: String,
    row_limit: usize,
}

impl ArchiveClient {
    pub fn new(client: Arc<reqwest::Client>, base_url: &str, row_limit: usize) -> Self {
        ArchiveClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            row_limit: row_limit.max(1),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn query_cdx(&self, params: &[(&str, &str)]) -> Result<CdxPage, FetchError> {
        let response = self
            .client
            .get(format!("{}/cdx/search/cdx", self.base_url))
            .query(params)
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error_for_status(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;
        parse_cdx(&body)
    }

    /// Newest capture of the domain's root URL.
    async fn fetch_latest(&self, domain: &Domain) -> Result<Option<Snapshot>, FetchError> {
        let page = self
            .query_cdx(&[
                ("url", domain.as_str()),
                ("output", "json"),
                ("fl", CDX_FIELDS),
                ("fastLatest", "true"),
                ("limit", "-1"),
            ])
            .await?;
        Ok(page.snapshots.into_iter().max_by_key(|s| s.timestamp))
    }

    fn raw_content_url(&self, snapshot: &Snapshot) -> String {
        // `id_` asks for the original bytes without the replay toolbar
        format!(
            "{}/web/{}id_/{}",
            self.base_url,
            snapshot.archive_timestamp(),
            snapshot.original_url
        )
    }
}

#[async_trait]
impl SnapshotSource for ArchiveClient {
    async fn fetch_timeline(&self, domain: &Domain) -> Result<Timeline, FetchError> {
        let limit = self.row_limit.to_string();
        let page = self
            .query_cdx(&[
                ("url", domain.as_str()),
                ("matchType", "domain"),
                ("output", "json"),
                ("fl", CDX_FIELDS),
                ("collapse", CDX_COLLAPSE),
                ("limit", limit.as_str()),
            ])
            .await?;

        let truncated = page.rows >= self.row_limit;
        let mut snapshots = page.snapshots;
        if truncated {
            log::debug!(
                "CDX result for {} hit the {} row limit",
                domain,
                self.row_limit
            );
            // Rows come in URL-key order, so the page says nothing reliable
            // about the newest capture; ask for it directly.
            if let Some(latest) = self.fetch_latest(domain).await? {
                if !snapshots
                    .iter()
                    .any(|s| s.timestamp == latest.timestamp && s.original_url == latest.original_url)
                {
                    snapshots.push(latest);
                }
            }
        }

        Ok(Timeline::new(domain.clone(), snapshots).with_truncated(truncated))
    }

    async fn fetch_content(
        &self,
        snapshot: &Snapshot,
        max_bytes: usize,
    ) -> Result<String, FetchError> {
        let mut response = self
            .client
            .get(self.raw_content_url(snapshot))
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error_for_status(status.as_u16(), ""));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?
        {
            let room = max_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= max_bytes {
                log::debug!(
                    "Archived body of {} cut off at {} bytes",
                    snapshot.original_url,
                    max_bytes
                );
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
