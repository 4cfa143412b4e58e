//! CDX index response parsing.
//!
//! With `output=json` the CDX server answers with an array of string rows,
//! the first of which names the columns:
//!
//! ```text
//! [["timestamp","original","statuscode","digest","length"],
//!  ["20200101000000","http://example.com/","200","AB12...","2345"]]
//! ```
//!
//! An empty body or `[]` means the domain was never captured. Missing values
//! are written as `-` (e.g. the status of a revisit record).

use chrono::NaiveDateTime;

use crate::error_handling::FetchError;
use crate::models::{Snapshot, ARCHIVE_TIMESTAMP_FORMAT};

/// Parsed CDX rows.
#[derive(Debug)]
pub(crate) struct CdxPage {
    pub(crate) snapshots: Vec<Snapshot>,
    /// Data rows in the response, including ones that could not be parsed
    pub(crate) rows: usize,
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    original: usize,
    statuscode: Option<usize>,
    digest: Option<usize>,
    length: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self, FetchError> {
        let find = |name: &str| header.iter().position(|h| h == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| FetchError::Malformed(format!("CDX header lacks '{name}'")))
        };
        Ok(Columns {
            timestamp: required("timestamp")?,
            original: required("original")?,
            statuscode: find("statuscode"),
            digest: find("digest"),
            length: find("length"),
        })
    }

    fn snapshot(&self, row: &[String]) -> Option<Snapshot> {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(String::as_str)
                .filter(|v| !v.is_empty() && *v != "-")
        };

        let raw_ts = field(Some(self.timestamp))?;
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, ARCHIVE_TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();
        let original_url = field(Some(self.original))?.to_string();

        Some(Snapshot {
            timestamp,
            original_url,
            status_code: field(self.statuscode).and_then(|v| v.parse().ok()),
            digest: field(self.digest).map(str::to_string),
            length: field(self.length).and_then(|v| v.parse().ok()),
        })
    }
}

/// Parses a CDX JSON body into snapshots, in response order.
///
/// Rows with an unparseable timestamp or no URL are skipped and logged.
///
/// # Errors
///
/// Returns `FetchError::Malformed` if the body is not a JSON array of string
/// rows or the header lacks the `timestamp`/`original` columns.
pub(crate) fn parse_cdx(body: &str) -> Result<CdxPage, FetchError> {
    if body.trim().is_empty() {
        return Ok(CdxPage {
            snapshots: Vec::new(),
            rows: 0,
        });
    }

    let rows: Vec<Vec<String>> =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(CdxPage {
            snapshots: Vec::new(),
            rows: 0,
        });
    };
    let columns = Columns::from_header(&header)?;

    let mut count = 0;
    let mut snapshots = Vec::new();
    for row in rows {
        count += 1;
        match columns.snapshot(&row) {
            Some(snapshot) => snapshots.push(snapshot),
            None => log::debug!("Skipping unparseable CDX row: {:?}", row),
        }
    }

    Ok(CdxPage {
        snapshots,
        rows: count,
    })
}
