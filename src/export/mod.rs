//! Report rendering.
//!
//! Turns the format-agnostic `ReportTable` into CSV or JSON Lines on a file
//! or stdout.

mod csv;
mod jsonl;
mod types;
mod writer;

use std::path::Path;

use anyhow::Result;

use crate::report::ReportTable;

pub use self::csv::{export_csv, write_csv};
pub use jsonl::{export_jsonl, write_jsonl};
pub use types::ExportFormat;

/// Renders `table` in `format` to `output` (stdout when `None`).
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns an error if the output cannot be created or written.
pub fn export_report(table: &ReportTable, format: ExportFormat, output: Option<&Path>) -> Result<usize> {
    let count = match format {
        ExportFormat::Csv => export_csv(table, output)?,
        ExportFormat::Jsonl => export_jsonl(table, output)?,
    };
    log::debug!("Wrote {} {} rows", count, format.as_str());
    Ok(count)
}
