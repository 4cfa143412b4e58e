//! CSV rendering of a report table.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::report::ReportTable;

use super::writer::open_output;

/// Writes `table` as CSV to `output` (stdout when `None`).
///
/// Returns the number of data rows written.
pub fn export_csv(table: &ReportTable, output: Option<&Path>) -> Result<usize> {
    write_csv(table, open_output(output)?)
}

/// Writes `table` as CSV with a header row.
pub fn write_csv<W: Write>(table: &ReportTable, sink: W) -> Result<usize> {
    let mut writer = Writer::from_writer(sink);
    writer
        .write_record(table.columns())
        .context("Failed to write CSV header")?;

    let mut count = 0;
    for row in table.rows() {
        writer
            .write_record(row)
            .context("Failed to write CSV record")?;
        count += 1;
    }
    writer.flush().context("Failed to flush CSV output")?;
    Ok(count)
}
