//! JSON Lines rendering of a report table.
//!
//! Each line is one report row as a JSON object keyed by column name.
//! Empty cells become `null`.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::report::ReportTable;

use super::writer::open_output;

/// Writes `table` as JSONL to `output` (stdout when `None`).
///
/// Returns the number of records written.
pub fn export_jsonl(table: &ReportTable, output: Option<&Path>) -> Result<usize> {
    write_jsonl(table, open_output(output)?)
}

/// Writes one JSON object per table row.
pub fn write_jsonl<W: Write>(table: &ReportTable, mut sink: W) -> Result<usize> {
    let mut count = 0;
    for row in table.rows() {
        let record: Map<String, Value> = table
            .columns()
            .iter()
            .zip(row)
            .map(|(column, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.clone())
                };
                (column.clone(), value)
            })
            .collect();
        serde_json::to_writer(&mut sink, &record).context("Failed to serialize JSONL record")?;
        writeln!(sink).context("Failed to write JSONL record")?;
        count += 1;
    }
    sink.flush().context("Failed to flush JSONL output")?;
    Ok(count)
}
