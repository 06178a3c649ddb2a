// crates/bulk-ingest-cli/src/csv_input.rs
// ============================================================================
// Module: CSV Input
// Description: Bounded CSV reads producing raw string rows.
// Purpose: Feed CSV files into imports and validation without type guessing.
// Dependencies: bulk-ingest-core, csv, thiserror
// ============================================================================

//! ## Overview
//! The header row names the columns. Every cell is passed through as a JSON
//! string so the validator performs all type coercion, exactly as it does for
//! rows posted over HTTP.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bulk_ingest_core::RawRow;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a CSV input file.
pub const MAX_CSV_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Decoded CSV batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBatch {
    /// Header names in file order.
    pub columns: Vec<String>,
    /// Rows keyed by header name.
    pub rows: Vec<RawRow>,
}

/// CSV input errors.
#[derive(Debug, Error)]
pub enum CsvInputError {
    /// File I/O failure.
    #[error("csv io error: {0}")]
    Io(String),
    /// File size exceeds the limit.
    #[error("csv file exceeds size limit ({size} > {limit})")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
    /// Malformed CSV content.
    #[error("csv parse error: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Reads and decodes a CSV file, enforcing `max_bytes`.
///
/// # Errors
///
/// Returns [`CsvInputError`] when the file is unreadable, too large, or
/// malformed.
pub fn read_csv_file(path: &Path, max_bytes: usize) -> Result<CsvBatch, CsvInputError> {
    let bytes = read_bytes_with_limit(path, max_bytes)?;
    parse_csv(&bytes)
}

/// Decodes CSV bytes with a header row.
///
/// # Errors
///
/// Returns [`CsvInputError::Parse`] for a missing or blank header, ragged
/// records, or invalid UTF-8.
pub fn parse_csv(bytes: &[u8]) -> Result<CsvBatch, CsvInputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);
    let columns: Vec<String> = reader
        .headers()
        .map_err(|err| CsvInputError::Parse(err.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() || columns.iter().any(String::is_empty) {
        return Err(CsvInputError::Parse("header row must name every column".to_string()));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|err| CsvInputError::Parse(format!("record {index}: {err}")))?;
        let row: RawRow = columns
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.clone(), serde_json::Value::String(cell.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(CsvBatch {
        columns,
        rows,
    })
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, CsvInputError> {
    let file = File::open(path).map_err(|err| CsvInputError::Io(err.to_string()))?;
    let size = file.metadata().map_err(|err| CsvInputError::Io(err.to_string()))?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(CsvInputError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| CsvInputError::Io(err.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(CsvInputError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use serde_json::json;

    use super::CsvInputError;
    use super::parse_csv;
    use super::read_csv_file;

    #[test]
    fn cells_stay_strings_keyed_by_header() {
        let batch = parse_csv(b" code , price\nA,3.5\nB,\n").unwrap();
        assert_eq!(batch.columns, vec!["code", "price"]);
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[0]["price"], json!("3.5"));
        assert_eq!(batch.rows[1]["price"], json!(""));
    }

    #[test]
    fn ragged_records_fail() {
        let err = parse_csv(b"code,price\nA,1,extra\n").unwrap_err();
        assert!(matches!(err, CsvInputError::Parse(message) if message.contains("record 0")));
    }

    #[test]
    fn blank_header_fails() {
        assert!(parse_csv(b"code,,price\nA,1,2\n").is_err());
        assert!(parse_csv(b"").is_err());
    }

    #[test]
    fn oversized_file_fails_closed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "code\nA\nB\nC\n").unwrap();
        let err = read_csv_file(&path, 4).unwrap_err();
        assert!(matches!(err, CsvInputError::TooLarge { limit: 4, .. }));
        assert_eq!(read_csv_file(&path, 1024).unwrap().rows.len(), 3);
    }
}
