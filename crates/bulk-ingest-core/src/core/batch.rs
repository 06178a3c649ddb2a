// crates/bulk-ingest-core/src/core/batch.rs
// ============================================================================
// Module: Bulk Ingest Batches
// Description: Import requests, write modes, and per-row import results.
// Purpose: Model one import call from request to immutable result.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`ImportRequest`] carries raw (untyped) rows as parsed from CSV or JSON.
//! The importer turns it into an [`ImportResult`] with aggregate counts and
//! one [`RowFailure`] per rejected row. Row indices are zero-based positions in
//! the submitted batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TableName;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Raw row as submitted by a client.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Import write mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Every row becomes a new record.
    Insert,
    /// Every row must match an existing record by key.
    Update,
    /// Update on key match, insert otherwise.
    Upsert,
}

impl WriteMode {
    /// Returns the stable label for the mode.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Upsert => "upsert",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "upsert" => Ok(Self::Upsert),
            other => Err(format!("invalid import mode: {other}")),
        }
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Row violates the schema (shape, type, or in-batch uniqueness).
    Validation,
    /// Row conflicts with stored data (collision or missing update target).
    Conflict,
}

/// Per-row failure entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// Zero-based row position in the submitted batch.
    pub row_index: usize,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub reason: String,
}

impl RowFailure {
    /// Builds a validation failure.
    #[must_use]
    pub fn validation(row_index: usize, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            kind: FailureKind::Validation,
            reason: reason.into(),
        }
    }

    /// Builds a conflict failure.
    #[must_use]
    pub fn conflict(row_index: usize, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            kind: FailureKind::Conflict,
            reason: reason.into(),
        }
    }
}

/// One import call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRequest {
    /// Destination table.
    pub table: TableName,
    /// Write mode.
    pub mode: WriteMode,
    /// Rows in submission order.
    pub rows: Vec<RawRow>,
    /// Column names the client declares for every row.
    pub columns: Vec<String>,
}

/// Outcome of one import call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Rows written.
    pub imported: usize,
    /// Rows rejected.
    pub failed: usize,
    /// Rows removed by same-day replacement before the batch was applied.
    pub replaced: usize,
    /// Per-row failures ordered by row index.
    pub failures: Vec<RowFailure>,
    /// Summary message.
    pub message: String,
}

impl ImportResult {
    /// Builds the result, sorting failures by row index.
    #[must_use]
    pub fn new(imported: usize, replaced: usize, mut failures: Vec<RowFailure>) -> Self {
        failures.sort_by_key(|failure| failure.row_index);
        let failed = failures.len();
        let message = format!("import finished: {imported} imported, {failed} failed");
        Self {
            imported,
            failed,
            replaced,
            failures,
            message,
        }
    }
}

/// Outcome of a validation-only call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Number of submitted rows.
    pub row_count: usize,
    /// Number of declared columns.
    pub column_count: usize,
    /// Per-row failures ordered by row index.
    pub failures: Vec<RowFailure>,
}

impl ValidationReport {
    /// Returns true when no row failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}
