// crates/bulk-ingest-core/src/core/identifiers.rs
// ============================================================================
// Module: Bulk Ingest Identifiers
// Description: Table names and stored row identifiers.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Table names are opaque strings; validation happens when a schema is
//! registered, not inside the wrapper. Row identifiers are assigned by the
//! storage backend in strictly increasing order, so ordering by [`RowId`] is
//! ordering by insertion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of table names reserved for the service itself.
pub const RESERVED_TABLE_PREFIX: &str = "system.";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Destination table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    /// Creates a new table name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the name falls in the reserved `system.` namespace.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_TABLE_PREFIX)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TableName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TableName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Backend-assigned row identifier (monotonic per table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Creates a row identifier from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
