// crates/bulk-ingest-core/src/interfaces/mod.rs
// ============================================================================
// Module: Bulk Ingest Interfaces
// Description: Backend-agnostic interfaces for schema registry and row storage.
// Purpose: Define the contract surfaces used by the Bulk Ingest runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the runtime reaches its schema registry and row
//! store without embedding backend-specific details. A [`TableStore`] hands
//! out one [`WriteTxn`] at a time per store; everything staged through it
//! becomes visible on [`WriteTxn::commit`] and is discarded when the
//! transaction is dropped uncommitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::RowId;
use crate::core::identifiers::TableName;
use crate::core::schema::TableSchema;
use crate::core::value::Row;

// ============================================================================
// SECTION: Schema Registry
// ============================================================================

/// Registry errors for schema operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Table is not registered.
    #[error("table not found: {0}")]
    NotFound(String),
    /// Registry invalid data error.
    #[error("schema registry invalid data: {0}")]
    Invalid(String),
    /// Registry conflict (schema change over stored rows).
    #[error("schema registry conflict: {0}")]
    Conflict(String),
    /// Registry backend error.
    #[error("schema registry error: {0}")]
    Store(String),
}

/// Registry of destination table schemas.
pub trait SchemaRegistry: Send + Sync {
    /// Lists every registered table name in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when listing fails.
    fn list_tables(&self) -> Result<Vec<TableName>, RegistryError>;

    /// Loads a schema by table name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when lookup fails.
    fn schema(&self, table: &TableName) -> Result<Option<TableSchema>, RegistryError>;

    /// Stores (or replaces) a schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the schema cannot be stored.
    fn put_schema(&self, schema: TableSchema) -> Result<(), RegistryError>;
}

// ============================================================================
// SECTION: Table Store
// ============================================================================

/// Row store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("table store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("table store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("table store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("table store error: {0}")]
    Store(String),
}

/// Row as held by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    /// Store-assigned identifier.
    pub id: RowId,
    /// Column values.
    pub values: Row,
}

/// Durable or in-memory row storage keyed by table.
pub trait TableStore: Send + Sync {
    /// Returns every row of `table` ordered by [`RowId`] (insertion order).
    /// Unknown tables scan as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when reading fails.
    fn scan(&self, table: &TableName) -> Result<Vec<StoredRow>, StoreError>;

    /// Returns the number of rows stored for `table`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when reading fails.
    fn row_count(&self, table: &TableName) -> Result<usize, StoreError>;

    /// Opens the single write transaction for `table`, blocking other
    /// writers on this store until it commits or is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the transaction cannot be opened.
    fn begin_write<'a>(
        &'a self,
        table: &TableName,
    ) -> Result<Box<dyn WriteTxn + 'a>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Staged writes against one table.
///
/// # Invariants
/// - [`WriteTxn::rows`] reflects the table as of `begin_write`; staged writes
///   do not show up in it.
/// - Dropping without [`WriteTxn::commit`] discards every staged write.
pub trait WriteTxn {
    /// Rows present when the transaction began, ordered by [`RowId`].
    fn rows(&self) -> &[StoredRow];

    /// Stages a new row and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when staging fails.
    fn insert(&mut self, values: Row) -> Result<RowId, StoreError>;

    /// Stages a full replacement of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row does not exist or staging fails.
    fn replace(&mut self, id: RowId, values: Row) -> Result<(), StoreError>;

    /// Stages removal of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when staging fails.
    fn delete(&mut self, id: RowId) -> Result<(), StoreError>;

    /// Makes every staged write visible atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the commit fails; nothing is applied.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
