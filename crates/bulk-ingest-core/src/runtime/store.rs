// crates/bulk-ingest-core/src/runtime/store.rs
// ============================================================================
// Module: Bulk Ingest In-Memory Store
// Description: In-memory table store and schema registry.
// Purpose: Provide deterministic backends without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Tables are held as immutable snapshots behind an `RwLock`. A write
//! transaction stages its changes in a private copy and swaps the snapshot on
//! commit, so readers see either the state before an import or the state after
//! it. A separate writer mutex serialises transactions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;

use crate::core::identifiers::RowId;
use crate::core::identifiers::TableName;
use crate::core::schema::TableSchema;
use crate::core::value::Row;
use crate::interfaces::RegistryError;
use crate::interfaces::SchemaRegistry;
use crate::interfaces::StoreError;
use crate::interfaces::StoredRow;
use crate::interfaces::TableStore;
use crate::interfaces::WriteTxn;

// ============================================================================
// SECTION: Table Store
// ============================================================================

/// Committed contents of one table.
#[derive(Debug, Default)]
struct MemoryTable {
    /// Next identifier to assign.
    next_id: u64,
    /// Rows ordered by identifier.
    rows: Vec<StoredRow>,
}

/// Shared table map.
type TableMap = BTreeMap<TableName, Arc<MemoryTable>>;

/// In-memory table store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTableStore {
    /// Committed table snapshots.
    tables: Arc<RwLock<TableMap>>,
    /// Held for the lifetime of each write transaction.
    writer: Arc<Mutex<()>>,
}

impl InMemoryTableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed snapshot for `table`.
    fn snapshot(&self, table: &TableName) -> Result<Option<Arc<MemoryTable>>, StoreError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| StoreError::Store("table store lock poisoned".to_string()))?;
        Ok(guard.get(table).cloned())
    }
}

impl TableStore for InMemoryTableStore {
    fn scan(&self, table: &TableName) -> Result<Vec<StoredRow>, StoreError> {
        Ok(self.snapshot(table)?.map(|snapshot| snapshot.rows.clone()).unwrap_or_default())
    }

    fn row_count(&self, table: &TableName) -> Result<usize, StoreError> {
        Ok(self.snapshot(table)?.map_or(0, |snapshot| snapshot.rows.len()))
    }

    fn begin_write<'a>(
        &'a self,
        table: &TableName,
    ) -> Result<Box<dyn WriteTxn + 'a>, StoreError> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Store("table store writer mutex poisoned".to_string()))?;
        let base = self.snapshot(table)?.unwrap_or_default();
        let staged = base.rows.iter().map(|row| (row.id, row.values.clone())).collect();
        Ok(Box::new(MemoryTxn {
            tables: &self.tables,
            _writer: writer,
            table: table.clone(),
            next_id: base.next_id.max(1),
            base,
            staged,
        }))
    }
}

/// Write transaction over one in-memory table.
struct MemoryTxn<'a> {
    /// Table map to publish into.
    tables: &'a RwLock<TableMap>,
    /// Writer lock guard.
    _writer: MutexGuard<'a, ()>,
    /// Table being written.
    table: TableName,
    /// Snapshot at transaction start.
    base: Arc<MemoryTable>,
    /// Working copy.
    staged: BTreeMap<RowId, Row>,
    /// Next identifier to assign.
    next_id: u64,
}

impl WriteTxn for MemoryTxn<'_> {
    fn rows(&self) -> &[StoredRow] {
        &self.base.rows
    }

    fn insert(&mut self, values: Row) -> Result<RowId, StoreError> {
        let id = RowId::new(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Store("row identifier space exhausted".to_string()))?;
        self.staged.insert(id, values);
        Ok(id)
    }

    fn replace(&mut self, id: RowId, values: Row) -> Result<(), StoreError> {
        let slot = self
            .staged
            .get_mut(&id)
            .ok_or_else(|| StoreError::Invalid(format!("row {id} does not exist")))?;
        *slot = values;
        Ok(())
    }

    fn delete(&mut self, id: RowId) -> Result<(), StoreError> {
        self.staged
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::Invalid(format!("row {id} does not exist")))
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let txn = *self;
        let rows = txn
            .staged
            .into_iter()
            .map(|(id, values)| StoredRow {
                id,
                values,
            })
            .collect();
        let table = MemoryTable {
            next_id: txn.next_id,
            rows,
        };
        txn.tables
            .write()
            .map_err(|_| StoreError::Store("table store lock poisoned".to_string()))?
            .insert(txn.table, Arc::new(table));
        Ok(())
    }
}

// ============================================================================
// SECTION: Schema Registry
// ============================================================================

/// In-memory schema registry for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemorySchemaRegistry {
    /// Schemas keyed by table name.
    schemas: Arc<Mutex<BTreeMap<TableName, TableSchema>>>,
}

impl InMemorySchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the schema map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<TableName, TableSchema>>, RegistryError> {
        self.schemas
            .lock()
            .map_err(|_| RegistryError::Store("schema registry mutex poisoned".to_string()))
    }
}

impl SchemaRegistry for InMemorySchemaRegistry {
    fn list_tables(&self) -> Result<Vec<TableName>, RegistryError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn schema(&self, table: &TableName) -> Result<Option<TableSchema>, RegistryError> {
        Ok(self.lock()?.get(table).cloned())
    }

    fn put_schema(&self, schema: TableSchema) -> Result<(), RegistryError> {
        self.lock()?.insert(schema.name.clone(), schema);
        Ok(())
    }
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

    use super::InMemoryTableStore;
    use crate::core::identifiers::TableName;
    use crate::core::value::Row;
    use crate::core::value::Value;
    use crate::interfaces::TableStore;

    fn row(code: &str) -> Row {
        let mut row = Row::new();
        row.insert("code".to_string(), Value::String(code.to_string()));
        row
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let store = InMemoryTableStore::new();
        let table = TableName::new("quotes");
        {
            let mut txn = store.begin_write(&table).unwrap();
            txn.insert(row("A")).unwrap();
        }
        assert_eq!(store.row_count(&table).unwrap(), 0);
    }

    #[test]
    fn identifiers_keep_increasing_after_deletes() {
        let store = InMemoryTableStore::new();
        let table = TableName::new("quotes");
        let mut txn = store.begin_write(&table).unwrap();
        let first = txn.insert(row("A")).unwrap();
        txn.commit().unwrap();

        let mut txn = store.begin_write(&table).unwrap();
        assert_eq!(txn.rows().len(), 1);
        txn.delete(first).unwrap();
        let second = txn.insert(row("B")).unwrap();
        txn.commit().unwrap();

        assert!(second > first);
        let rows = store.scan(&table).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, second);
    }
}
