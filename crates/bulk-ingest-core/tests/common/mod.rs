// crates/bulk-ingest-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared schemas, services, and fault-injecting stores.
// Purpose: Provide reusable test infrastructure for import and query tests.
// Dependencies: bulk-ingest-core
// ============================================================================

//! ## Overview
//! Fixtures build a `quotes` table keyed by `code` with a unique `isin`
//! column, an in-memory service around it, and a store wrapper that fails
//! after a fixed number of staged inserts.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use bulk_ingest_core::ColumnDef;
use bulk_ingest_core::ColumnType;
use bulk_ingest_core::ImportRequest;
use bulk_ingest_core::InMemorySchemaRegistry;
use bulk_ingest_core::InMemoryTableStore;
use bulk_ingest_core::IngestService;
use bulk_ingest_core::RawRow;
use bulk_ingest_core::RowId;
use bulk_ingest_core::ServiceLimits;
use bulk_ingest_core::StoreError;
use bulk_ingest_core::StoredRow;
use bulk_ingest_core::TableName;
use bulk_ingest_core::TableSchema;
use bulk_ingest_core::TableStore;
use bulk_ingest_core::Value;
use bulk_ingest_core::WriteMode;
use bulk_ingest_core::WriteTxn;
use serde_json::json;

// ============================================================================
// SECTION: Schemas
// ============================================================================

/// Builds a column definition.
pub fn column(name: &str, column_type: ColumnType, nullable: bool, unique: bool) -> ColumnDef {
    ColumnDef {
        name: name.to_string(),
        column_type,
        nullable,
        unique,
    }
}

/// `quotes(code key, isin unique, market, price, volume)`.
pub fn quotes_schema() -> TableSchema {
    TableSchema {
        name: TableName::new("quotes"),
        columns: vec![
            column("code", ColumnType::String, false, false),
            column("isin", ColumnType::String, true, true),
            column("market", ColumnType::String, true, false),
            column("price", ColumnType::Float, true, false),
            column("volume", ColumnType::Integer, true, false),
        ],
        key: vec!["code".to_string()],
        import_date_column: None,
        replace_same_day: false,
    }
}

/// `daily(code, close, import_date)` stamped and replaced per day.
pub fn daily_schema() -> TableSchema {
    TableSchema {
        name: TableName::new("daily"),
        columns: vec![
            column("code", ColumnType::String, false, false),
            column("close", ColumnType::Float, true, false),
            column("import_date", ColumnType::Date, true, false),
        ],
        key: Vec::new(),
        import_date_column: Some("import_date".to_string()),
        replace_same_day: true,
    }
}

// ============================================================================
// SECTION: Services
// ============================================================================

/// Builds an in-memory service over `store` with the fixture schemas.
pub fn service_with_store(store: Arc<dyn TableStore>) -> IngestService {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let service = IngestService::new(registry, store, ServiceLimits::default());
    service.register_schema(quotes_schema()).unwrap();
    service.register_schema(daily_schema()).unwrap();
    service
}

/// Builds an in-memory service with the fixture schemas.
pub fn service() -> (IngestService, InMemoryTableStore) {
    let store = InMemoryTableStore::new();
    (service_with_store(Arc::new(store.clone())), store)
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Quote columns in declaration order.
pub fn quote_columns() -> Vec<String> {
    ["code", "isin", "market", "price", "volume"].iter().map(ToString::to_string).collect()
}

/// Builds a raw quote row as a CSV parser would (all strings).
pub fn quote(code: &str, isin: &str, market: &str, price: &str, volume: &str) -> RawRow {
    json!({"code": code, "isin": isin, "market": market, "price": price, "volume": volume})
        .as_object()
        .cloned()
        .unwrap()
}

/// Builds an import request for the quotes table.
pub fn quotes_import(mode: WriteMode, rows: Vec<RawRow>) -> ImportRequest {
    ImportRequest {
        table: TableName::new("quotes"),
        mode,
        rows,
        columns: quote_columns(),
    }
}

/// Reads a string cell.
pub fn text(row: &StoredRow, column: &str) -> Option<String> {
    row.values.get(column).and_then(Value::as_str).map(ToString::to_string)
}

// ============================================================================
// SECTION: Fault Injection
// ============================================================================

/// Store wrapper whose transactions fail once `budget` inserts are staged.
pub struct FailingStore {
    /// Wrapped store.
    pub inner: InMemoryTableStore,
    /// Remaining inserts before failure, shared across transactions.
    pub budget: Arc<AtomicUsize>,
}

impl FailingStore {
    /// Wraps `inner`, failing after `budget` inserts.
    pub fn new(inner: InMemoryTableStore, budget: usize) -> Self {
        Self {
            inner,
            budget: Arc::new(AtomicUsize::new(budget)),
        }
    }
}

impl TableStore for FailingStore {
    fn scan(&self, table: &TableName) -> Result<Vec<StoredRow>, StoreError> {
        self.inner.scan(table)
    }

    fn row_count(&self, table: &TableName) -> Result<usize, StoreError> {
        self.inner.row_count(table)
    }

    fn begin_write<'a>(
        &'a self,
        table: &TableName,
    ) -> Result<Box<dyn WriteTxn + 'a>, StoreError> {
        Ok(Box::new(FailingTxn {
            inner: self.inner.begin_write(table)?,
            budget: Arc::clone(&self.budget),
        }))
    }
}

/// Transaction wrapper enforcing the insert budget.
struct FailingTxn<'a> {
    /// Wrapped transaction.
    inner: Box<dyn WriteTxn + 'a>,
    /// Shared insert budget.
    budget: Arc<AtomicUsize>,
}

impl WriteTxn for FailingTxn<'_> {
    fn rows(&self) -> &[StoredRow] {
        self.inner.rows()
    }

    fn insert(&mut self, values: bulk_ingest_core::Row) -> Result<RowId, StoreError> {
        if self.budget.load(Ordering::SeqCst) == 0 {
            return Err(StoreError::Io("injected disk failure".to_string()));
        }
        self.budget.fetch_sub(1, Ordering::SeqCst);
        self.inner.insert(values)
    }

    fn replace(&mut self, id: RowId, values: bulk_ingest_core::Row) -> Result<(), StoreError> {
        self.inner.replace(id, values)
    }

    fn delete(&mut self, id: RowId) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit()
    }
}
