// crates/bulk-ingest-core/src/runtime/service.rs
// ============================================================================
// Module: Bulk Ingest Service
// Description: Facade over the registry, validator, importer, and query engine.
// Purpose: Give every transport one entry point with consistent errors.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`IngestService`] owns injected backends and enforces request limits.
//! Row-level problems come back inside results; only request-level problems
//! and backend faults surface as [`IngestError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::batch::ImportRequest;
use crate::core::batch::ImportResult;
use crate::core::batch::RawRow;
use crate::core::batch::ValidationReport;
use crate::core::batch::WriteMode;
use crate::core::identifiers::TableName;
use crate::core::query::QueryPage;
use crate::core::query::QueryRequest;
use crate::core::schema::SchemaError;
use crate::core::schema::TableSchema;
use crate::core::time::Clock;
use crate::core::time::SystemClock;
use crate::core::time::format_date;
use crate::interfaces::RegistryError;
use crate::interfaces::SchemaRegistry;
use crate::interfaces::StoreError;
use crate::interfaces::TableStore;
use crate::runtime::importer::apply_batch;
use crate::runtime::query::run_query;
use crate::runtime::validator::check_batch_shape;
use crate::runtime::validator::check_column_list;
use crate::runtime::validator::validate_rows;
use crate::runtime::validator::validate_structure;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum rows per import call.
pub const DEFAULT_MAX_BATCH_ROWS: usize = 50_000;
/// Default maximum rows per query page.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1_000;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request limits enforced by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    /// Maximum rows accepted by one import or validate call.
    pub max_batch_rows: usize,
    /// Maximum page size accepted by a query.
    pub max_page_size: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Service facade over injected backends.
#[derive(Clone)]
pub struct IngestService {
    /// Schema registry.
    registry: Arc<dyn SchemaRegistry>,
    /// Row store.
    store: Arc<dyn TableStore>,
    /// Request limits.
    limits: ServiceLimits,
    /// Clock used for import date stamping.
    clock: Arc<dyn Clock>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request-level service errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Table (or other addressed entity) does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Request or batch is malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Request conflicts with stored state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage is unavailable or failed mid-call.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

impl From<RegistryError> for IngestError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(table) => Self::NotFound(format!("table `{table}`")),
            RegistryError::Invalid(message) => Self::Validation(message),
            RegistryError::Conflict(message) => Self::Conflict(message),
            RegistryError::Store(message) => Self::Infrastructure(message),
        }
    }
}

impl From<SchemaError> for IngestError {
    fn from(err: SchemaError) -> Self {
        Self::Validation(err.to_string())
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

impl IngestService {
    /// Creates a service using the system clock.
    #[must_use]
    pub fn new(
        registry: Arc<dyn SchemaRegistry>,
        store: Arc<dyn TableStore>,
        limits: ServiceLimits,
    ) -> Self {
        Self {
            registry,
            store,
            limits,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for import date stamping.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> ServiceLimits {
        self.limits
    }

    /// Lists user-visible tables in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the registry cannot be read.
    pub fn list_tables(&self) -> Result<Vec<TableName>, IngestError> {
        let mut tables: Vec<TableName> =
            self.registry.list_tables()?.into_iter().filter(|table| !table.is_reserved()).collect();
        tables.sort();
        Ok(tables)
    }

    /// Returns the schema for `table`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::NotFound`] for unknown tables.
    pub fn get_schema(&self, table: &TableName) -> Result<TableSchema, IngestError> {
        if table.as_str().trim().is_empty() {
            return Err(IngestError::Validation("table must be non-empty".to_string()));
        }
        self.registry
            .schema(table)?
            .ok_or_else(|| IngestError::NotFound(format!("table `{table}`")))
    }

    /// Registers a table schema.
    ///
    /// Re-registering an identical schema is a no-op. A changed schema is
    /// accepted only while the table holds no rows.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Validation`] for malformed schemas and
    /// [`IngestError::Conflict`] for changes over stored rows.
    pub fn register_schema(&self, schema: TableSchema) -> Result<(), IngestError> {
        schema.validate()?;
        if let Some(existing) = self.registry.schema(&schema.name)? {
            if existing == schema {
                return Ok(());
            }
            let rows = self.store.row_count(&schema.name)?;
            if rows > 0 {
                return Err(IngestError::Conflict(format!(
                    "table `{}` holds {rows} rows; its schema cannot change",
                    schema.name
                )));
            }
        }
        self.registry.put_schema(schema)?;
        Ok(())
    }

    /// Validates rows without writing them.
    ///
    /// Without a table only the row shape is checked against `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] for request-level problems.
    pub fn validate(
        &self,
        table: Option<&TableName>,
        rows: &[RawRow],
        columns: &[String],
    ) -> Result<ValidationReport, IngestError> {
        self.check_batch_size(rows)?;
        check_column_list(columns).map_err(IngestError::Validation)?;
        let failures = match table {
            None => validate_structure(rows, columns),
            Some(table) => {
                let schema = self.get_schema(table)?;
                check_batch_shape(&schema, columns, WriteMode::Insert)
                    .map_err(IngestError::Validation)?;
                let today = self.import_date(&schema);
                validate_rows(&schema, rows, columns, WriteMode::Insert, today.as_deref()).failures
            }
        };
        Ok(ValidationReport {
            row_count: rows.len(),
            column_count: columns.len(),
            failures,
        })
    }

    /// Validates and applies one import batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] for request-level problems or storage faults.
    /// Row-level failures are reported inside the [`ImportResult`].
    pub fn import(&self, request: ImportRequest) -> Result<ImportResult, IngestError> {
        self.check_batch_size(&request.rows)?;
        let schema = self.get_schema(&request.table)?;
        check_batch_shape(&schema, &request.columns, request.mode)
            .map_err(IngestError::Validation)?;
        let today = self.import_date(&schema);
        let validated =
            validate_rows(&schema, &request.rows, &request.columns, request.mode, today.as_deref());
        let outcome = apply_batch(
            self.store.as_ref(),
            &schema,
            request.mode,
            validated.accepted,
            today.as_deref(),
        )?;
        let mut failures = validated.failures;
        failures.extend(outcome.failures);
        Ok(ImportResult::new(outcome.imported, outcome.replaced, failures))
    }

    /// Runs a filter/sort/paginate query.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] for unknown tables, invalid page bounds, unknown
    /// columns, or storage faults.
    pub fn query(&self, request: &QueryRequest) -> Result<QueryPage, IngestError> {
        if request.page == 0 {
            return Err(IngestError::Validation("page must be at least 1".to_string()));
        }
        if request.page_size == 0 || request.page_size > self.limits.max_page_size {
            return Err(IngestError::Validation(format!(
                "page_size must be between 1 and {}",
                self.limits.max_page_size
            )));
        }
        let schema = self.get_schema(&request.table)?;
        let rows = self.store.scan(&request.table)?;
        run_query(&schema, rows, request).map_err(IngestError::Validation)
    }

    /// Reports backend readiness.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Infrastructure`] when the store is unavailable.
    pub fn readiness(&self) -> Result<(), IngestError> {
        self.store.readiness()?;
        Ok(())
    }

    /// Rejects empty and oversized batches.
    fn check_batch_size(&self, rows: &[RawRow]) -> Result<(), IngestError> {
        if rows.is_empty() {
            return Err(IngestError::Validation("data must be non-empty".to_string()));
        }
        if rows.len() > self.limits.max_batch_rows {
            return Err(IngestError::Validation(format!(
                "batch of {} rows exceeds the limit of {}",
                rows.len(),
                self.limits.max_batch_rows
            )));
        }
        Ok(())
    }

    /// Returns today's date when the schema stamps imports.
    fn import_date(&self, schema: &TableSchema) -> Option<String> {
        schema.import_date_column.as_ref().map(|_| format_date(self.clock.today()))
    }
}
