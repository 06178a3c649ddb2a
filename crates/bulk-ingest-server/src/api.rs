// crates/bulk-ingest-server/src/api.rs
// ============================================================================
// Module: Ingest HTTP API Types
// Description: Request and response bodies for the `/api/csv/*` routes.
// Purpose: Keep the wire format separate from core types.
// Dependencies: bulk-ingest-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Request bodies are parsed leniently where clients historically omit fields
//! (`filters`, `page`, `sort`, `order`) and converted into core requests with
//! explicit checks. Every response body carries `success` and `message`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use bulk_ingest_core::FilterPredicate;
use bulk_ingest_core::ImportRequest;
use bulk_ingest_core::ImportResult;
use bulk_ingest_core::QueryPage;
use bulk_ingest_core::QueryRequest;
use bulk_ingest_core::RawRow;
use bulk_ingest_core::RowFailure;
use bulk_ingest_core::SortSpec;
use bulk_ingest_core::TableName;
use bulk_ingest_core::TableSchema;
use bulk_ingest_core::ValidationReport;
use bulk_ingest_core::WriteMode;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// `POST /api/csv/import` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportBody {
    /// Destination table.
    pub table: String,
    /// Write mode label (`insert`, `update`, `upsert`).
    pub mode: String,
    /// Parsed rows.
    pub data: Vec<RawRow>,
    /// Declared column names.
    pub columns: Vec<String>,
}

impl ImportBody {
    /// Converts the body into a core import request.
    ///
    /// # Errors
    ///
    /// Returns a reason when the table is blank or the mode is unknown.
    pub fn into_request(self) -> Result<ImportRequest, String> {
        let table = required_table(&self.table)?;
        let mode: WriteMode = self.mode.parse()?;
        Ok(ImportRequest {
            table,
            mode,
            rows: self.data,
            columns: self.columns,
        })
    }
}

/// `POST /api/csv/validate` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateBody {
    /// Parsed rows.
    pub data: Vec<RawRow>,
    /// Declared column names.
    pub columns: Vec<String>,
    /// Optional table to validate against; structural checks only when absent.
    #[serde(default)]
    pub table: Option<String>,
}

impl ValidateBody {
    /// Returns the target table, treating a blank name as absent.
    #[must_use]
    pub fn table(&self) -> Option<TableName> {
        self.table
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(TableName::new)
    }
}

/// `POST /api/csv/filter` body.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterBody {
    /// Table to query.
    pub table: String,
    /// Column predicates combined with AND.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterPredicate>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
    /// Page size; the configured default applies when absent.
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Sort column; empty keeps insertion order.
    #[serde(default)]
    pub sort: String,
    /// Sort order label.
    #[serde(default)]
    pub order: String,
}

impl FilterBody {
    /// Converts the body into a core query request.
    ///
    /// # Errors
    ///
    /// Returns a reason when the table is blank or the order is unknown.
    pub fn into_request(self, default_page_size: usize) -> Result<QueryRequest, String> {
        let table = required_table(&self.table)?;
        let sort = SortSpec::from_labels(&self.sort, &self.order)?;
        Ok(QueryRequest {
            table,
            filters: self.filters,
            page: self.page,
            page_size: self.page_size.unwrap_or(default_page_size),
            sort,
        })
    }
}

/// Pages start at 1.
const fn default_page() -> usize {
    1
}

/// Rejects blank table names.
fn required_table(name: &str) -> Result<TableName, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("table must be non-empty".to_string());
    }
    Ok(TableName::new(trimmed))
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Import response body.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    /// Always true; failures use [`MessageResponse`].
    pub success: bool,
    /// Rows written.
    pub imported: usize,
    /// Rows rejected.
    pub failed: usize,
    /// Rows removed by same-day replacement.
    pub replaced: usize,
    /// Per-row failures.
    pub errors: Vec<RowFailure>,
    /// Summary message.
    pub message: String,
}

impl From<ImportResult> for ImportResponse {
    fn from(result: ImportResult) -> Self {
        Self {
            success: true,
            imported: result.imported,
            failed: result.failed,
            replaced: result.replaced,
            errors: result.failures,
            message: result.message,
        }
    }
}

/// Table list response body.
#[derive(Debug, Clone, Serialize)]
pub struct TablesResponse {
    /// Always true.
    pub success: bool,
    /// Table names in ascending order.
    pub data: Vec<TableName>,
    /// Summary message.
    pub message: String,
}

impl TablesResponse {
    /// Builds the response.
    #[must_use]
    pub fn new(data: Vec<TableName>) -> Self {
        let message = format!("found {} tables", data.len());
        Self {
            success: true,
            data,
            message,
        }
    }
}

/// Validation response body.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    /// Always true; `valid` carries the verdict.
    pub success: bool,
    /// True when no row failed.
    pub valid: bool,
    /// Number of submitted rows.
    pub row_count: usize,
    /// Number of declared columns.
    pub column_count: usize,
    /// Per-row failures.
    pub errors: Vec<RowFailure>,
    /// Summary message.
    pub message: String,
}

impl From<ValidationReport> for ValidateResponse {
    fn from(report: ValidationReport) -> Self {
        let valid = report.is_valid();
        let message = if valid {
            format!(
                "data is valid: {} rows, {} columns",
                report.row_count, report.column_count
            )
        } else {
            format!("{} of {} rows failed validation", report.failures.len(), report.row_count)
        };
        Self {
            success: true,
            valid,
            row_count: report.row_count,
            column_count: report.column_count,
            errors: report.failures,
            message,
        }
    }
}

/// Filter response body.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResponse {
    /// Always true.
    pub success: bool,
    /// Records on this page, each with `_id`.
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Matching rows before pagination.
    pub total: usize,
    /// Page number.
    pub page: usize,
    /// Page size.
    pub page_size: usize,
    /// Summary message.
    pub message: String,
}

impl From<QueryPage> for FilterResponse {
    fn from(page: QueryPage) -> Self {
        let message = format!("filter finished: {} of {} rows", page.rows.len(), page.total);
        Self {
            success: true,
            data: page.rows.iter().map(bulk_ingest_core::Record::to_json_object).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            message,
        }
    }
}

/// Schema response body.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaResponse {
    /// Always true.
    pub success: bool,
    /// Table schema.
    pub data: TableSchema,
    /// Summary message.
    pub message: String,
}

impl From<TableSchema> for SchemaResponse {
    fn from(schema: TableSchema) -> Self {
        let message = format!("schema for table `{}`", schema.name);
        Self {
            success: true,
            data: schema,
            message,
        }
    }
}

/// Bare success or failure envelope.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Outcome flag.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Builds a failure envelope.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
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

    use bulk_ingest_core::SortOrder;
    use serde_json::json;

    use super::FilterBody;
    use super::ImportBody;
    use super::ValidateBody;

    #[test]
    fn filter_body_applies_defaults() {
        let body: FilterBody = serde_json::from_value(json!({"table": "quotes"})).unwrap();
        let request = body.into_request(20).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 20);
        assert!(request.sort.is_none());
        assert!(request.filters.is_empty());
    }

    #[test]
    fn filter_body_defaults_order_to_descending() {
        let body: FilterBody =
            serde_json::from_value(json!({"table": "quotes", "sort": "price"})).unwrap();
        let request = body.into_request(20).unwrap();
        assert_eq!(request.sort.unwrap().order, SortOrder::Descending);
    }

    #[test]
    fn import_body_rejects_unknown_mode_and_blank_table() {
        let body: ImportBody = serde_json::from_value(
            json!({"table": "quotes", "mode": "merge", "data": [], "columns": []}),
        )
        .unwrap();
        assert!(body.into_request().unwrap_err().contains("merge"));
        let body: ImportBody = serde_json::from_value(
            json!({"table": "  ", "mode": "insert", "data": [], "columns": []}),
        )
        .unwrap();
        assert!(body.into_request().is_err());
    }

    #[test]
    fn validate_body_treats_blank_table_as_absent() {
        let body: ValidateBody =
            serde_json::from_value(json!({"data": [], "columns": [], "table": ""})).unwrap();
        assert!(body.table().is_none());
    }
}
