// crates/bulk-ingest-core/tests/query.rs
// ============================================================================
// Module: Query Engine Tests
// Description: Service-level filter, sort, pagination, and registry reads.
// Purpose: Validate query requests end to end against the in-memory backends.
// Dependencies: bulk-ingest-core
// ============================================================================
//! ## Overview
//! Covers page bounds, unknown tables, reserved table listing, schema
//! re-registration rules, and the `_id` field on returned records.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    missing_docs,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;

use bulk_ingest_core::FilterPredicate;
use bulk_ingest_core::IngestError;
use bulk_ingest_core::QueryRequest;
use bulk_ingest_core::SchemaRegistry;
use bulk_ingest_core::SortSpec;
use bulk_ingest_core::TableName;
use bulk_ingest_core::TableSchema;
use bulk_ingest_core::WriteMode;
use serde_json::json;

use crate::common::column;
use crate::common::quote;
use crate::common::quotes_import;
use crate::common::quotes_schema;
use crate::common::service;

fn query(table: &str) -> QueryRequest {
    QueryRequest {
        table: TableName::new(table),
        filters: BTreeMap::new(),
        page: 1,
        page_size: 20,
        sort: None,
    }
}

fn seeded() -> bulk_ingest_core::IngestService {
    let (service, _store) = service();
    let rows = vec![
        quote("A", "I-A", "SH", "10", "1"),
        quote("B", "I-B", "SZ", "30", "2"),
        quote("C", "I-C", "SH", "20", "3"),
    ];
    service.import(quotes_import(WriteMode::Insert, rows)).unwrap();
    service
}

/// Verifies filter, sort, and page combine as expected.
#[test]
fn filters_sort_and_paginate() {
    let service = seeded();
    let mut request = query("quotes");
    request.filters.insert("market".to_string(), FilterPredicate::Equals(json!("SH")));
    request.sort = SortSpec::from_labels("price", "ascending").unwrap();
    request.page_size = 1;
    request.page = 2;
    let page = service.query(&request).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows.len(), 1);
    let record = page.rows[0].to_json_object();
    assert_eq!(record.get("code"), Some(&json!("C")));
    assert_eq!(record.get("_id"), Some(&json!("3")));
}

/// Verifies page bounds are enforced.
#[test]
fn page_bounds_are_validated() {
    let service = seeded();
    let mut request = query("quotes");
    request.page = 0;
    assert!(matches!(service.query(&request), Err(IngestError::Validation(_))));
    let mut request = query("quotes");
    request.page_size = service.limits().max_page_size + 1;
    assert!(matches!(service.query(&request), Err(IngestError::Validation(_))));
    let mut request = query("quotes");
    request.page_size = 0;
    assert!(matches!(service.query(&request), Err(IngestError::Validation(_))));
}

/// Verifies unknown tables surface as not found.
#[test]
fn unknown_table_is_not_found() {
    let service = seeded();
    assert!(matches!(service.query(&query("missing")), Err(IngestError::NotFound(_))));
    assert!(matches!(
        service.get_schema(&TableName::new("missing")),
        Err(IngestError::NotFound(_))
    ));
}

/// Verifies reserved tables never appear in the listing.
#[test]
fn reserved_tables_are_not_listed() {
    let registry = std::sync::Arc::new(bulk_ingest_core::InMemorySchemaRegistry::new());
    let mut hidden = quotes_schema();
    hidden.name = TableName::new("system.users");
    registry.put_schema(hidden).unwrap();
    let service = bulk_ingest_core::IngestService::new(
        registry,
        std::sync::Arc::new(bulk_ingest_core::InMemoryTableStore::new()),
        bulk_ingest_core::ServiceLimits::default(),
    );
    service.register_schema(quotes_schema()).unwrap();
    assert_eq!(service.list_tables().unwrap(), vec![TableName::new("quotes")]);
}

/// Verifies schema changes are refused once rows exist.
#[test]
fn schema_changes_over_rows_conflict() {
    let service = seeded();
    service.register_schema(quotes_schema()).unwrap();

    let mut changed: TableSchema = quotes_schema();
    changed.columns.push(column("turnover", bulk_ingest_core::ColumnType::Float, true, false));
    assert!(matches!(service.register_schema(changed.clone()), Err(IngestError::Conflict(_))));

    changed.name = TableName::new("fresh");
    service.register_schema(changed.clone()).unwrap();
    changed.columns.pop();
    service.register_schema(changed).unwrap();
}

/// Verifies structural validation without a table.
#[test]
fn structural_validation_reports_counts() {
    let service = seeded();
    let rows = vec![
        json!({"a": 1, "b": 2}).as_object().cloned().unwrap(),
        json!({"a": 1}).as_object().cloned().unwrap(),
    ];
    let columns = vec!["a".to_string(), "b".to_string()];
    let report = service.validate(None, &rows, &columns).unwrap();
    assert_eq!(report.row_count, 2);
    assert_eq!(report.column_count, 2);
    assert!(!report.is_valid());
    assert_eq!(report.failures[0].row_index, 1);
    assert!(matches!(service.validate(None, &rows, &[]), Err(IngestError::Validation(_))));
}
