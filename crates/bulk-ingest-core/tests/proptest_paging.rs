// crates/bulk-ingest-core/tests/proptest_paging.rs
// ============================================================================
// Module: Paging Property-Based Tests
// Description: Property tests for pagination completeness and sort stability.
// Purpose: Detect dropped, duplicated, or reordered rows across page walks.
// ============================================================================

//! Property-based tests for pagination invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeMap;

use bulk_ingest_core::ImportRequest;
use bulk_ingest_core::QueryRequest;
use bulk_ingest_core::RowId;
use bulk_ingest_core::SortOrder;
use bulk_ingest_core::SortSpec;
use bulk_ingest_core::TableName;
use bulk_ingest_core::WriteMode;
use proptest::prelude::*;
use serde_json::json;

use crate::common::service;

fn walk_pages(
    service: &bulk_ingest_core::IngestService,
    page_size: usize,
    sort: Option<SortSpec>,
) -> Vec<RowId> {
    let mut ids = Vec::new();
    let mut page = 1;
    loop {
        let request = QueryRequest {
            table: TableName::new("daily"),
            filters: BTreeMap::new(),
            page,
            page_size,
            sort: sort.clone(),
        };
        let result = service.query(&request).unwrap();
        assert!(result.rows.len() <= page_size);
        if result.rows.is_empty() {
            break;
        }
        ids.extend(result.rows.iter().map(|record| record.id));
        page += 1;
    }
    ids
}

proptest! {
    #[test]
    fn pages_concatenate_to_stable_sorted_result(
        closes in prop::collection::vec(0_i64 .. 5, 1 .. 40),
        page_size in 1_usize .. 8,
        ascending in any::<bool>(),
    ) {
        let (service, _store) = service();
        let rows = closes
            .iter()
            .enumerate()
            .map(|(index, close)| {
                json!({"code": format!("C{index}"), "close": close}).as_object().cloned().unwrap()
            })
            .collect();
        let result = service
            .import(ImportRequest {
                table: TableName::new("daily"),
                mode: WriteMode::Insert,
                rows,
                columns: vec!["code".to_string(), "close".to_string()],
            })
            .unwrap();
        prop_assert_eq!(result.imported, closes.len());

        let order = if ascending { SortOrder::Ascending } else { SortOrder::Descending };
        let sort = SortSpec { column: "close".to_string(), order };
        let walked = walk_pages(&service, page_size, Some(sort));

        let mut expected: Vec<(i64, u64)> =
            closes.iter().zip(1_u64 ..).map(|(close, id)| (*close, id)).collect();
        expected.sort_by(|left, right| {
            let ordering = left.0.cmp(&right.0);
            if ascending { ordering } else { ordering.reverse() }
        });
        let expected: Vec<RowId> = expected.into_iter().map(|(_, id)| RowId::new(id)).collect();
        prop_assert_eq!(walked, expected);
    }

    #[test]
    fn unsorted_pages_follow_insertion_order(count in 1_usize .. 30, page_size in 1_usize .. 6) {
        let (service, _store) = service();
        let rows = (0 .. count)
            .map(|index| {
                json!({"code": format!("C{index}"), "close": "1"}).as_object().cloned().unwrap()
            })
            .collect();
        service
            .import(ImportRequest {
                table: TableName::new("daily"),
                mode: WriteMode::Insert,
                rows,
                columns: vec!["code".to_string(), "close".to_string()],
            })
            .unwrap();
        let walked = walk_pages(&service, page_size, None);
        let expected: Vec<RowId> =
            (1 ..= count).map(|id| RowId::new(u64::try_from(id).unwrap())).collect();
        prop_assert_eq!(walked, expected);
    }
}
