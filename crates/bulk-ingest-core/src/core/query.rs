// crates/bulk-ingest-core/src/core/query.rs
// ============================================================================
// Module: Bulk Ingest Queries
// Description: Filter predicates, sort specifications, and result pages.
// Purpose: Model filter/sort/paginate requests and their bounded results.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Filters map column names to predicates. A bare JSON scalar means equality;
//! an object `{"op": ..., "value": ...}` selects another comparator. Bare
//! predicates whose value is `null`, `""` or `"all"` are wildcards, so form
//! fields left at their default do not constrain the result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RowId;
use crate::core::identifiers::TableName;
use crate::core::value::Row;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Filter value treated as "no constraint".
pub const WILDCARD_FILTER_VALUE: &str = "all";
/// Field name carrying the stored row identifier in query records.
pub const RECORD_ID_FIELD: &str = "_id";

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Filter comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Substring match on string columns.
    Contains,
    /// Membership in a list of values.
    In,
}

/// Predicate applied to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterPredicate {
    /// Explicit comparator.
    Op {
        /// Comparator.
        op: FilterOp,
        /// Operand (an array for [`FilterOp::In`]).
        value: serde_json::Value,
    },
    /// Bare value: equality.
    Equals(serde_json::Value),
}

impl FilterPredicate {
    /// Returns true when the predicate places no constraint.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Op {
                ..
            } => false,
            Self::Equals(serde_json::Value::Null) => true,
            Self::Equals(serde_json::Value::String(value)) => {
                value.is_empty() || value == WILDCARD_FILTER_VALUE
            }
            Self::Equals(_) => false,
        }
    }
}

// ============================================================================
// SECTION: Sorting
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortOrder {
    /// Parses an order label.
    ///
    /// An empty label resolves to descending, matching clients that only send
    /// `"ascending"` explicitly.
    ///
    /// # Errors
    ///
    /// Returns a message when the label is not recognized.
    pub fn parse_label(label: &str) -> Result<Self, String> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" | "" => Ok(Self::Descending),
            other => Err(format!("invalid sort order: {other}")),
        }
    }
}

/// Column plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column to sort by.
    pub column: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Resolves the `(sort, order)` request pair. An empty column means
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns a message when the order label is invalid.
    pub fn from_labels(sort: &str, order: &str) -> Result<Option<Self>, String> {
        let column = sort.trim();
        if column.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            column: column.to_string(),
            order: SortOrder::parse_label(order)?,
        }))
    }
}

// ============================================================================
// SECTION: Requests and Pages
// ============================================================================

/// Filter/sort/paginate request for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Table to query.
    pub table: TableName,
    /// Column predicates combined with AND.
    pub filters: BTreeMap<String, FilterPredicate>,
    /// One-based page number.
    pub page: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Optional sort.
    pub sort: Option<SortSpec>,
}

/// Stored record returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stored row identifier.
    pub id: RowId,
    /// Column values.
    pub values: Row,
}

impl Record {
    /// Renders the record as a JSON object with the `_id` field.
    #[must_use]
    pub fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut object = serde_json::Map::new();
        object.insert(RECORD_ID_FIELD.to_string(), serde_json::Value::String(self.id.to_string()));
        for (column, value) in &self.values {
            object.insert(column.clone(), value.to_json());
        }
        object
    }
}

/// One page of a filtered, sorted result set.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    /// Records on this page (at most `page_size`).
    pub rows: Vec<Record>,
    /// Total matches before slicing.
    pub total: usize,
    /// One-based page number.
    pub page: usize,
    /// Requested page size.
    pub page_size: usize,
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

    use super::FilterOp;
    use super::FilterPredicate;
    use super::SortOrder;
    use super::SortSpec;

    #[test]
    fn bare_scalars_parse_as_equality() {
        let predicate: FilterPredicate = serde_json::from_value(json!("SH600000")).unwrap();
        assert_eq!(predicate, FilterPredicate::Equals(json!("SH600000")));
    }

    #[test]
    fn op_objects_parse_as_comparators() {
        let predicate: FilterPredicate =
            serde_json::from_value(json!({"op": "gte", "value": 10})).unwrap();
        assert_eq!(
            predicate,
            FilterPredicate::Op {
                op: FilterOp::Gte,
                value: json!(10),
            }
        );
    }

    #[test]
    fn empty_null_and_all_are_wildcards() {
        assert!(FilterPredicate::Equals(json!(null)).is_wildcard());
        assert!(FilterPredicate::Equals(json!("")).is_wildcard());
        assert!(FilterPredicate::Equals(json!("all")).is_wildcard());
        assert!(!FilterPredicate::Equals(json!(0)).is_wildcard());
    }

    #[test]
    fn empty_order_with_sort_column_is_descending() {
        let spec = SortSpec::from_labels("price", "").unwrap().unwrap();
        assert_eq!(spec.order, SortOrder::Descending);
        assert!(SortSpec::from_labels("", "ascending").unwrap().is_none());
        assert!(SortSpec::from_labels("price", "sideways").is_err());
    }
}
