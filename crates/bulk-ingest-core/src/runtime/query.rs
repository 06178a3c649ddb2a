// crates/bulk-ingest-core/src/runtime/query.rs
// ============================================================================
// Module: Bulk Ingest Query Engine
// Description: Filter, stable sort, and page over one table's rows.
// Purpose: Evaluate query requests against a scanned row set.
// Dependencies: serde_json, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Predicates are compiled once against the schema (unknown columns and
//! uncoercible operands fail before any row is read), then applied with AND
//! semantics. Sorting is stable over insertion order, so rows with equal sort
//! values keep their relative order in both directions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use crate::core::query::FilterOp;
use crate::core::query::FilterPredicate;
use crate::core::query::QueryPage;
use crate::core::query::QueryRequest;
use crate::core::query::Record;
use crate::core::query::SortOrder;
use crate::core::schema::ColumnDef;
use crate::core::schema::ColumnType;
use crate::core::schema::TableSchema;
use crate::core::value::Row;
use crate::core::value::Value;
use crate::interfaces::StoredRow;
use crate::runtime::coerce::coerce_value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Predicate resolved against a column's declared type.
#[derive(Debug, Clone, PartialEq)]
enum Matcher {
    /// Ordered comparison against a typed operand.
    Compare(FilterOp, Value),
    /// Substring match.
    Contains(String),
    /// Membership in a set of typed operands.
    In(Vec<Value>),
}

/// Matcher bound to a column.
#[derive(Debug, Clone, PartialEq)]
struct CompiledFilter {
    /// Column name.
    column: String,
    /// Resolved matcher.
    matcher: Matcher,
}

// ============================================================================
// SECTION: Query Execution
// ============================================================================

/// Runs `request` over `rows` (which must be in insertion order).
///
/// # Errors
///
/// Returns a reason when a filter or sort column is unknown or a filter
/// operand does not fit its column.
pub fn run_query(
    schema: &TableSchema,
    rows: Vec<StoredRow>,
    request: &QueryRequest,
) -> Result<QueryPage, String> {
    let filters = compile_filters(schema, request)?;
    if let Some(sort) = &request.sort
        && schema.column(&sort.column).is_none()
    {
        return Err(format!("unknown sort column `{}`", sort.column));
    }

    let mut matched: Vec<StoredRow> = rows
        .into_iter()
        .filter(|row| filters.iter().all(|filter| filter.matches(&row.values)))
        .collect();
    if let Some(sort) = &request.sort {
        matched.sort_by(|left, right| {
            let ordering =
                cell(&left.values, &sort.column).total_cmp(cell(&right.values, &sort.column));
            match sort.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    let total = matched.len();
    let offset =
        request.page_size.checked_mul(request.page.saturating_sub(1)).unwrap_or(usize::MAX);
    let rows = matched
        .into_iter()
        .skip(offset)
        .take(request.page_size)
        .map(|row| Record {
            id: row.id,
            values: row.values,
        })
        .collect();
    Ok(QueryPage {
        rows,
        total,
        page: request.page,
        page_size: request.page_size,
    })
}

/// Compiles every non-wildcard predicate.
fn compile_filters(
    schema: &TableSchema,
    request: &QueryRequest,
) -> Result<Vec<CompiledFilter>, String> {
    let mut filters = Vec::new();
    for (name, predicate) in &request.filters {
        if predicate.is_wildcard() {
            continue;
        }
        let column = schema.column(name).ok_or_else(|| format!("unknown filter column `{name}`"))?;
        let matcher = match predicate {
            FilterPredicate::Equals(raw) => Matcher::Compare(FilterOp::Eq, operand(column, raw)?),
            FilterPredicate::Op {
                op: FilterOp::Contains,
                value,
            } => {
                if !matches!(column.column_type, ColumnType::String | ColumnType::Date) {
                    return Err(format!(
                        "contains is not supported on {} column `{name}`",
                        column.column_type.label()
                    ));
                }
                let needle = value
                    .as_str()
                    .ok_or_else(|| format!("contains on `{name}` requires a string value"))?;
                Matcher::Contains(needle.to_string())
            }
            FilterPredicate::Op {
                op: FilterOp::In,
                value,
            } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("in on `{name}` requires an array value"))?;
                let values =
                    items.iter().map(|item| operand(column, item)).collect::<Result<Vec<_>, _>>()?;
                Matcher::In(values)
            }
            FilterPredicate::Op {
                op,
                value,
            } => Matcher::Compare(*op, operand(column, value)?),
        };
        filters.push(CompiledFilter {
            column: name.clone(),
            matcher,
        });
    }
    Ok(filters)
}

/// Coerces a filter operand to the column's type.
fn operand(column: &ColumnDef, raw: &serde_json::Value) -> Result<Value, String> {
    coerce_value(raw, column, true).map_err(|reason| format!("filter {reason}"))
}

/// Returns the cell for `column`, treating absent cells as null.
fn cell<'r>(row: &'r Row, column: &str) -> &'r Value {
    row.get(column).unwrap_or(&Value::Null)
}

impl CompiledFilter {
    /// Returns true when `row` satisfies the filter.
    fn matches(&self, row: &Row) -> bool {
        let value = cell(row, &self.column);
        match &self.matcher {
            Matcher::Contains(needle) => {
                value.as_str().is_some_and(|text| text.contains(needle.as_str()))
            }
            Matcher::In(options) => {
                options.iter().any(|option| value.total_cmp(option) == Ordering::Equal)
            }
            Matcher::Compare(op, operand) => {
                let ordering = value.total_cmp(operand);
                match op {
                    FilterOp::Eq => ordering == Ordering::Equal,
                    FilterOp::Ne => ordering != Ordering::Equal,
                    _ if value.is_null() || operand.is_null() => false,
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    FilterOp::Contains | FilterOp::In => false,
                }
            }
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

    use std::collections::BTreeMap;

    use serde_json::json;

    use super::run_query;
    use crate::core::identifiers::RowId;
    use crate::core::identifiers::TableName;
    use crate::core::query::FilterPredicate;
    use crate::core::query::QueryRequest;
    use crate::core::query::SortOrder;
    use crate::core::query::SortSpec;
    use crate::core::schema::ColumnDef;
    use crate::core::schema::ColumnType;
    use crate::core::schema::TableSchema;
    use crate::core::value::Row;
    use crate::core::value::Value;
    use crate::interfaces::StoredRow;

    fn schema() -> TableSchema {
        let column = |name: &str, column_type| ColumnDef {
            name: name.to_string(),
            column_type,
            nullable: true,
            unique: false,
        };
        TableSchema {
            name: TableName::new("quotes"),
            columns: vec![
                column("code", ColumnType::String),
                column("market", ColumnType::String),
                column("price", ColumnType::Float),
            ],
            key: Vec::new(),
            import_date_column: None,
            replace_same_day: false,
        }
    }

    fn rows() -> Vec<StoredRow> {
        [("A", "SH", 3.0), ("B", "SZ", 1.0), ("C", "SH", 3.0), ("D", "SH", 2.0)]
            .into_iter()
            .zip(1_u64..)
            .map(|((code, market, price), id)| {
                let mut values = Row::new();
                values.insert("code".to_string(), Value::String(code.to_string()));
                values.insert("market".to_string(), Value::String(market.to_string()));
                values.insert("price".to_string(), Value::Float(price));
                StoredRow {
                    id: RowId::new(id),
                    values,
                }
            })
            .collect()
    }

    fn request() -> QueryRequest {
        QueryRequest {
            table: TableName::new("quotes"),
            filters: BTreeMap::new(),
            page: 1,
            page_size: 20,
            sort: None,
        }
    }

    fn codes(page: &crate::core::query::QueryPage) -> Vec<String> {
        page.rows
            .iter()
            .map(|record| record.values.get("code").and_then(Value::as_str).unwrap().to_string())
            .collect()
    }

    /// Verifies equality filters and wildcards combine with AND.
    #[test]
    fn equality_filters_ignore_wildcards() {
        let mut request = request();
        request.filters.insert("market".to_string(), FilterPredicate::Equals(json!("SH")));
        request.filters.insert("code".to_string(), FilterPredicate::Equals(json!("all")));
        let page = run_query(&schema(), rows(), &request).unwrap();
        assert_eq!(codes(&page), vec!["A", "C", "D"]);
        assert_eq!(page.total, 3);
    }

    /// Verifies descending sort keeps ties in insertion order.
    #[test]
    fn descending_sort_is_stable() {
        let mut request = request();
        request.sort = Some(SortSpec {
            column: "price".to_string(),
            order: SortOrder::Descending,
        });
        let page = run_query(&schema(), rows(), &request).unwrap();
        assert_eq!(codes(&page), vec!["A", "C", "D", "B"]);
    }

    /// Verifies range operands are coerced to the column type.
    #[test]
    fn range_filters_coerce_operands() {
        let mut request = request();
        request.filters.insert(
            "price".to_string(),
            serde_json::from_value(json!({"op": "gte", "value": "2.5"})).unwrap(),
        );
        let page = run_query(&schema(), rows(), &request).unwrap();
        assert_eq!(codes(&page), vec!["A", "C"]);
    }

    /// Verifies a page past the end is empty with an accurate total.
    #[test]
    fn page_past_end_is_empty() {
        let mut request = request();
        request.page = 3;
        request.page_size = 2;
        let page = run_query(&schema(), rows(), &request).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 4);
    }

    /// Verifies unknown columns are rejected.
    #[test]
    fn unknown_columns_are_rejected() {
        let mut request = request();
        request.filters.insert("volume".to_string(), FilterPredicate::Equals(json!(1)));
        assert!(run_query(&schema(), rows(), &request).is_err());
        let mut request = self::request();
        request.sort = SortSpec::from_labels("volume", "asc").unwrap();
        assert!(run_query(&schema(), rows(), &request).is_err());
    }

    /// Verifies contains and in predicates.
    #[test]
    fn contains_and_in_predicates() {
        let mut request = request();
        request.filters.insert(
            "code".to_string(),
            serde_json::from_value(json!({"op": "in", "value": ["A", "B", "Z"]})).unwrap(),
        );
        request.filters.insert(
            "market".to_string(),
            serde_json::from_value(json!({"op": "contains", "value": "Z"})).unwrap(),
        );
        let page = run_query(&schema(), rows(), &request).unwrap();
        assert_eq!(codes(&page), vec!["B"]);
    }
}
