// crates/bulk-ingest-cli/src/filter_arg.rs
// ============================================================================
// Module: Filter Arguments
// Description: Parsing for repeated `--filter` query arguments.
// Purpose: Map compact command-line predicates onto core filter predicates.
// Dependencies: bulk-ingest-core
// ============================================================================

//! ## Overview
//! Accepted forms are `column=value` for equality and `column:op=value` where
//! `op` is one of `eq`, `ne`, `gt`, `gte`, `lt`, `lte`, `contains`, or `in`.
//! Values stay strings; the query engine coerces them to the column type. An
//! `in` value is a comma-separated list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use bulk_ingest_core::FilterOp;
use bulk_ingest_core::FilterPredicate;
use serde_json::Value;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses one `--filter` argument into a column and predicate.
///
/// # Errors
///
/// Returns a message when the argument has no `=`, names no column, or uses
/// an unknown operator.
pub fn parse_filter(arg: &str) -> Result<(String, FilterPredicate), String> {
    let Some((target, value)) = arg.split_once('=') else {
        return Err(format!("filter `{arg}` must look like column=value"));
    };
    let (column, op) = match target.split_once(':') {
        Some((column, op)) => (column.trim(), Some(parse_op(op.trim())?)),
        None => (target.trim(), None),
    };
    if column.is_empty() {
        return Err(format!("filter `{arg}` must name a column"));
    }
    let predicate = match op {
        None => FilterPredicate::Equals(Value::String(value.to_string())),
        Some(FilterOp::In) => FilterPredicate::Op {
            op: FilterOp::In,
            value: Value::Array(
                value.split(',').map(|item| Value::String(item.trim().to_string())).collect(),
            ),
        },
        Some(op) => FilterPredicate::Op {
            op,
            value: Value::String(value.to_string()),
        },
    };
    Ok((column.to_string(), predicate))
}

/// Parses all `--filter` arguments, rejecting repeated columns.
///
/// # Errors
///
/// Returns a message for the first malformed or repeated filter.
pub fn parse_filters(args: &[String]) -> Result<BTreeMap<String, FilterPredicate>, String> {
    let mut filters = BTreeMap::new();
    for arg in args {
        let (column, predicate) = parse_filter(arg)?;
        if filters.insert(column.clone(), predicate).is_some() {
            return Err(format!("column `{column}` is filtered more than once"));
        }
    }
    Ok(filters)
}

/// Maps an operator label to a comparator.
fn parse_op(label: &str) -> Result<FilterOp, String> {
    match label {
        "eq" => Ok(FilterOp::Eq),
        "ne" => Ok(FilterOp::Ne),
        "gt" => Ok(FilterOp::Gt),
        "gte" => Ok(FilterOp::Gte),
        "lt" => Ok(FilterOp::Lt),
        "lte" => Ok(FilterOp::Lte),
        "contains" => Ok(FilterOp::Contains),
        "in" => Ok(FilterOp::In),
        other => Err(format!("unknown filter operator `{other}`")),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
