// crates/bulk-ingest-core/src/runtime/validator.rs
// ============================================================================
// Module: Bulk Ingest Validator
// Description: Batch-level and per-row checks run before any mutation.
// Purpose: Split a raw batch into typed rows and per-row failures.
// Dependencies: serde_json, crate::core
// ============================================================================

//! ## Overview
//! Validation never touches storage. Batch-level problems (column list,
//! write mode) reject the whole request; row-level problems are collected
//! exhaustively and reported per row. Each row goes through three checks in
//! order: column presence, type coercion, and uniqueness within the batch.
//! Rows that fail an earlier check never reach a later one, so a malformed
//! row cannot claim a key and push a later valid row into a duplicate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::core::batch::RawRow;
use crate::core::batch::RowFailure;
use crate::core::batch::WriteMode;
use crate::core::schema::TableSchema;
use crate::core::value::Row;
use crate::core::value::Value;
use crate::runtime::coerce::coerce_value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Output of row validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedBatch {
    /// Typed rows with their batch positions, in batch order.
    pub accepted: Vec<(usize, Row)>,
    /// Per-row failures, in batch order.
    pub failures: Vec<RowFailure>,
}

// ============================================================================
// SECTION: Batch Checks
// ============================================================================

/// Checks the declared column list against the schema and write mode.
///
/// # Errors
///
/// Returns a reason when the batch cannot be validated row by row.
pub fn check_batch_shape(
    schema: &TableSchema,
    columns: &[String],
    mode: WriteMode,
) -> Result<(), String> {
    check_column_list(columns)?;
    for column in columns {
        if schema.column(column).is_none() {
            return Err(format!("column `{column}` is not declared by table `{}`", schema.name));
        }
    }
    if mode == WriteMode::Update && !schema.has_key() {
        return Err(format!(
            "table `{}` declares no key columns; update is not possible",
            schema.name
        ));
    }
    if mode != WriteMode::Insert {
        for key in &schema.key {
            if !schema.is_service_column(key) && !columns.contains(key) {
                return Err(format!("{mode} requires key column `{key}` in columns"));
            }
        }
    }
    Ok(())
}

/// Checks that the column list is non-empty and free of duplicates.
///
/// # Errors
///
/// Returns a reason when the list is empty or repeats a name.
pub fn check_column_list(columns: &[String]) -> Result<(), String> {
    if columns.is_empty() {
        return Err("columns must be non-empty".to_string());
    }
    let mut seen = BTreeSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(format!("column `{column}` is listed twice"));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Row Checks
// ============================================================================

/// Validates every row against `schema`.
///
/// `import_date` is stamped into the schema's import date column on each
/// accepted row before uniqueness is checked, so date-scoped keys behave the
/// same here as in storage.
#[must_use]
pub fn validate_rows(
    schema: &TableSchema,
    rows: &[RawRow],
    columns: &[String],
    mode: WriteMode,
    import_date: Option<&str>,
) -> ValidatedBatch {
    let mut batch = ValidatedBatch::default();
    let constraints = schema.unique_constraints();
    let mut seen: Vec<HashMap<String, usize>> = vec![HashMap::new(); constraints.len()];

    for (row_index, raw) in rows.iter().enumerate() {
        let mut row = match typed_row(schema, raw, columns, mode) {
            Ok(row) => row,
            Err(reasons) => {
                batch.failures.push(RowFailure::validation(row_index, reasons.join("; ")));
                continue;
            }
        };
        if let (Some(column), Some(date)) = (&schema.import_date_column, import_date) {
            row.insert(column.clone(), Value::String(date.to_string()));
        }

        let keys: Vec<Option<String>> =
            constraints.iter().map(|constraint| constraint.key_of(&row)).collect();
        let mut duplicates = Vec::new();
        for ((constraint, key), index) in constraints.iter().zip(&keys).zip(&seen) {
            if let Some(first) = key.as_ref().and_then(|key| index.get(key)) {
                duplicates.push(format!(
                    "duplicate value for {} ({}) also in row {first}",
                    constraint.label(),
                    constraint.describe(&row)
                ));
            }
        }
        if !duplicates.is_empty() {
            batch.failures.push(RowFailure::validation(row_index, duplicates.join("; ")));
            continue;
        }
        for (key, index) in keys.into_iter().zip(seen.iter_mut()) {
            if let Some(key) = key {
                index.insert(key, row_index);
            }
        }
        batch.accepted.push((row_index, row));
    }
    batch
}

/// Runs the presence and type checks for one row.
fn typed_row(
    schema: &TableSchema,
    raw: &RawRow,
    columns: &[String],
    mode: WriteMode,
) -> Result<Row, Vec<String>> {
    let mut reasons = presence_reasons(raw, columns);
    if mode != WriteMode::Update {
        for column in &schema.columns {
            if !schema.accepts_null(column)
                && !schema.is_service_column(&column.name)
                && !columns.contains(&column.name)
            {
                reasons.push(format!("required column `{}` is not supplied", column.name));
            }
        }
    }

    let mut row = Row::new();
    for name in columns {
        let (Some(raw_value), Some(column)) = (raw.get(name), schema.column(name)) else {
            continue;
        };
        match coerce_value(raw_value, column, schema.accepts_null(column)) {
            Ok(value) => {
                row.insert(name.clone(), value);
            }
            Err(reason) => reasons.push(reason),
        }
    }

    if reasons.is_empty() { Ok(row) } else { Err(reasons) }
}

/// Reports listed columns missing from `raw` and fields outside `columns`.
fn presence_reasons(raw: &RawRow, columns: &[String]) -> Vec<String> {
    let mut reasons = Vec::new();
    for column in columns {
        if !raw.contains_key(column) {
            reasons.push(format!("missing column `{column}`"));
        }
    }
    for field in raw.keys() {
        if !columns.contains(field) {
            reasons.push(format!("unexpected column `{field}`"));
        }
    }
    reasons
}

// ============================================================================
// SECTION: Structural Checks
// ============================================================================

/// Checks that every row carries exactly the listed columns, without a schema.
#[must_use]
pub fn validate_structure(rows: &[RawRow], columns: &[String]) -> Vec<RowFailure> {
    rows.iter()
        .enumerate()
        .filter_map(|(row_index, raw)| {
            let reasons = presence_reasons(raw, columns);
            (!reasons.is_empty()).then(|| RowFailure::validation(row_index, reasons.join("; ")))
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
