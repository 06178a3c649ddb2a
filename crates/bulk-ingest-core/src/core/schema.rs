// crates/bulk-ingest-core/src/core/schema.rs
// ============================================================================
// Module: Bulk Ingest Table Schemas
// Description: Column definitions, key columns, and uniqueness constraints.
// Purpose: Describe which rows a destination table accepts.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`TableSchema`] is an ordered list of [`ColumnDef`] entries plus the key
//! columns used to match existing records for `update` and `upsert`. Key
//! columns are implicitly unique and non-null. Schemas are validated once at
//! registration and treated as immutable afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TableName;
use crate::core::value::Row;
use crate::core::value::Value;
use crate::core::value::canonical_key;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum table name length in bytes.
pub const MAX_TABLE_NAME_BYTES: usize = 128;
/// Maximum column name length in bytes.
pub const MAX_COLUMN_NAME_BYTES: usize = 128;
/// Maximum number of columns per table.
pub const MAX_COLUMNS: usize = 512;
/// Prefix reserved for service-provided record fields (for example `_id`).
pub const RESERVED_COLUMN_PREFIX: char = '_';

// ============================================================================
// SECTION: Types
// ============================================================================

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Finite 64-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// Calendar date stored as `YYYY-MM-DD`.
    Date,
}

impl ColumnType {
    /// Returns the stable label for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

/// Single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether null values are accepted (key columns never are).
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether values must be unique across the table.
    #[serde(default)]
    pub unique: bool,
}

/// Columns default to nullable.
const fn default_nullable() -> bool {
    true
}

/// Destination table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSchema {
    /// Table name.
    pub name: TableName,
    /// Ordered column definitions.
    pub columns: Vec<ColumnDef>,
    /// Key columns matched by `update` and `upsert`.
    #[serde(default)]
    pub key: Vec<String>,
    /// Column stamped with the import date on every imported row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_date_column: Option<String>,
    /// Whether an import replaces rows already stamped with the same date.
    #[serde(default)]
    pub replace_same_day: bool,
}

/// Uniqueness constraint derived from a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Constrained columns, in key order.
    pub columns: Vec<String>,
    /// True when this is the table key.
    pub is_key: bool,
}

impl UniqueConstraint {
    /// Human-readable column list, e.g. `` `code`, `day` ``.
    #[must_use]
    pub fn label(&self) -> String {
        self.columns.iter().map(|column| format!("`{column}`")).collect::<Vec<_>>().join(", ")
    }

    /// Returns the index key for `row`, or `None` when any column is null or
    /// absent (nulls never collide).
    #[must_use]
    pub fn key_of(&self, row: &Row) -> Option<String> {
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match row.get(column) {
                None | Some(Value::Null) => return None,
                Some(value) => values.push(value),
            }
        }
        Some(canonical_key(values))
    }

    /// Renders the constrained values of `row` for messages.
    #[must_use]
    pub fn describe(&self, row: &Row) -> String {
        self.columns
            .iter()
            .map(|column| {
                row.get(column).map_or(serde_json::Value::Null, Value::to_json).to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

impl TableSchema {
    /// Looks up a column definition by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns true when `name` is one of the key columns.
    #[must_use]
    pub fn is_key_column(&self, name: &str) -> bool {
        self.key.iter().any(|key| key == name)
    }

    /// Returns true when the column accepts nulls.
    #[must_use]
    pub fn accepts_null(&self, column: &ColumnDef) -> bool {
        column.nullable && !self.is_key_column(&column.name)
    }

    /// Returns true when the schema declares key columns.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    /// Returns true when `name` is filled in by the service on import.
    #[must_use]
    pub fn is_service_column(&self, name: &str) -> bool {
        self.import_date_column.as_deref() == Some(name)
    }

    /// Returns the key constraint (if any) followed by single-column unique
    /// constraints.
    #[must_use]
    pub fn unique_constraints(&self) -> Vec<UniqueConstraint> {
        let mut constraints = Vec::new();
        if self.has_key() {
            constraints.push(UniqueConstraint {
                columns: self.key.clone(),
                is_key: true,
            });
        }
        for column in &self.columns {
            let is_sole_key = self.key.len() == 1 && self.key[0] == column.name;
            if column.unique && !is_sole_key {
                constraints.push(UniqueConstraint {
                    columns: vec![column.name.clone()],
                    is_key: false,
                });
            }
        }
        constraints
    }

    /// Validates the schema definition.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the definition is malformed.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(SchemaError::Invalid("table name must be non-empty".to_string()));
        }
        if name.len() > MAX_TABLE_NAME_BYTES {
            return Err(SchemaError::Invalid(format!(
                "table name exceeds {MAX_TABLE_NAME_BYTES} bytes"
            )));
        }
        if self.name.is_reserved() {
            return Err(SchemaError::Invalid(format!("table name `{name}` is reserved")));
        }
        if self.columns.is_empty() {
            return Err(SchemaError::Invalid(format!("table `{name}` declares no columns")));
        }
        if self.columns.len() > MAX_COLUMNS {
            return Err(SchemaError::Invalid(format!(
                "table `{name}` exceeds {MAX_COLUMNS} columns"
            )));
        }
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            validate_column_name(name, &column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::Invalid(format!(
                    "table `{name}` declares column `{}` twice",
                    column.name
                )));
            }
        }
        let mut key_seen = BTreeSet::new();
        for key in &self.key {
            if self.column(key).is_none() {
                return Err(SchemaError::Invalid(format!(
                    "table `{name}` key references unknown column `{key}`"
                )));
            }
            if !key_seen.insert(key.as_str()) {
                return Err(SchemaError::Invalid(format!(
                    "table `{name}` key lists column `{key}` twice"
                )));
            }
        }
        if let Some(date_column) = &self.import_date_column {
            let Some(column) = self.column(date_column) else {
                return Err(SchemaError::Invalid(format!(
                    "table `{name}` import_date_column references unknown column `{date_column}`"
                )));
            };
            if !matches!(column.column_type, ColumnType::Date | ColumnType::String) {
                return Err(SchemaError::Invalid(format!(
                    "table `{name}` import_date_column `{date_column}` must be a date or string \
                     column"
                )));
            }
        } else if self.replace_same_day {
            return Err(SchemaError::Invalid(format!(
                "table `{name}` replace_same_day requires import_date_column"
            )));
        }
        Ok(())
    }
}

/// Validates a single column name.
fn validate_column_name(table: &str, column: &str) -> Result<(), SchemaError> {
    if column.trim().is_empty() {
        return Err(SchemaError::Invalid(format!("table `{table}` has an empty column name")));
    }
    if column.len() > MAX_COLUMN_NAME_BYTES {
        return Err(SchemaError::Invalid(format!(
            "table `{table}` column name exceeds {MAX_COLUMN_NAME_BYTES} bytes"
        )));
    }
    if column.starts_with(RESERVED_COLUMN_PREFIX) {
        return Err(SchemaError::Invalid(format!(
            "table `{table}` column `{column}` uses the reserved `_` prefix"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema definition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Schema definition is malformed.
    #[error("invalid schema: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
