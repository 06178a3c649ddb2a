// crates/bulk-ingest-core/src/runtime/coerce.rs
// ============================================================================
// Module: Bulk Ingest Value Coercion
// Description: Converts raw JSON cells into typed values per column type.
// Purpose: Apply one set of coercion rules to imported cells and filter operands.
// Dependencies: serde_json, crate::core
// ============================================================================

//! ## Overview
//! CSV-derived rows arrive mostly as strings, so every declared type accepts
//! its textual form. Whitespace-only strings are null for nullable columns.
//! Arrays and objects are never accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Number;

use crate::core::schema::ColumnDef;
use crate::core::schema::ColumnType;
use crate::core::time::format_date;
use crate::core::time::parse_date;
use crate::core::value::Value;

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Coerces a raw cell into the column's declared type.
///
/// # Errors
///
/// Returns a human-readable reason when the cell cannot be coerced.
pub fn coerce_value(
    raw: &serde_json::Value,
    column: &ColumnDef,
    accepts_null: bool,
) -> Result<Value, String> {
    match raw {
        serde_json::Value::Null => {
            if accepts_null {
                Ok(Value::Null)
            } else {
                Err(format!("column `{}` is not nullable", column.name))
            }
        }
        serde_json::Value::String(text) if text.trim().is_empty() => {
            if accepts_null {
                Ok(Value::Null)
            } else {
                Err(format!("column `{}` is not nullable and the value is blank", column.name))
            }
        }
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(format!(
            "column `{}` expects a {} scalar, got a nested value",
            column.name,
            column.column_type.label()
        )),
        scalar => coerce_scalar(scalar, column.column_type)
            .ok_or_else(|| mismatch(column, scalar)),
    }
}

/// Coerces a non-null, non-blank scalar.
fn coerce_scalar(raw: &serde_json::Value, column_type: ColumnType) -> Option<Value> {
    match column_type {
        ColumnType::String => match raw {
            serde_json::Value::String(text) => Some(Value::String(text.clone())),
            serde_json::Value::Number(number) => Some(Value::String(number.to_string())),
            serde_json::Value::Bool(flag) => Some(Value::String(flag.to_string())),
            _ => None,
        },
        ColumnType::Integer => match raw {
            serde_json::Value::Number(number) => integer_from_number(number).map(Value::Integer),
            serde_json::Value::String(text) => text.trim().parse::<i64>().ok().map(Value::Integer),
            _ => None,
        },
        ColumnType::Float => match raw {
            serde_json::Value::Number(number) => number.as_f64().map(float_value),
            serde_json::Value::String(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(float_value),
            _ => None,
        },
        ColumnType::Boolean => match raw {
            serde_json::Value::Bool(flag) => Some(Value::Bool(*flag)),
            serde_json::Value::Number(number) => match number.as_u64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            serde_json::Value::String(text) => {
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Some(Value::Bool(true)),
                    "false" | "0" | "no" => Some(Value::Bool(false)),
                    _ => None,
                }
            }
            _ => None,
        },
        ColumnType::Date => match raw {
            serde_json::Value::String(text) => {
                parse_date(text.trim()).map(|date| Value::String(format_date(date)))
            }
            _ => None,
        },
    }
}

/// Accepts integral JSON numbers, including floats with a zero fraction.
fn integer_from_number(number: &Number) -> Option<i64> {
    if let Some(value) = number.as_i64() {
        return Some(value);
    }
    let value = number.as_f64()?;
    if value.fract() != 0.0 {
        return None;
    }
    format!("{value:.0}").parse::<i64>().ok()
}

/// Wraps a float, folding `-0.0` into `0.0` so both share one key and ordering.
fn float_value(value: f64) -> Value {
    if value == 0.0 { Value::Float(0.0) } else { Value::Float(value) }
}

/// Builds the type mismatch reason.
fn mismatch(column: &ColumnDef, raw: &serde_json::Value) -> String {
    format!("column `{}` expects {}, got {raw}", column.name, column.column_type.label())
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

    use super::coerce_value;
    use crate::core::schema::ColumnDef;
    use crate::core::schema::ColumnType;
    use crate::core::value::Value;

    fn column(column_type: ColumnType) -> ColumnDef {
        ColumnDef {
            name: "cell".to_string(),
            column_type,
            nullable: true,
            unique: false,
        }
    }

    #[test]
    fn csv_strings_coerce_to_declared_types() {
        assert_eq!(
            coerce_value(&json!(" 42 "), &column(ColumnType::Integer), true).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            coerce_value(&json!("12.5"), &column(ColumnType::Float), true).unwrap(),
            Value::Float(12.5)
        );
        assert_eq!(
            coerce_value(&json!("Yes"), &column(ColumnType::Boolean), true).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            coerce_value(&json!("2024-03-01"), &column(ColumnType::Date), true).unwrap(),
            Value::String("2024-03-01".to_string())
        );
    }

    #[test]
    fn integral_floats_become_integers() {
        assert_eq!(
            coerce_value(&json!(7.0), &column(ColumnType::Integer), true).unwrap(),
            Value::Integer(7)
        );
        assert!(coerce_value(&json!(7.5), &column(ColumnType::Integer), true).is_err());
    }

    #[test]
    fn blank_strings_are_null_or_rejected() {
        assert_eq!(
            coerce_value(&json!("  "), &column(ColumnType::Float), true).unwrap(),
            Value::Null
        );
        assert_eq!(
            coerce_value(&json!(""), &column(ColumnType::String), true).unwrap(),
            Value::Null
        );
        assert!(coerce_value(&json!(""), &column(ColumnType::Float), false).is_err());
        let reason = coerce_value(&json!(" "), &column(ColumnType::String), false).unwrap_err();
        assert!(reason.contains("blank"));
    }

    #[test]
    fn negative_zero_folds_into_zero() {
        let value = coerce_value(&json!("-0.0"), &column(ColumnType::Float), true).unwrap();
        assert_eq!(value.total_cmp(&Value::Float(0.0)), std::cmp::Ordering::Equal);
        let Value::Float(inner) = coerce_value(&json!(-0.0), &column(ColumnType::Float), true)
            .unwrap()
        else {
            panic!("expected a float");
        };
        assert!(inner.is_sign_positive());
    }

    #[test]
    fn rejects_non_numeric_and_nested_values() {
        let reason = coerce_value(&json!("abc"), &column(ColumnType::Float), true).unwrap_err();
        assert!(reason.contains("expects float"));
        assert!(coerce_value(&json!([1]), &column(ColumnType::String), true).is_err());
        assert!(coerce_value(&json!("NaN"), &column(ColumnType::Float), true).is_err());
        assert!(coerce_value(&json!("2023-02-30"), &column(ColumnType::Date), true).is_err());
    }
}
