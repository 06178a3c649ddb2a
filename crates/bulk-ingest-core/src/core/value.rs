// crates/bulk-ingest-core/src/core/value.rs
// ============================================================================
// Module: Bulk Ingest Values
// Description: Tagged scalar values stored in table rows.
// Purpose: Replace untyped row payloads with a closed set of scalar variants.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every stored cell is a [`Value`]: null, boolean, integer, float, or
//! string. Values serialize as plain JSON scalars. [`Value::total_cmp`]
//! defines the total order used for sorting and range predicates:
//! null < booleans < numbers < strings, with integers and floats compared
//! numerically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stored row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Integer(i64),
    /// Finite floating-point value.
    Float(f64),
    /// String value (also used for dates in `YYYY-MM-DD` form).
    String(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string payload when this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Converts the value into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Integer(value) => serde_json::Value::Number(Number::from(*value)),
            Self::Float(value) => {
                Number::from_f64(*value).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Self::String(value) => serde_json::Value::String(value.clone()),
        }
    }

    /// Total ordering across all variants.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::String(left), Self::String(right)) => left.cmp(right),
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                self.as_f64().total_cmp(&other.as_f64())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Returns the variant rank used to order mixed-type comparisons.
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
        }
    }

    /// Numeric view for cross-type number comparisons.
    #[allow(clippy::cast_precision_loss, reason = "Ordering tolerates i64 -> f64 rounding.")]
    fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(value) => *value as f64,
            Self::Float(value) => *value,
            _ => 0.0,
        }
    }

    /// Appends an unambiguous encoding of the value to `out`.
    ///
    /// Strings are length-prefixed so composite keys cannot collide.
    fn write_key_fragment(&self, out: &mut String) {
        match self {
            Self::Null => out.push('n'),
            Self::Bool(value) => {
                let _ = write!(out, "b{value}");
            }
            Self::Integer(value) => {
                let _ = write!(out, "i{value}");
            }
            Self::Float(value) => {
                let _ = write!(out, "f{}", value.to_bits());
            }
            Self::String(value) => {
                let _ = write!(out, "s{}:{value}", value.len());
            }
        }
    }
}

/// Builds the canonical index key for an ordered list of values.
#[must_use]
pub fn canonical_key<'a>(values: impl IntoIterator<Item = &'a Value>) -> String {
    let mut out = String::new();
    for (index, value) in values.into_iter().enumerate() {
        if index > 0 {
            out.push('|');
        }
        value.write_key_fragment(&mut out);
    }
    out
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

    use std::cmp::Ordering;

    use super::Value;
    use super::canonical_key;

    #[test]
    fn numbers_compare_across_integer_and_float() {
        assert_eq!(Value::Integer(2).total_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.0).total_cmp(&Value::Integer(3)), Ordering::Equal);
    }

    #[test]
    fn null_sorts_before_every_other_variant() {
        for value in [
            Value::Bool(false),
            Value::Integer(i64::MIN),
            Value::Float(-1.0e300),
            Value::String(String::new()),
        ] {
            assert_eq!(Value::Null.total_cmp(&value), Ordering::Less);
        }
    }

    #[test]
    fn composite_keys_do_not_collide_on_separator() {
        let left = canonical_key([&Value::String("a|s1:b".to_string())]);
        let right =
            canonical_key([&Value::String("a".to_string()), &Value::String("b".to_string())]);
        assert_ne!(left, right);
    }

    #[test]
    fn values_deserialize_from_plain_json_scalars() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 7, 7.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Integer(7),
                Value::Float(7.5),
                Value::String("x".to_string()),
            ]
        );
    }
}
