//! Cell values and row representation
//!
//! A cell is a number, a string, or absent. Rows are keyed by column name;
//! a field that is not present in the row and the literal `"undefined"`
//! marker are both treated as absent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Literal string marker that some sources use for missing cells
pub const UNDEFINED_MARKER: &str = "undefined";

/// A single cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Number(f64),
    Text(String),
    #[default]
    Absent,
}

/// A row maps column names to cell values
pub type DataRow = BTreeMap<String, Value>;

static ABSENT: Value = Value::Absent;

/// Look up a cell, treating a missing field as absent
pub fn cell<'a>(row: &'a DataRow, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&ABSENT)
}

impl Value {
    /// True for `Absent` and for the literal `"undefined"` marker
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Absent => true,
            Value::Text(s) => s == UNDEFINED_MARKER,
            Value::Number(_) => false,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.is_absent()
    }

    /// Coerce to a finite number.
    ///
    /// Numbers pass through if finite; strings are trimmed and parsed.
    /// Empty strings and anything non-finite do not coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Number(_) => None,
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            Value::Absent => None,
        }
    }

    /// Build a numeric cell, mapping non-finite results to absent
    pub fn from_number(n: f64) -> Self {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Absent
        }
    }

    /// Loose equality used to match declared missing values.
    ///
    /// Same-kind values compare directly; a number and a string compare
    /// numerically when the string parses as a number. Absent never matches.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_absent() || other.is_absent() {
            return false;
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Number(a), Value::Text(_)) => other.as_number() == Some(*a),
            (Value::Text(_), Value::Number(b)) => self.as_number() == Some(*b),
            _ => false,
        }
    }

    /// Hashable identity used for distinct-value counting.
    ///
    /// Numbers and strings never collide, so `5` and `"5"` are distinct.
    pub(crate) fn distinct_key(&self) -> Option<DistinctKey> {
        if self.is_absent() {
            return None;
        }
        match self {
            Value::Number(n) => Some(DistinctKey::Number(normalized_bits(*n))),
            Value::Text(s) => Some(DistinctKey::Text(s.clone())),
            Value::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum DistinctKey {
    Number(u64),
    Text(String),
}

/// Bit pattern of a float with `-0.0` folded into `0.0`
pub(crate) fn normalized_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else {
        n.to_bits()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Absent => write!(f, "{}", UNDEFINED_MARKER),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Absent)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) | Value::Absent => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::Null => Ok(Value::Absent),
            serde_json::Value::Number(n) => Ok(n.as_f64().map(Value::Number).unwrap_or_default()),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Bool(b) => Ok(Value::Text(b.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "unsupported cell value: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_marker_is_absent() {
        assert!(Value::from("undefined").is_absent());
        assert!(Value::Absent.is_absent());
        assert!(!Value::from("Undefined").is_absent());
    }

    #[test]
    fn test_loose_eq_mixes_numbers_and_strings() {
        assert!(Value::from(-99).loose_eq(&Value::from("-99")));
        assert!(Value::from(" -99 ").loose_eq(&Value::from(-99.0)));
        assert!(!Value::from("n/a").loose_eq(&Value::from(0)));
        assert!(!Value::from("").loose_eq(&Value::from(0)));
        assert!(!Value::Absent.loose_eq(&Value::Absent));
    }

    #[test]
    fn test_missing_field_reads_as_absent() {
        let row = DataRow::new();
        assert!(cell(&row, "age").is_absent());
    }

    #[test]
    fn test_json_round_trip_of_cells() {
        let row: DataRow = serde_json::from_str(r#"{"a": 1.5, "b": "x", "c": null}"#).unwrap();
        assert_eq!(row["a"], Value::Number(1.5));
        assert_eq!(row["b"], Value::from("x"));
        assert!(row["c"].is_absent());
    }
}
