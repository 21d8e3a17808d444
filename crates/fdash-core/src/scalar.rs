#![forbid(unsafe_code)]

//! Scalar option values.
//!
//! A [`Scalar`] is the value half of a `(label, value)` option pair. It is a
//! string, a number, or a boolean. JSON `null` is not a scalar:
//! `null` is how a single-select control spells "no selection".

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A string, number, or boolean option value.
///
/// Serialized untagged, so `Scalar::String("NYC")` round-trips as `"NYC"`.
/// Numbers compare by numeric value: `1` and `1.0` are the same option value.
/// Kinds never alias, so `1`, `"1"` and `true` stay distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Convert a JSON value into a scalar. Returns `None` for `null`,
    /// arrays, and objects.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// True for the empty string, which is a real value distinct from `null`.
    #[must_use]
    pub fn is_empty_string(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Numeric identity of a JSON number. Integral floats collapse onto the
/// integer they equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NumberKey {
    Integer(i128),
    Float(u64),
}

// 2^64, the first integral f64 outside the u64 range.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

fn number_key(n: &Number) -> NumberKey {
    if let Some(i) = n.as_i64() {
        return NumberKey::Integer(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return NumberKey::Integer(i128::from(u));
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < U64_BOUND {
        return NumberKey::Integer(f as i128);
    }
    NumberKey::Float(f.to_bits())
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => number_key(a) == number_key(b),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(b) => b.hash(state),
            Self::Number(n) => number_key(n).hash(state),
            Self::String(s) => s.hash(state),
        }
    }
}

/// Text form used for default labels and search matching.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn null_and_containers_are_not_scalars() {
        assert_eq!(Scalar::from_json(&Value::Null), None);
        assert_eq!(Scalar::from_json(&json!([1])), None);
        assert_eq!(Scalar::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn json_round_trip_keeps_kind() {
        for raw in [json!("NYC"), json!(3), json!(2.5), json!(true), json!("")] {
            let scalar = Scalar::from_json(&raw).expect("scalar");
            assert_eq!(scalar.to_json(), raw);
        }
    }

    #[test]
    fn empty_string_is_a_value() {
        let empty = Scalar::from("");
        assert!(empty.is_empty_string());
        assert_eq!(Scalar::from_json(&json!("")), Some(empty));
    }

    #[test]
    fn integral_float_equals_integer() {
        let int = Scalar::from_json(&json!(1)).expect("int");
        let float = Scalar::from_json(&json!(1.0)).expect("float");
        assert_eq!(int, float);

        let mut seen = HashSet::new();
        seen.insert(int);
        assert!(seen.contains(&float));

        assert_ne!(float, Scalar::from_json(&json!(1.5)).expect("fraction"));
        assert_ne!(Scalar::from(1_i64), Scalar::from("1"));
        assert_eq!(
            Scalar::from_json(&json!(-0.0)).expect("neg zero"),
            Scalar::from(0_i64)
        );
        assert_eq!(Scalar::from(u64::MAX), Scalar::from_json(&json!(u64::MAX)).expect("max"));
    }

    #[test]
    fn display_is_plain_text() {
        assert_eq!(Scalar::from("MTL").to_string(), "MTL");
        assert_eq!(Scalar::from(7_i64).to_string(), "7");
        assert_eq!(Scalar::from(false).to_string(), "false");
    }

    #[test]
    fn untagged_serde_matches_plain_json() {
        let parsed: Scalar = serde_json::from_str("\"SF\"").expect("parse");
        assert_eq!(parsed, Scalar::from("SF"));
        let parsed: Scalar = serde_json::from_str("42").expect("parse");
        assert_eq!(parsed, Scalar::from(42_i64));
        assert_eq!(serde_json::to_string(&Scalar::from(true)).expect("ser"), "true");
    }
}
