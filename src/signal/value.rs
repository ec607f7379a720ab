//! Raw values carried by hardware signals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw value read from or written to a signal.
///
/// Numeric variants compare by value across kinds, so `Int(1)`,
/// `Float(1.0)` and `Bool(true)` all match each other. Rule tables keyed on
/// integers therefore still match readbacks that arrive as floats.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    /// Integer view of the value. Floats only convert when integral.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by flag signals (interlocks, coupling bits).
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            other => other.as_f64().is_some_and(|v| v != 0.0),
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Text(_), _) | (_, Self::Text(_)) => false,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(i), Self::Bool(b)) | (Self::Bool(b), Self::Int(i)) => *i == i64::from(*b),
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for RawValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_kinds_compare_by_value() {
        assert_eq!(RawValue::Int(1), RawValue::Float(1.0));
        assert_eq!(RawValue::Bool(true), RawValue::Int(1));
        assert_eq!(RawValue::Bool(false), RawValue::Float(0.0));
        assert_ne!(RawValue::Int(1), RawValue::Float(1.5));
    }

    #[test]
    fn text_never_equals_numbers() {
        assert_ne!(RawValue::from("1"), RawValue::Int(1));
        assert_eq!(RawValue::from("IN"), RawValue::from("IN".to_string()));
    }

    #[test]
    fn index_view_rejects_fractional_floats() {
        assert_eq!(RawValue::Float(3.0).as_index(), Some(3));
        assert_eq!(RawValue::Float(123.456).as_index(), None);
        assert_eq!(RawValue::from("OUT").as_index(), None);
    }

    #[test]
    fn truthiness_follows_numeric_value() {
        assert!(RawValue::Int(1).is_truthy());
        assert!(!RawValue::Int(0).is_truthy());
        assert!(!RawValue::Float(0.0).is_truthy());
        assert!(!RawValue::from("").is_truthy());
    }

    #[test]
    fn large_integers_compare_exactly() {
        assert_ne!(RawValue::Int(9_007_199_254_740_993), RawValue::Int(9_007_199_254_740_992));
        assert_eq!(RawValue::Int(i64::MAX), RawValue::Int(i64::MAX));
        assert_eq!(RawValue::Int(1), RawValue::Bool(true));
        assert_ne!(RawValue::Bool(false), RawValue::Int(2));
    }

    #[test]
    fn untagged_json_picks_natural_variant() {
        let values: Vec<RawValue> = serde_json::from_str(r#"[true, 2, 2.5, "IN"]"#).unwrap();
        assert!(matches!(values[0], RawValue::Bool(true)));
        assert!(matches!(values[1], RawValue::Int(2)));
        assert!(matches!(values[2], RawValue::Float(_)));
        assert!(matches!(values[3], RawValue::Text(ref s) if s == "IN"));
    }
}
