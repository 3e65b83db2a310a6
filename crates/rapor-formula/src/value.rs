//! Field value type and coercion rules
//!
//! Collected field values travel as strings; during evaluation they are a
//! small tagged union with explicit per-function coercion rules. This is
//! where most subtle bugs live, so the rules are spelled out here and tested
//! against the same fixtures as the embedded document runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A loosely-typed field value during evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Empty,
}

impl FieldValue {
    /// Classify a raw field string: blank is empty, numeric text is a
    /// number, everything else is text
    pub fn from_field(raw: &str) -> FieldValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Empty;
        }
        // "NaN" and "inf" parse as f64 but are not field numbers
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view, if one exists. Blank and non-numeric text have none;
    /// callers decide whether that means "exclude" (AVERAGE) or "zero" (SUM).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            FieldValue::Empty => None,
        }
    }

    /// Truthiness for IF/AND/OR: zero and blank are false, non-empty text is
    /// true
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Empty => false,
        }
    }

    /// Render back into a field string. Whole numbers drop the fraction.
    pub fn to_field_string(&self) -> String {
        match self {
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Text(s) => s.clone(),
            FieldValue::Empty => String::new(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_field_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_classification() {
        assert_eq!(FieldValue::from_field(""), FieldValue::Empty);
        assert_eq!(FieldValue::from_field("   "), FieldValue::Empty);
        assert_eq!(FieldValue::from_field("80"), FieldValue::Number(80.0));
        assert_eq!(FieldValue::from_field(" 7.5 "), FieldValue::Number(7.5));
        assert_eq!(FieldValue::from_field("abc"), FieldValue::Text("abc".into()));
    }

    #[test]
    fn test_non_finite_strings_are_text() {
        assert_eq!(FieldValue::from_field("NaN"), FieldValue::Text("NaN".into()));
        assert_eq!(FieldValue::from_field("inf"), FieldValue::Text("inf".into()));
        assert_eq!(FieldValue::Text("NaN".into()).as_number(), None);
        assert_eq!(FieldValue::Text("-inf".into()).as_number(), None);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(FieldValue::Number(3.0).as_number(), Some(3.0));
        assert_eq!(FieldValue::Text("42".into()).as_number(), Some(42.0));
        assert_eq!(FieldValue::Text("abc".into()).as_number(), None);
        assert_eq!(FieldValue::Empty.as_number(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(FieldValue::Number(1.0).is_truthy());
        assert!(!FieldValue::Number(0.0).is_truthy());
        assert!(FieldValue::Text("x".into()).is_truthy());
        assert!(!FieldValue::Empty.is_truthy());
    }

    #[test]
    fn test_to_field_string() {
        assert_eq!(FieldValue::Number(80.0).to_field_string(), "80");
        assert_eq!(FieldValue::Number(82.5).to_field_string(), "82.5");
        assert_eq!(FieldValue::Empty.to_field_string(), "");
    }
}
