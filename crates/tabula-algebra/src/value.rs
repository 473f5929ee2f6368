//! Tuples and the comparison rules shared by predicates and value lookups.

use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

use crate::error::{AlgebraError, Result};

/// One row: field name to value, in insertion order.
pub type Tuple = serde_json::Map<String, Value>;

/// Numeric view of a value. Strings holding a finite number count as numeric.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Text view of a value used for non-numeric comparisons.
pub fn render(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        other => Cow::Owned(other.to_string()),
    }
}

/// Compare natively when both sides are numeric, else as strings.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => render(a).cmp(&render(b)),
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

/// Hashable token such that `values_equal(a, b)` iff the tokens are equal.
pub fn equality_token(value: &Value) -> String {
    match as_number(value) {
        Some(f) if f == 0.0 => "n:0".to_string(),
        Some(f) => format!("n:{}", f),
        None => format!("s:{}", render(value)),
    }
}

pub fn as_tuple(value: &Value) -> Result<&Tuple> {
    value
        .as_object()
        .ok_or_else(|| AlgebraError::NotATuple(value.to_string()))
}

pub fn into_tuple(value: Value) -> Result<Tuple> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AlgebraError::NotATuple(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(compare(&json!(9), &json!(10)), Ordering::Less);
        assert_eq!(compare(&json!("9"), &json!(10)), Ordering::Less);
        assert!(values_equal(&json!("10.0"), &json!(10)));
    }

    #[test]
    fn test_string_comparison() {
        // lexicographic once either side is not numeric
        assert_eq!(compare(&json!("9a"), &json!("10a")), Ordering::Greater);
        assert!(values_equal(&json!(null), &json!("")));
        assert!(!values_equal(&json!("x"), &json!("y")));
    }

    #[test]
    fn test_equality_token_agrees_with_values_equal() {
        let values = [json!(10), json!("10"), json!(10.0), json!("1e1"), json!("ten"), json!(0), json!(-0.0), json!(null)];
        for a in &values {
            for b in &values {
                assert_eq!(values_equal(a, b), equality_token(a) == equality_token(b), "{} vs {}", a, b);
            }
        }
    }
}
