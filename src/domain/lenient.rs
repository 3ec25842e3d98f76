//! Lenient JSON field readers.
//!
//! The analytics backend and older persisted histories are loose about
//! number encoding: prices arrive as JSON numbers, numeric strings, or
//! `null`. These helpers accept all of them instead of failing the whole
//! record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a JSON value as an `f64` (number or numeric string).
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Interpret a JSON value as a list of prices.
///
/// Arrays keep their numeric members in order; a lone number is a
/// one-element list; anything else is empty.
pub fn value_to_f64_list(value: &Value) -> Vec<f64> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_to_f64).collect(),
        other => value_to_f64(other).into_iter().collect(),
    }
}

/// Interpret a JSON value as a flag. Only `true` (or `"true"`) is set.
pub fn value_to_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_f64(deserializer)?.unwrap_or(0.0))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().is_some_and(value_to_flag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(value_to_f64(&json!(105)), Some(105.0));
        assert_eq!(value_to_f64(&json!(" 62000.5 ")), Some(62000.5));
        assert_eq!(value_to_f64(&json!("n/a")), None);
        assert_eq!(value_to_f64(&Value::Null), None);
    }

    #[test]
    fn test_price_lists() {
        assert_eq!(
            value_to_f64_list(&json!([62000, "64000", null, "x"])),
            vec![62000.0, 64000.0]
        );
        assert_eq!(value_to_f64_list(&json!(58000)), vec![58000.0]);
        assert!(value_to_f64_list(&json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_flags() {
        assert!(value_to_flag(&json!(true)));
        assert!(value_to_flag(&json!("TRUE")));
        assert!(!value_to_flag(&json!(1)));
        assert!(!value_to_flag(&Value::Null));
    }
}
