//! Dynamic value model
//!
//! Variable mappings and result mappings carry [`Value`]s. Every coercion is
//! explicit and fallible; formulas validate their inputs through these
//! accessors instead of guessing at types.

use crate::error_code::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from variable name to value, as supplied by a caller
pub type VariableMap = BTreeMap<String, Value>;

/// A dynamically-typed value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a number, using [`Value::Integer`] when it is whole
    pub fn compact(n: f64) -> Value {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
            Value::Integer(n as i64)
        } else {
            Value::Number(n)
        }
    }

    /// Short type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, empty text or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Integer or number (not numeric text)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Number(_))
    }

    /// Convert to number, if possible
    ///
    /// Booleans count as 1/0 and text is accepted when it parses as a finite
    /// number once trimmed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            Value::Bool(true) => Some(1.0),
            Value::Bool(false) => Some(0.0),
            Value::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Convert to boolean, if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Number(n) => Some(*n != 0.0),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "vrai" | "oui" | "yes" | "1" => Some(true),
                "false" | "faux" | "non" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Render a scalar as text; lists and maps have no text form
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Text(s) => Some(s.clone()),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Render any value as text, lists and maps as JSON
    pub fn render(&self) -> String {
        match self.as_text() {
            Some(text) => text,
            None => serde_json::Value::from(self.clone()).to_string(),
        }
    }

    /// Borrow the text, if this is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Spreadsheet error literal carried as text (`"#N/A"`, `"#DIV/0!"`, ...)
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.as_str().and_then(ErrorCode::parse)
    }
}

/// Parse trimmed text as a finite number
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number without trailing zeros
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Number),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            // Non-finite numbers have no JSON form
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_as_number() {
        assert_eq!(Value::Integer(3).as_number(), Some(3.0));
        assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Bool(true).as_number(), Some(1.0));
        assert_eq!(Value::from(" 42 ").as_number(), Some(42.0));
        assert_eq!(Value::from("abc").as_number(), None);
        assert_eq!(Value::from("").as_number(), None);
        assert_eq!(Value::from("inf").as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
        assert_eq!(Value::List(vec![]).as_number(), None);
    }

    #[test]
    fn test_as_text() {
        assert_eq!(Value::Integer(1).as_text(), Some("1".to_string()));
        assert_eq!(Value::Number(2.0).as_text(), Some("2".to_string()));
        assert_eq!(Value::Number(1.5).as_text(), Some("1.5".to_string()));
        assert_eq!(Value::Null.as_text(), Some(String::new()));
        assert_eq!(Value::Bool(false).as_text(), Some("false".to_string()));
        assert_eq!(Value::List(vec![]).as_text(), None);
    }

    #[test]
    fn test_as_bool() {
        assert_eq!(Value::from("Vrai").as_bool(), Some(true));
        assert_eq!(Value::from("false").as_bool(), Some(false));
        assert_eq!(Value::Integer(0).as_bool(), Some(false));
        assert_eq!(Value::from("peut-être").as_bool(), None);
    }

    #[test]
    fn test_compact() {
        assert_eq!(Value::compact(4.0), Value::Integer(4));
        assert_eq!(Value::compact(-0.5), Value::Number(-0.5));
        assert!(matches!(Value::compact(f64::NAN), Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_blank() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("  ").is_blank());
        assert!(!Value::Integer(0).is_blank());
    }

    #[test]
    fn test_json_round_trip() {
        let input = json!({"a": [1, 2.5, "x", null, true], "b": {"c": -3}});
        let value = Value::from(input.clone());
        assert_eq!(
            value.as_map().and_then(|m| m.get("b")).and_then(|b| b.as_map()).and_then(|m| m.get("c")),
            Some(&Value::Integer(-3))
        );
        assert_eq!(serde_json::Value::from(value), input);
    }

    #[test]
    fn test_serde_untagged() {
        let value: Value = serde_json::from_str(r#"[1, 1.5, "a", {"k": false}]"#).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Integer(1),
                Value::Number(1.5),
                Value::from("a"),
                Value::Map(BTreeMap::from([("k".to_string(), Value::Bool(false))])),
            ])
        );
        assert_eq!(serde_json::to_string(&Value::Number(900.0)).unwrap(), "900.0");
    }

    #[test]
    fn test_error_code() {
        assert_eq!(Value::from("#N/A").error_code(), Some(ErrorCode::Na));
        assert_eq!(Value::Integer(1).error_code(), None);
    }
}
