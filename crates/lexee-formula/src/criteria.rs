//! Row criteria for the conditional aggregates, filters and database formulas
//!
//! A criterion is a `{"colonne": ..., "valeur": ...}` pair. A row matches when
//! the rendered text of its cell equals the expected value, ignoring case.
//! Several criteria combine with AND; there is no OR, negation, wildcard or
//! comparison operator. A missing column reads as the empty string.

use crate::variables::Row;
use lexee_core::{FormulaError, FormulaResult, Value};

/// Column equality test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    column: String,
    /// Lowercased expected text
    expected: String,
}

impl Criterion {
    pub fn new(column: impl Into<String>, expected: &Value) -> Self {
        Self {
            column: column.into(),
            expected: expected.render().to_lowercase(),
        }
    }

    /// Read a criterion from a `{colonne, valeur}` map
    pub fn from_value(name: &str, value: &Value) -> FormulaResult<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| FormulaError::invalid_type(name, "a criterion map", value.type_name()))?;
        let column = map
            .get("colonne")
            .and_then(Value::as_text)
            .ok_or_else(|| FormulaError::missing(format!("{}.colonne", name)))?;
        let expected = map
            .get("valeur")
            .ok_or_else(|| FormulaError::missing(format!("{}.valeur", name)))?;
        Ok(Self::new(column, expected))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Check one row against this criterion
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row
            .get(&self.column)
            .map(|v| v.render().to_lowercase())
            .unwrap_or_default();
        actual == self.expected
    }
}

/// A row matches when it satisfies every criterion
pub fn matches_all(row: &Row, criteria: &[Criterion]) -> bool {
    criteria.iter().all(|c| c.matches(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(input: serde_json::Value) -> Row {
        match Value::from(input) {
            Value::Map(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        let r = row(json!({"canal": "Facebook", "ville": "Paris"}));
        assert!(Criterion::new("canal", &Value::from("facebook")).matches(&r));
        assert!(Criterion::new("canal", &Value::from("FACEBOOK")).matches(&r));
        assert!(!Criterion::new("canal", &Value::from("face")).matches(&r));
    }

    #[test]
    fn test_numbers_compare_as_text() {
        let r = row(json!({"achats": 5, "prix": 5.0}));
        assert!(Criterion::new("achats", &Value::from("5")).matches(&r));
        assert!(Criterion::new("prix", &Value::Integer(5)).matches(&r));
    }

    #[test]
    fn test_missing_column_reads_as_empty() {
        let r = row(json!({"a": 1}));
        assert!(!Criterion::new("b", &Value::from("x")).matches(&r));
        assert!(Criterion::new("b", &Value::from("")).matches(&r));
        assert!(Criterion::new("b", &Value::Null).matches(&r));
    }

    #[test]
    fn test_all_criteria_must_match() {
        let r = row(json!({"canal": "Facebook", "ville": "Paris"}));
        let both = vec![
            Criterion::new("canal", &Value::from("Facebook")),
            Criterion::new("ville", &Value::from("Paris")),
        ];
        assert!(matches_all(&r, &both));
        let mismatch = vec![
            Criterion::new("canal", &Value::from("Facebook")),
            Criterion::new("ville", &Value::from("Lyon")),
        ];
        assert!(!matches_all(&r, &mismatch));
        assert!(matches_all(&r, &[]));
    }

    #[test]
    fn test_from_value() {
        let c = Criterion::from_value("criteres[0]", &Value::from(json!({"colonne": "status", "valeur": "actif"})))
            .unwrap();
        assert_eq!(c.column(), "status");

        let err = Criterion::from_value("criteres[0]", &Value::from(json!({"valeur": 1}))).unwrap_err();
        assert_eq!(err, FormulaError::missing("criteres[0].colonne"));
    }
}
