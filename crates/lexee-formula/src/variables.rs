//! Typed access to a caller's variable mapping, and the result builder

use crate::criteria::Criterion;
use lexee_core::{FormulaError, FormulaResult, Value, VariableMap};
use serde::Serialize;
use std::collections::BTreeMap;

/// A row of a table: column name to cell value
pub type Row = BTreeMap<String, Value>;

/// Read-only view over the variables of one formula call
///
/// Every accessor validates the value it returns. Optional accessors treat an
/// explicit `null` the same as an absent key.
#[derive(Debug, Clone, Copy)]
pub struct Variables<'a> {
    map: &'a VariableMap,
}

impl<'a> Variables<'a> {
    pub fn new(map: &'a VariableMap) -> Self {
        Self { map }
    }

    /// Number of supplied variables
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Value if present and not null
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    /// Value if present, null included
    pub fn raw(&self, name: &str) -> FormulaResult<&'a Value> {
        self.map.get(name).ok_or_else(|| FormulaError::missing(name))
    }

    /// Required, non-null value
    pub fn value(&self, name: &str) -> FormulaResult<&'a Value> {
        self.get(name).ok_or_else(|| FormulaError::missing(name))
    }

    pub fn number(&self, name: &str) -> FormulaResult<f64> {
        to_number(name, self.value(name)?)
    }

    pub fn number_or(&self, name: &str, default: f64) -> FormulaResult<f64> {
        match self.get(name) {
            Some(value) => to_number(name, value),
            None => Ok(default),
        }
    }

    /// Whole number; fractional input is truncated toward zero
    pub fn integer(&self, name: &str) -> FormulaResult<i64> {
        to_integer(name, self.value(name)?)
    }

    pub fn integer_or(&self, name: &str, default: i64) -> FormulaResult<i64> {
        match self.get(name) {
            Some(value) => to_integer(name, value),
            None => Ok(default),
        }
    }

    pub fn text(&self, name: &str) -> FormulaResult<String> {
        to_text(name, self.value(name)?)
    }

    pub fn text_or(&self, name: &str, default: &str) -> FormulaResult<String> {
        match self.get(name) {
            Some(value) => to_text(name, value),
            None => Ok(default.to_string()),
        }
    }

    /// Text if present, `None` otherwise
    pub fn optional_text(&self, name: &str) -> FormulaResult<Option<String>> {
        self.get(name).map(|value| to_text(name, value)).transpose()
    }

    pub fn flag_or(&self, name: &str, default: bool) -> FormulaResult<bool> {
        match self.get(name) {
            Some(value) => value
                .as_bool()
                .ok_or_else(|| FormulaError::invalid_type(name, "a boolean", value.type_name())),
            None => Ok(default),
        }
    }

    pub fn list(&self, name: &str) -> FormulaResult<&'a [Value]> {
        let value = self.value(name)?;
        value
            .as_list()
            .ok_or_else(|| FormulaError::invalid_type(name, "a list", value.type_name()))
    }

    /// List where every element converts to a number
    pub fn numbers(&self, name: &str) -> FormulaResult<Vec<f64>> {
        self.list(name)?
            .iter()
            .enumerate()
            .map(|(i, item)| to_number(&format!("{}[{}]", name, i), item))
            .collect()
    }

    /// List where every element renders as text
    pub fn texts(&self, name: &str) -> FormulaResult<Vec<String>> {
        self.list(name)?
            .iter()
            .enumerate()
            .map(|(i, item)| to_text(&format!("{}[{}]", name, i), item))
            .collect()
    }

    pub fn map(&self, name: &str) -> FormulaResult<&'a BTreeMap<String, Value>> {
        let value = self.value(name)?;
        value
            .as_map()
            .ok_or_else(|| FormulaError::invalid_type(name, "a map", value.type_name()))
    }

    /// List of rows (maps)
    pub fn table(&self, name: &str) -> FormulaResult<Vec<&'a Row>> {
        self.list(name)?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_map().ok_or_else(|| {
                    FormulaError::invalid_type(format!("{}[{}]", name, i), "a row (map)", item.type_name())
                })
            })
            .collect()
    }

    /// Numeric 2-D grid; a flat list of numbers is read as a single row
    pub fn matrix(&self, name: &str) -> FormulaResult<Vec<Vec<f64>>> {
        let items = self.list(name)?;
        if items.is_empty() {
            return Err(FormulaError::shape(format!("'{}' is empty", name)));
        }

        if !items.iter().any(|item| item.as_list().is_some()) {
            let row = items
                .iter()
                .enumerate()
                .map(|(j, item)| to_number(&format!("{}[{}]", name, j), item))
                .collect::<FormulaResult<Vec<f64>>>()?;
            return Ok(vec![row]);
        }

        let mut rows = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let cells = item.as_list().ok_or_else(|| {
                FormulaError::invalid_type(format!("{}[{}]", name, i), "a list", item.type_name())
            })?;
            let row = cells
                .iter()
                .enumerate()
                .map(|(j, cell)| to_number(&format!("{}[{}][{}]", name, i, j), cell))
                .collect::<FormulaResult<Vec<f64>>>()?;
            rows.push(row);
        }

        let width = rows[0].len();
        if width == 0 {
            return Err(FormulaError::shape(format!("'{}' has empty rows", name)));
        }
        if let Some(i) = rows.iter().position(|row| row.len() != width) {
            return Err(FormulaError::shape(format!(
                "row {} of '{}' has {} columns, expected {}",
                i + 1,
                name,
                rows[i].len(),
                width
            )));
        }
        Ok(rows)
    }

    /// List of `{colonne, valeur}` criteria
    pub fn criteria(&self, name: &str) -> FormulaResult<Vec<Criterion>> {
        self.list(name)?
            .iter()
            .enumerate()
            .map(|(i, item)| Criterion::from_value(&format!("{}[{}]", name, i), item))
            .collect()
    }
}

fn to_number(name: &str, value: &Value) -> FormulaResult<f64> {
    value
        .as_number()
        .ok_or_else(|| FormulaError::invalid_type(name, "a number", value.type_name()))
}

fn to_integer(name: &str, value: &Value) -> FormulaResult<i64> {
    let n = to_number(name, value)?;
    if n.abs() >= 9.0e15 {
        return Err(FormulaError::domain(format!("'{}' is out of range", name)));
    }
    Ok(n.trunc() as i64)
}

fn to_text(name: &str, value: &Value) -> FormulaResult<String> {
    value
        .as_text()
        .ok_or_else(|| FormulaError::invalid_type(name, "text", value.type_name()))
}

/// Named results of one formula call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultMap(BTreeMap<String, Value>);

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names, in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl IntoIterator for ResultMap {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
