//! Formula units
//!
//! Each category module exposes a static `FORMULAS` table. A unit reads its
//! inputs through [`Variables`], validates them itself and returns a
//! [`ResultMap`] with a fixed set of field names.

pub mod array;
pub mod database;
pub mod date;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod matrix;
pub mod statistical;
pub mod text;

use crate::context::FormulaContext;
use crate::schema::{Category, FormulaSchema, VariableKind, VariableSpec};
use crate::variables::{ResultMap, Variables};
use lexee_core::FormulaResult;

/// Formula implementation signature
pub type FormulaImpl = fn(&Variables, &FormulaContext) -> FormulaResult<ResultMap>;

/// Formula definition
pub struct FormulaDef {
    /// Stable identifier
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    /// Declared inputs, for introspection only
    pub variables: &'static [VariableSpec],
    /// Implementation
    pub implementation: FormulaImpl,
    /// Results differ between identical calls
    pub random: bool,
}

impl FormulaDef {
    /// Caller-facing description
    pub fn schema(&self) -> FormulaSchema {
        FormulaSchema {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            random: self.random,
            variables: self.variables.to_vec(),
        }
    }
}

impl std::fmt::Debug for FormulaDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaDef")
            .field("id", &self.id)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Every built-in formula
pub fn all() -> impl Iterator<Item = &'static FormulaDef> {
    math::FORMULAS
        .iter()
        .chain(statistical::FORMULAS)
        .chain(logical::FORMULAS)
        .chain(lookup::FORMULAS)
        .chain(array::FORMULAS)
        .chain(database::FORMULAS)
        .chain(text::FORMULAS)
        .chain(info::FORMULAS)
        .chain(date::FORMULAS)
        .chain(financial::FORMULAS)
        .chain(matrix::FORMULAS)
}

pub(crate) const fn req(
    name: &'static str,
    label: &'static str,
    kind: VariableKind,
    placeholder: &'static str,
) -> VariableSpec {
    VariableSpec::required(name, label, kind, placeholder)
}

pub(crate) const fn opt(
    name: &'static str,
    label: &'static str,
    kind: VariableKind,
    placeholder: &'static str,
) -> VariableSpec {
    VariableSpec::optional(name, label, kind, placeholder)
}

/// Round for reporting
pub(crate) fn round(value: f64, digits: i32) -> f64 {
    crate::numeric::round(value, digits)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use lexee_core::{Value, VariableMap};

    /// Run one formula with JSON input and a fixed context
    pub fn run(f: FormulaImpl, input: serde_json::Value) -> FormulaResult<ResultMap> {
        let map = match Value::from(input) {
            Value::Map(map) => map,
            _ => VariableMap::new(),
        };
        let ctx = FormulaContext::default()
            .with_today(chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap_or_default())
            .with_seed(42);
        f(&Variables::new(&map), &ctx)
    }

    /// Numeric field of a result
    pub fn num(result: &ResultMap, key: &str) -> f64 {
        result
            .get(key)
            .and_then(Value::as_number)
            .unwrap_or(f64::NAN)
    }
}
