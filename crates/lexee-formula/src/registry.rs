//! Formula registry
//!
//! The table of formulas is built once from the static `FORMULAS` tables of
//! [`crate::functions`] and never changes afterwards, so it can be shared
//! freely between threads.

use crate::context::FormulaContext;
use crate::functions::{self, FormulaDef};
use crate::schema::FormulaSchema;
use crate::variables::{ResultMap, Variables};
use ahash::AHashMap;
use lexee_core::{FormulaError, FormulaResult, VariableMap};
use std::sync::OnceLock;

static FORMULA_REGISTRY: OnceLock<FormulaRegistry> = OnceLock::new();

/// Shared registry with every built-in formula
pub fn registry() -> &'static FormulaRegistry {
    FORMULA_REGISTRY.get_or_init(FormulaRegistry::new)
}

/// Execute a formula with the default context
pub fn dispatch(id: &str, variables: &VariableMap) -> FormulaResult<ResultMap> {
    registry().dispatch(id, variables)
}

/// Execute a formula with an explicit context
pub fn dispatch_with(
    id: &str,
    variables: &VariableMap,
    ctx: &FormulaContext,
) -> FormulaResult<ResultMap> {
    registry().dispatch_with(id, variables, ctx)
}

/// Lookup table from formula identifier to definition
pub struct FormulaRegistry {
    formulas: AHashMap<&'static str, &'static FormulaDef>,
}

impl FormulaRegistry {
    /// Create a registry with all built-in formulas
    pub fn new() -> Self {
        let mut formulas = AHashMap::new();
        for def in functions::all() {
            if formulas.insert(def.id, def).is_some() {
                log::warn!("formula '{}' is defined twice; keeping the last one", def.id);
            }
        }
        Self { formulas }
    }

    /// Look up a formula by identifier (exact match)
    pub fn get(&self, id: &str) -> Option<&'static FormulaDef> {
        self.formulas.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.formulas.contains_key(id)
    }

    /// Sorted identifiers
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.formulas.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Caller-facing schema of one formula
    pub fn schema(&self, id: &str) -> FormulaResult<FormulaSchema> {
        self.lookup(id).map(FormulaDef::schema)
    }

    /// Schemas of every formula, sorted by identifier
    pub fn schemas(&self) -> Vec<FormulaSchema> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(FormulaDef::schema)
            .collect()
    }

    /// Execute a formula with the default context
    pub fn dispatch(&self, id: &str, variables: &VariableMap) -> FormulaResult<ResultMap> {
        self.dispatch_with(id, variables, &FormulaContext::default())
    }

    /// Execute a formula
    pub fn dispatch_with(
        &self,
        id: &str,
        variables: &VariableMap,
        ctx: &FormulaContext,
    ) -> FormulaResult<ResultMap> {
        let def = self.lookup(id)?;
        log::debug!("dispatch {} ({} variables)", id, variables.len());

        let result = (def.implementation)(&Variables::new(variables), ctx);
        match &result {
            Err(FormulaError::Convergence(_)) => log::warn!("{}: solver did not converge", id),
            Err(FormulaError::UnsafeToken { .. }) => {
                log::warn!("{}: expression rejected by the sandbox", id)
            }
            Err(err) => log::debug!("{} failed: {}", id, err.kind()),
            Ok(_) => {}
        }
        result
    }

    fn lookup(&self, id: &str) -> FormulaResult<&'static FormulaDef> {
        self.get(id).ok_or_else(|| FormulaError::UnknownFormula {
            id: id.to_string(),
            available: self.ids().into_iter().map(str::to_string).collect(),
        })
    }
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormulaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaRegistry")
            .field("formulas", &self.formulas.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexee_core::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_are_unique_and_sorted() {
        let total = functions::all().count();
        let reg = FormulaRegistry::new();
        assert_eq!(reg.len(), total);

        let ids = reg.ids();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_unknown_formula_lists_available() {
        let err = registry().dispatch("nope", &VariableMap::new()).unwrap_err();
        match err {
            FormulaError::UnknownFormula { id, available } => {
                assert_eq!(id, "nope");
                assert_eq!(available.len(), registry().len());
                assert!(available.iter().any(|a| a == "vpm"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        assert!(registry().contains("vpm"));
        assert!(!registry().contains("VPM"));
        assert!(!registry().contains(" vpm"));
    }

    #[test]
    fn test_dispatch_runs_the_formula() {
        let mut vars = VariableMap::new();
        vars.insert("texte".into(), Value::from("hello"));
        let result = dispatch("majuscule", &vars).unwrap();
        assert_eq!(result.get("resultat"), Some(&Value::from("HELLO")));
    }

    #[test]
    fn test_schema_exposes_variables() {
        let schema = registry().schema("amorl").unwrap();
        let names: Vec<_> = schema.variables.iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["cout", "valeur_residuelle", "duree_vie"]);
        assert!(registry().schema("missing").is_err());
        assert_eq!(registry().schemas().len(), registry().len());
    }
}
