//! Formula execution boundary
//!
//! [`Engine`] takes a formula identifier and a JSON object of variables and
//! returns a JSON object of results. Options supply the ambient inputs (the
//! calendar date and the random seed) so that calls are reproducible.

use crate::options::EngineOptions;
use lexee_core::{FormulaResult, Value, VariableMap};
use lexee_formula::{registry, FormulaContext, FormulaRegistry, FormulaSchema, ResultMap};
use serde_json::{Map, Value as JsonValue};

/// JSON object in or out of the engine
pub type JsonMap = Map<String, JsonValue>;

/// Formula engine
#[derive(Debug, Clone)]
pub struct Engine {
    options: EngineOptions,
    registry: &'static FormulaRegistry,
}

impl Engine {
    /// Engine with default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            registry: registry(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Context handed to each formula call
    pub fn context(&self) -> FormulaContext {
        let mut ctx = FormulaContext::new();
        if let Some(today) = self.options.today {
            ctx = ctx.with_today(today);
        }
        if let Some(seed) = self.options.random_seed {
            ctx = ctx.with_seed(seed);
        }
        ctx
    }

    /// Execute a formula over JSON variables
    pub fn execute(&self, formula_id: &str, variables: JsonMap) -> FormulaResult<JsonMap> {
        let variables = match Value::from(JsonValue::Object(variables)) {
            Value::Map(map) => map,
            _ => VariableMap::new(),
        };
        let result = self.execute_values(formula_id, &variables)?;
        Ok(result
            .into_iter()
            .map(|(key, value)| (key, JsonValue::from(value)))
            .collect())
    }

    /// Execute a formula over native values
    pub fn execute_values(&self, formula_id: &str, variables: &VariableMap) -> FormulaResult<ResultMap> {
        let result = self
            .registry
            .dispatch_with(formula_id, variables, &self.context())?;
        if self.options.log_results {
            let fields: Vec<&str> = result.keys().collect();
            log::debug!("{} returned [{}]", formula_id, fields.join(", "));
        }
        Ok(result)
    }

    /// Schemas of every formula, sorted by identifier
    pub fn schemas(&self) -> Vec<FormulaSchema> {
        self.registry.schemas()
    }

    pub fn schema(&self, formula_id: &str) -> FormulaResult<FormulaSchema> {
        self.registry.schema(formula_id)
    }

    /// Sorted formula identifiers
    pub fn formula_ids(&self) -> Vec<&'static str> {
        self.registry.ids()
    }

    /// Whole catalog as JSON, keyed by formula identifier
    pub fn catalog(&self) -> JsonValue {
        let catalog: JsonMap = self
            .schemas()
            .into_iter()
            .filter_map(|schema| {
                serde_json::to_value(&schema)
                    .ok()
                    .map(|json| (schema.id.to_string(), json))
            })
            .collect();
        JsonValue::Object(catalog)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
