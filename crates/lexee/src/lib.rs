//! # lexee
//!
//! A sandboxed formula execution engine.
//!
//! Callers pick a formula by identifier, pass its variables as a JSON object,
//! and get a JSON object of named results back. No code is ever evaluated
//! outside the formula catalog and its restricted arithmetic grammar.
//!
//! ## Features
//!
//! - ~110 spreadsheet-style formulas (finance, statistics, text, dates, matrices)
//! - Per-formula schemas for building input forms
//! - Reproducible calls: the calendar date and random seed come from [`EngineOptions`]
//!
//! ## Example
//!
//! ```rust
//! use lexee::prelude::*;
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let variables = json!({"taux_annuel": 5, "nb_periodes": 240, "valeur_actuelle": 200000});
//! let result = engine
//!     .execute("vpm", variables.as_object().cloned().unwrap_or_default())
//!     .unwrap();
//! assert!(result.contains_key("mensualite"));
//! ```

pub mod engine;
pub mod error;
pub mod options;
pub mod prelude;

pub use engine::{Engine, JsonMap};
pub use error::{EngineError, Result};
pub use options::EngineOptions;

pub use lexee_core::{FormulaError, FormulaResult, Value, VariableMap};
pub use lexee_formula::{
    dispatch, dispatch_with, registry, Category, FormulaContext, FormulaRegistry, FormulaSchema,
    ResultMap, VariableKind, VariableSpec,
};
