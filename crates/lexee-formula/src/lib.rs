//! # lexee-formula
//!
//! Formula execution engine for lexee.
//!
//! This crate provides:
//! - A fixed registry of ~110 named formulas (`registry`)
//! - A sandboxed arithmetic expression evaluator (`expr`)
//! - Numerical solvers: Newton-Raphson, Gauss-Jordan, least squares, amortization (`solvers`)
//! - Row criteria matching and tabular primitives shared by the formulas
//!
//! ## Example
//!
//! ```rust
//! use lexee_core::{Value, VariableMap};
//! use lexee_formula::dispatch;
//!
//! let mut vars = VariableMap::new();
//! vars.insert("valeurs".into(), Value::from(vec![1, 2, 3, 4]));
//! let result = dispatch("mediane", &vars).unwrap();
//! assert_eq!(result.get("mediane"), Some(&Value::Number(2.5)));
//! ```

pub mod context;
pub mod criteria;
pub mod expr;
pub mod functions;
pub mod numeric;
pub mod registry;
pub mod schema;
pub mod solvers;
pub mod tabular;
pub mod variables;

pub use context::FormulaContext;
pub use lexee_core::{FormulaError, FormulaResult, Value, VariableMap};
pub use registry::{dispatch, dispatch_with, registry, FormulaRegistry};
pub use schema::{Category, FormulaSchema, VariableKind, VariableSpec};
pub use variables::{ResultMap, Variables};
