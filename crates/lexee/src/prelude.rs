//! Prelude module - common imports for lexee users
//!
//! ```rust
//! use lexee::prelude::*;
//! ```

pub use crate::{
    Category, Engine, EngineError, EngineOptions, FormulaError, FormulaResult, FormulaSchema,
    JsonMap, ResultMap, Value, VariableKind, VariableMap, VariableSpec,
};
