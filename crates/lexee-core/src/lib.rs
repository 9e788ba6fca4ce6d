//! # lexee-core
//!
//! Core types shared by the lexee formula engine.
//!
//! This crate provides:
//! - [`Value`], the dynamically-typed value carried in variable and result mappings
//! - [`ErrorCode`], spreadsheet error literals (`#N/A`, `#DIV/0!`, ...)
//! - [`FormulaError`], the typed failure returned by every formula

pub mod error;
pub mod error_code;
pub mod value;

pub use error::{FormulaError, FormulaResult};
pub use error_code::ErrorCode;
pub use value::{Value, VariableMap};
