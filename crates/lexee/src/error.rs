//! Engine error type

use lexee_core::FormulaError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised outside a single formula call
#[derive(Debug, Error)]
pub enum EngineError {
    /// A formula call failed
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Options file is not valid JSON or has unknown fields
    #[error("invalid engine options '{}': {source}", path.display())]
    Options {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
