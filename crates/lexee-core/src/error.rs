//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while dispatching or executing a formula
///
/// Every error is local to one invocation. Messages describe the caller's
/// input, never the formula internals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// No formula is registered under this identifier
    #[error("unknown formula '{id}' ({} formulas available)", .available.len())]
    UnknownFormula { id: String, available: Vec<String> },

    /// A required variable was not supplied
    #[error("missing variable '{name}'")]
    MissingVariable { name: String },

    /// A variable was supplied with the wrong type
    #[error("variable '{name}' must be {expected}, got {found}")]
    InvalidVariableType {
        name: String,
        expected: String,
        found: String,
    },

    /// Dimension mismatch in a tabular or matrix operation
    #[error("shape error: {0}")]
    Shape(String),

    /// Matrix has no inverse
    #[error("matrix is singular")]
    SingularMatrix,

    /// Iterative solver failed to reach a root within tolerance
    #[error("no convergence: {0}")]
    Convergence(String),

    /// Expression contains an identifier outside the allow-set
    #[error("token '{token}' is not allowed in expressions")]
    UnsafeToken { token: String },

    /// Input outside the formula's domain
    #[error("invalid input: {0}")]
    Domain(String),
}

impl FormulaError {
    /// Create a domain error
    pub fn domain(message: impl Into<String>) -> Self {
        FormulaError::Domain(message.into())
    }

    /// Create a shape error
    pub fn shape(message: impl Into<String>) -> Self {
        FormulaError::Shape(message.into())
    }

    /// Create a missing-variable error
    pub fn missing(name: impl Into<String>) -> Self {
        FormulaError::MissingVariable { name: name.into() }
    }

    /// Create a type error for a variable
    pub fn invalid_type(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        FormulaError::InvalidVariableType {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Stable snake_case name of the error kind, for transports
    pub fn kind(&self) -> &'static str {
        match self {
            FormulaError::UnknownFormula { .. } => "unknown_formula",
            FormulaError::MissingVariable { .. } => "missing_variable",
            FormulaError::InvalidVariableType { .. } => "invalid_variable_type",
            FormulaError::Shape(_) => "shape_error",
            FormulaError::SingularMatrix => "singular_matrix",
            FormulaError::Convergence(_) => "convergence_error",
            FormulaError::UnsafeToken { .. } => "unsafe_token",
            FormulaError::Domain(_) => "domain_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FormulaError::UnsafeToken {
            token: "open".into(),
        };
        assert_eq!(err.to_string(), "token 'open' is not allowed in expressions");

        let err = FormulaError::UnknownFormula {
            id: "nope".into(),
            available: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "unknown formula 'nope' (2 formulas available)");

        let err = FormulaError::invalid_type("taux", "a number", "text");
        assert_eq!(err.to_string(), "variable 'taux' must be a number, got text");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(FormulaError::SingularMatrix.kind(), "singular_matrix");
        assert_eq!(FormulaError::domain("x").kind(), "domain_error");
        assert_eq!(FormulaError::missing("x").kind(), "missing_variable");
    }
}
