//! Sandboxed arithmetic expressions
//!
//! Expression text never reaches an interpreter before its identifiers have
//! been checked. [`Sandbox::compile`] lexes the full text, rejects the first
//! identifier outside the allow-set with [`FormulaError::UnsafeToken`], parses
//! the tokens, then checks the identifiers of the resulting tree against the
//! same allow-set. Only a compiled [`Expr`] can be run.
//!
//! The allow-set is the union of the names bound in the sandbox and the fixed
//! [`FUNCTIONS`] and [`CONSTANTS`] tables. Nothing is cached between calls.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::Expr;

use lexee_core::{FormulaError, FormulaResult};
use parser::Token;
use std::collections::BTreeMap;

/// Whitelisted math functions
pub const FUNCTIONS: [&str; 11] = [
    "abs", "round", "min", "max", "sum", "pow", "sqrt", "log", "log10", "ceil", "floor",
];

/// Whitelisted constants
pub const CONSTANTS: [&str; 2] = ["pi", "e"];

/// Longest accepted expression text, in characters
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// Deepest accepted nesting of signs, exponents, parentheses and calls
pub const MAX_NESTING: usize = 256;

/// Iteration cap for recursive application
pub const MAX_ITERATIONS: usize = 1000;

/// Trailing values kept by recursive application
pub const HISTORY_LEN: usize = 5;

/// Cell cap for array generation
pub const MAX_GRID_CELLS: usize = 100_000;

/// Closed evaluation environment: named numeric bindings plus the whitelist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sandbox {
    bindings: BTreeMap<String, f64>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a variable
    ///
    /// Names must be identifiers and must not collide with a whitelisted
    /// function or constant.
    pub fn bind(&mut self, name: &str, value: f64) -> FormulaResult<()> {
        if !parser::is_identifier(name) {
            return Err(FormulaError::domain(format!(
                "'{}' is not a valid variable name",
                name
            )));
        }
        if FUNCTIONS.contains(&name) || CONSTANTS.contains(&name) {
            return Err(FormulaError::domain(format!(
                "'{}' is a reserved name",
                name
            )));
        }
        if !value.is_finite() {
            return Err(FormulaError::domain(format!(
                "variable '{}' is not a finite number",
                name
            )));
        }
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Builder-style [`Sandbox::bind`]
    pub fn with(mut self, name: &str, value: f64) -> FormulaResult<Self> {
        self.bind(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.bindings.get(name).copied()
    }

    /// Bound variable names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Is the identifier in the allow-set?
    pub fn is_allowed(&self, ident: &str) -> bool {
        self.bindings.contains_key(ident) || FUNCTIONS.contains(&ident) || CONSTANTS.contains(&ident)
    }

    /// Validate and parse expression text against the current allow-set
    pub fn compile(&self, text: &str) -> FormulaResult<Expr> {
        if text.chars().count() > MAX_EXPRESSION_LEN {
            return Err(FormulaError::domain(format!(
                "expression is longer than {} characters",
                MAX_EXPRESSION_LEN
            )));
        }

        let tokens = parser::tokenize(text);
        for token in &tokens {
            if let Token::Ident(ident) = token {
                self.reject_unless_allowed(ident)?;
            }
        }

        let expr = parser::parse(&tokens)?;
        for ident in expr.identifiers() {
            self.reject_unless_allowed(ident)?;
        }
        Ok(expr)
    }

    /// Interpret a compiled expression
    pub fn run(&self, expr: &Expr) -> FormulaResult<f64> {
        evaluator::evaluate(expr, self)
    }

    /// Compile then run
    pub fn evaluate(&self, text: &str) -> FormulaResult<f64> {
        let expr = self.compile(text)?;
        self.run(&expr)
    }

    fn reject_unless_allowed(&self, ident: &str) -> FormulaResult<()> {
        if self.is_allowed(ident) {
            Ok(())
        } else {
            log::warn!("expression rejected: identifier outside the allow-set");
            Err(FormulaError::UnsafeToken {
                token: ident.to_string(),
            })
        }
    }
}

/// Evaluate an expression made only of numbers, operators and parentheses
///
/// Any identifier, including whitelisted functions, is rejected.
pub fn evaluate_literal(text: &str) -> FormulaResult<f64> {
    let tokens = parser::tokenize(text);
    if let Some(Token::Ident(ident)) = tokens.iter().find(|t| matches!(t, Token::Ident(_))) {
        log::warn!("literal expression rejected: identifiers are not allowed");
        return Err(FormulaError::UnsafeToken {
            token: ident.clone(),
        });
    }
    Sandbox::new().evaluate(text)
}

/// Outcome of [`iterate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub value: f64,
    /// Last values produced, oldest first, at most [`HISTORY_LEN`]
    pub history: Vec<f64>,
}

/// Apply an expression in `x` repeatedly, feeding each output back as `x`
pub fn iterate(text: &str, initial: f64, iterations: usize) -> FormulaResult<Iteration> {
    if !(1..=MAX_ITERATIONS).contains(&iterations) {
        return Err(FormulaError::domain(format!(
            "iterations must be between 1 and {}",
            MAX_ITERATIONS
        )));
    }

    let mut sandbox = Sandbox::new().with("x", initial)?;
    let expr = sandbox.compile(text)?;

    let mut value = initial;
    let mut history = Vec::with_capacity(HISTORY_LEN);
    for _ in 0..iterations {
        value = sandbox.run(&expr)?;
        sandbox.bind("x", value)?;
        if history.len() == HISTORY_LEN {
            history.remove(0);
        }
        history.push(value);
    }
    Ok(Iteration { value, history })
}

/// Evaluate an expression for every cell of a `rows` x `cols` grid
///
/// `row` and `col` are 0-based; `lignes` and `colonnes` hold the grid size.
pub fn generate_grid(rows: usize, cols: usize, text: &str) -> FormulaResult<Vec<Vec<f64>>> {
    if rows == 0 || cols == 0 {
        return Err(FormulaError::domain("grid dimensions must be at least 1"));
    }
    if rows.saturating_mul(cols) > MAX_GRID_CELLS {
        return Err(FormulaError::domain(format!(
            "grid is too large ({} x {}, at most {} cells)",
            rows, cols, MAX_GRID_CELLS
        )));
    }

    let mut sandbox = Sandbox::new()
        .with("row", 0.0)?
        .with("col", 0.0)?
        .with("lignes", rows as f64)?
        .with("colonnes", cols as f64)?;
    let expr = sandbox.compile(text)?;

    let mut grid = Vec::with_capacity(rows);
    for i in 0..rows {
        sandbox.bind("row", i as f64)?;
        let mut line = Vec::with_capacity(cols);
        for j in 0..cols {
            sandbox.bind("col", j as f64)?;
            line.push(sandbox.run(&expr)?);
        }
        grid.push(line);
    }
    Ok(grid)
}

/// Evaluate named steps in order, then a final expression
///
/// Each step is checked against the names known at that point, so a step can
/// only reference the initial bindings and earlier steps.
pub fn evaluate_steps(
    mut sandbox: Sandbox,
    steps: &[(String, String)],
    final_expression: &str,
) -> FormulaResult<(f64, Vec<(String, f64)>)> {
    let mut computed = Vec::with_capacity(steps.len());
    for (name, text) in steps {
        let value = sandbox.evaluate(text)?;
        sandbox.bind(name, value)?;
        computed.push((name.clone(), value));
    }
    let result = sandbox.evaluate(final_expression)?;
    Ok((result, computed))
}
