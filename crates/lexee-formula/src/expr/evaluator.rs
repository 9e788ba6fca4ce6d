//! Expression interpreter
//!
//! Evaluates an AST against the sandbox's closed environment. Names resolve
//! only to bound variables and the `pi`/`e` constants; calls resolve only to
//! the whitelisted math functions.

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::Sandbox;
use crate::numeric;
use lexee_core::{FormulaError, FormulaResult};

/// Evaluate an expression
pub fn evaluate(expr: &Expr, sandbox: &Sandbox) -> FormulaResult<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Name(name) => resolve_name(name, sandbox),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, sandbox)?;
            Ok(match op {
                UnaryOperator::Plus => value,
                UnaryOperator::Minus => -value,
            })
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, sandbox)?;
            let r = evaluate(right, sandbox)?;
            evaluate_binary_op(*op, l, r)
        }
        Expr::Call { name, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, sandbox))
                .collect::<FormulaResult<Vec<f64>>>()?;
            call_function(name, &values)
        }
    }
}

fn resolve_name(name: &str, sandbox: &Sandbox) -> FormulaResult<f64> {
    if let Some(value) = sandbox.get(name) {
        return Ok(value);
    }
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(FormulaError::UnsafeToken {
            token: name.to_string(),
        }),
    }
}

fn evaluate_binary_op(op: BinaryOperator, l: f64, r: f64) -> FormulaResult<f64> {
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Err(FormulaError::domain("division by zero"));
            }
            l / r
        }
        BinaryOperator::Modulo => {
            if r == 0.0 {
                return Err(FormulaError::domain("modulo by zero"));
            }
            // Sign follows the divisor
            l - r * (l / r).floor()
        }
        BinaryOperator::Power => {
            if l == 0.0 && r < 0.0 {
                return Err(FormulaError::domain("zero raised to a negative power"));
            }
            l.powf(r)
        }
    };
    finite(result)
}

fn call_function(name: &str, args: &[f64]) -> FormulaResult<f64> {
    let result = match name {
        "abs" => one(name, args)?.abs(),
        "sqrt" => {
            let x = one(name, args)?;
            if x < 0.0 {
                return Err(FormulaError::domain("sqrt of a negative number"));
            }
            x.sqrt()
        }
        "ceil" => one(name, args)?.ceil(),
        "floor" => one(name, args)?.floor(),
        "log10" => positive_log(one(name, args)?)?.log10(),
        "log" => match args {
            [x] => positive_log(*x)?.ln(),
            [x, base] => {
                let base = positive_log(*base)?;
                if base == 1.0 {
                    return Err(FormulaError::domain("log base cannot be 1"));
                }
                positive_log(*x)?.ln() / base.ln()
            }
            _ => return Err(arity(name, "1 or 2")),
        },
        "round" => match args {
            [x] => numeric::round(*x, 0),
            [x, digits] => numeric::round(*x, digits.trunc().clamp(-300.0, 300.0) as i32),
            _ => return Err(arity(name, "1 or 2")),
        },
        "pow" => match args {
            [base, exponent] => return evaluate_binary_op(BinaryOperator::Power, *base, *exponent),
            _ => return Err(arity(name, "2")),
        },
        "min" => at_least_one(name, args)?.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => at_least_one(name, args)?
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max),
        "sum" => args.iter().sum(),
        _ => {
            return Err(FormulaError::UnsafeToken {
                token: name.to_string(),
            })
        }
    };
    finite(result)
}

fn one(name: &str, args: &[f64]) -> FormulaResult<f64> {
    match args {
        [x] => Ok(*x),
        _ => Err(arity(name, "1")),
    }
}

fn at_least_one<'a>(name: &str, args: &'a [f64]) -> FormulaResult<&'a [f64]> {
    if args.is_empty() {
        Err(arity(name, "at least 1"))
    } else {
        Ok(args)
    }
}

fn positive_log(x: f64) -> FormulaResult<f64> {
    if x <= 0.0 {
        Err(FormulaError::domain("log of a non-positive number"))
    } else {
        Ok(x)
    }
}

fn arity(name: &str, expected: &str) -> FormulaError {
    FormulaError::domain(format!("{}() takes {} argument(s)", name, expected))
}

fn finite(value: f64) -> FormulaResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::domain("result is not a finite number"))
    }
}
