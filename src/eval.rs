//! Expression evaluation for `let` and `try`.
//!
//! Expressions are tokenized and parsed into an expression tree; identifiers are looked
//! up as whole tokens in the variable table when the tree is evaluated.

use crate::lexer::{self, LexingError};
use crate::parser::{self, BinaryOp, Expr, ParsingError, UnaryOp};
use crate::value::{Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// Evaluation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Lexing(#[from] LexingError),
    #[error("syntax error: {0}")]
    Parsing(#[from] ParsingError),
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("unsupported operand type(s) for {op}: '{lhs}' and '{rhs}'")]
    UnsupportedOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("bad operand type for unary {op}: '{operand}'")]
    BadUnaryOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("numeric overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Upper bound for strings built by repetition.
const MAX_STRING_LEN: usize = 1 << 20;

/// Tokenize, parse and evaluate `source` against `variables`.
pub fn evaluate(source: &str, variables: &BTreeMap<String, Value>) -> EvalResult<Value> {
    let tokens = lexer::split_into_tokens(source)?;
    let ast = parser::construct_ast(tokens)?;
    eval_expr(&ast, variables)
}

fn eval_expr(expr: &Expr, variables: &BTreeMap<String, Value>) -> EvalResult<Value> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Var(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Unary(op, operand) => eval_unary(*op, eval_expr(operand, variables)?),
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval_expr(lhs, variables)?;
            let rhs = eval_expr(rhs, variables)?;
            eval_binary(*op, lhs, rhs)
        }
        Expr::And(lhs, rhs) => {
            let lhs = eval_expr(lhs, variables)?;
            if lhs.is_truthy() {
                eval_expr(rhs, variables)
            } else {
                Ok(lhs)
            }
        }
        Expr::Or(lhs, rhs) => {
            let lhs = eval_expr(lhs, variables)?;
            if lhs.is_truthy() {
                Ok(lhs)
            } else {
                eval_expr(rhs, variables)
            }
        }
    }
}

fn eval_unary(op: UnaryOp, operand: Value) -> EvalResult<Value> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!operand.is_truthy()));
    }
    let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
    let n = operand.as_number().ok_or(EvalError::BadUnaryOperand {
        op: symbol,
        operand: operand.type_name(),
    })?;
    let result = match (op, n) {
        (UnaryOp::Neg, Number::Int(n)) => Number::Int(n.checked_neg().ok_or(EvalError::Overflow)?),
        (UnaryOp::Neg, Number::Float(f)) => Number::Float(-f),
        (_, n) => n,
    };
    Ok(result.into())
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::NotEq => return Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            return compare(op, &lhs, &rhs).map(Value::Bool);
        }
        _ => {}
    }

    match (&lhs, &rhs) {
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => return Ok(Value::Str(format!("{a}{b}"))),
        (Value::Str(s), other) | (other, Value::Str(s)) if op == BinaryOp::Mul => {
            if let Some(Number::Int(times)) = other.as_number() {
                let times = usize::try_from(times.max(0)).map_err(|_| EvalError::Overflow)?;
                if s.len().saturating_mul(times) > MAX_STRING_LEN {
                    return Err(EvalError::Overflow);
                }
                return Ok(Value::Str(s.repeat(times)));
            }
        }
        _ => {}
    }

    let unsupported = || EvalError::UnsupportedOperands {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };
    let a = lhs.as_number().ok_or_else(unsupported)?;
    let b = rhs.as_number().ok_or_else(unsupported)?;
    arithmetic(op, a, b).map(Value::from)
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> EvalResult<Number> {
    use Number::{Float, Int};

    if let (Int(x), Int(y)) = (a, b) {
        let checked = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::FloorDiv | BinaryOp::Mod if y == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::FloorDiv => floor_div(x, y),
            BinaryOp::Mod => floor_mod(x, y),
            BinaryOp::Pow if y >= 0 => u32::try_from(y).ok().and_then(|e| x.checked_pow(e)),
            // True division and negative exponents fall through to floats.
            _ => None,
        };
        match (checked, op) {
            (Some(n), _) => return Ok(Int(n)),
            (None, BinaryOp::Div) => {}
            (None, BinaryOp::Pow) if y < 0 => {}
            (None, _) => return Err(EvalError::Overflow),
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if y == 0.0 => {
            return Err(EvalError::DivisionByZero);
        }
        BinaryOp::Div => x / y,
        BinaryOp::FloorDiv => (x / y).floor(),
        BinaryOp::Mod => x - y * (x / y).floor(),
        BinaryOp::Pow if x == 0.0 && y < 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Pow => x.powf(y),
        _ => unreachable!("comparison operators are handled before arithmetic"),
    };
    // inf and NaN have no representation in the state file.
    if !result.is_finite() {
        return Err(EvalError::Overflow);
    }
    Ok(Float(result))
}

fn floor_div(x: i64, y: i64) -> Option<i64> {
    let q = x.checked_div(y)?;
    if (x % y != 0) && ((x < 0) != (y < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(x: i64, y: i64) -> Option<i64> {
    let r = x.checked_rem(y)?;
    if r != 0 && ((r < 0) != (y < 0)) {
        Some(r + y)
    } else {
        Some(r)
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Str(_), _) | (_, Value::Str(_)) => false,
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        },
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult<bool> {
    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => {
                return Err(EvalError::UnsupportedOperands {
                    op: op.symbol(),
                    lhs: lhs.type_name(),
                    rhs: rhs.type_name(),
                });
            }
        },
    };
    // NaN compares false against everything.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessEq => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}
