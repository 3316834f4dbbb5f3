//! Operator semantics shared by the VM and the SQL interpreter.
//!
//! Arithmetic keeps integers exact: integer-only expressions stay integers,
//! mixed integer/float operands are computed through [`Decimal`] and turned
//! back into an integer when the result is whole. `null` counts as `0` in
//! arithmetic, as an unset cell does in a budget sheet.

use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use thiserror::Error;

use crate::ast::{BinOp, UnaryOp};
use crate::pattern::LikePattern;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// Apply a binary operator to two already evaluated operands.
///
/// `and`/`or` return one of their operands, like the host's logical
/// operators: `a and b` is `a` when `a` is falsy, otherwise `b`.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => arithmetic(op, left, right),
        BinOp::Equal => Ok(Value::Boolean(values_equal(left, right))),
        BinOp::NotEqual => Ok(Value::Boolean(!values_equal(left, right))),
        BinOp::LessThan => Ok(Value::Boolean(compare(left, right) == Some(Ordering::Less))),
        BinOp::GreaterThan => Ok(Value::Boolean(compare(left, right) == Some(Ordering::Greater))),
        BinOp::LessEqual => Ok(Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinOp::GreaterEqual => Ok(Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        BinOp::Like => like(left, right).map(Value::Boolean),
        BinOp::NotLike => like(left, right).map(|m| Value::Boolean(!m)),
        BinOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
    }
}

pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, OpError> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOp::Negate => match numeric(value) {
            Some(Number::Int(n)) => Ok(n
                .checked_neg()
                .map(Value::Integer)
                .unwrap_or(Value::Float(-(n as f64)))),
            Some(Number::Float(n)) => Ok(Value::Float(-n)),
            None => Err(OpError::TypeError(format!("Cannot negate {}", value.type_name()))),
        },
    }
}

/// Operand of an arithmetic operator.
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

/// Numeric view of a value for arithmetic: `null` is `0`, booleans are `1`/`0`.
fn numeric(value: &Value) -> Option<Number> {
    match value {
        Value::Integer(n) => Some(Number::Int(*n)),
        Value::Float(n) => Some(Number::Float(*n)),
        Value::Null => Some(Number::Int(0)),
        Value::Boolean(b) => Some(Number::Int(*b as i64)),
        _ => None,
    }
}

fn concat_part(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.as_string(),
    }
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    if op == BinOp::Add && (matches!(left, Value::String(_)) || matches!(right, Value::String(_))) {
        return Ok(Value::String(format!("{}{}", concat_part(left), concat_part(right))));
    }

    let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Err(OpError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op,
            left.type_name(),
            right.type_name()
        )));
    };

    match (a, b) {
        (Number::Int(a), Number::Int(b)) => integer_op(op, a, b),
        (Number::Float(a), Number::Float(b)) => float_op(op, a, b),
        (Number::Int(a), Number::Float(b)) => {
            if let Some(ad) = Decimal::from_i64(a)
                && let Some(bd) = Decimal::from_f64(b)
                && let Some(result) = decimal_op(op, ad, bd)?
            {
                return Ok(result);
            }
            float_op(op, a as f64, b)
        }
        (Number::Float(a), Number::Int(b)) => {
            if let Some(ad) = Decimal::from_f64(a)
                && let Some(bd) = Decimal::from_i64(b)
                && let Some(result) = decimal_op(op, ad, bd)?
            {
                return Ok(result);
            }
            float_op(op, a, b as f64)
        }
    }
}

fn integer_op(op: BinOp, a: i64, b: i64) -> Result<Value, OpError> {
    let checked = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => {
            if b == 0 {
                return Err(OpError::DivisionByZero);
            }
            // Check if division is exact; if not, return Float
            if a % b != 0 {
                return Ok(Value::Float(a as f64 / b as f64));
            }
            a.checked_div(b)
        }
        _ => None,
    };
    match checked {
        Some(n) => Ok(Value::Integer(n)),
        None => float_op(op, a as f64, b as f64),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> Result<Value, OpError> {
    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => {
            if b == 0.0 {
                return Err(OpError::DivisionByZero);
            }
            a / b
        }
        _ => return Err(OpError::TypeError(format!("'{}' is not arithmetic", op))),
    }))
}

fn decimal_op(op: BinOp, a: Decimal, b: Decimal) -> Result<Option<Value>, OpError> {
    let rd = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => {
            if b.is_zero() {
                return Err(OpError::DivisionByZero);
            }
            a.checked_div(b)
        }
        _ => None,
    };
    let Some(rd) = rd else {
        return Ok(None);
    };
    if rd.is_integer()
        && let Some(r) = rd.to_i64()
    {
        return Ok(Some(Value::Integer(r)));
    }
    Ok(rd.to_f64().map(Value::Float))
}

/// Equality with integers and floats compared by numeric value.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => (*a as f64) == *b,
        (a, b) => a == b,
    }
}

/// Ordering of two comparable values; `None` when the types don't compare.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_float(), b.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

/// SQL `LIKE`: `%` matches any run, `_` one character, case-insensitive.
pub fn like(value: &Value, pattern: &Value) -> Result<bool, OpError> {
    let Value::String(pattern) = pattern else {
        return Err(OpError::TypeError(format!(
            "LIKE pattern must be string, got {}",
            pattern.type_name()
        )));
    };
    if value.is_null() {
        return Ok(false);
    }

    let compiled = LikePattern::cached(pattern).map_err(|e| OpError::TypeError(format!("invalid pattern: {e}")))?;
    Ok(compiled.matches(&concat_part(value)))
}
