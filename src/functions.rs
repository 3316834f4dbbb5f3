//! Builtin functions callable from formulas.

use std::collections::HashMap;

use thiserror::Error;

use crate::ops;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("{name}() expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("{name}(): {message}")]
    Invalid { name: String, message: String },

    #[error(transparent)]
    Op(#[from] ops::OpError),
}

pub type Builtin = fn(&str, &[Value]) -> Result<Value, FunctionError>;

/// Name to function table used by `CALL`.
#[derive(Clone)]
pub struct Functions {
    table: HashMap<String, Builtin>,
}

impl Default for Functions {
    fn default() -> Self {
        Functions::builtins()
    }
}

impl std::fmt::Debug for Functions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.table.keys().collect();
        names.sort();
        f.debug_struct("Functions").field("names", &names).finish()
    }
}

impl Functions {
    pub fn empty() -> Self {
        Functions { table: HashMap::new() }
    }

    pub fn builtins() -> Self {
        let mut functions = Functions::empty();
        functions.register("number", number);
        functions.register("abs", abs);
        functions.register("round", round);
        functions.register("floor", floor);
        functions.register("ceil", ceil);
        functions.register("min", min);
        functions.register("max", max);
        functions.register("sum", sum);
        functions.register("length", length);
        functions.register("upper", upper);
        functions.register("lower", lower);
        functions.register("concat", concat);
        functions.register("coalesce", coalesce);
        functions
    }

    pub fn register(&mut self, name: impl Into<String>, f: Builtin) {
        self.table.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<Builtin> {
        self.table.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }
}

fn exactly<'a>(name: &str, args: &'a [Value], n: usize) -> Result<&'a [Value], FunctionError> {
    if args.len() != n {
        return Err(FunctionError::Arity {
            name: name.to_string(),
            expected: n.to_string(),
            got: args.len(),
        });
    }
    Ok(args)
}

fn at_least_one(name: &str, args: &[Value]) -> Result<(), FunctionError> {
    if args.is_empty() {
        return Err(FunctionError::Arity {
            name: name.to_string(),
            expected: "at least 1".to_string(),
            got: 0,
        });
    }
    Ok(())
}

fn invalid(name: &str, message: String) -> FunctionError {
    FunctionError::Invalid {
        name: name.to_string(),
        message,
    }
}

/// Arguments with arrays (select query results) spliced in.
fn flatten(args: &[Value]) -> Vec<Value> {
    let mut out = vec![];
    for arg in args {
        match arg {
            Value::Array(items) => out.extend(flatten(items)),
            Value::Object(row) if row.len() == 1 => out.extend(row.values().cloned()),
            other => out.push(other.clone()),
        }
    }
    out
}

fn number(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let args = exactly(name, args, 1)?;
    Ok(match &args[0] {
        Value::Integer(_) | Value::Float(_) => args[0].clone(),
        Value::Boolean(b) => Value::Integer(*b as i64),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Value::Integer(n)
            } else if let Ok(n) = s.parse::<f64>() {
                Value::Float(n)
            } else {
                Value::Integer(0)
            }
        }
        _ => Value::Integer(0),
    })
}

fn abs(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let args = exactly(name, args, 1)?;
    match &args[0] {
        Value::Integer(n) => Ok(n
            .checked_abs()
            .map(Value::Integer)
            .unwrap_or(Value::Float((*n as f64).abs()))),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        Value::Null => Ok(Value::Integer(0)),
        other => Err(invalid(name, format!("expected number, got {}", other.type_name()))),
    }
}

fn float_to_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Integer(n as i64)
    } else {
        Value::Float(n)
    }
}

fn rounding(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, FunctionError> {
    let args = exactly(name, args, 1)?;
    match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::Float(n) => Ok(float_to_value(f(*n))),
        Value::Null => Ok(Value::Integer(0)),
        other => Err(invalid(name, format!("expected number, got {}", other.type_name()))),
    }
}

fn round(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    rounding(name, args, f64::round)
}

fn floor(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    rounding(name, args, f64::floor)
}

fn ceil(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    rounding(name, args, f64::ceil)
}

fn extremum(name: &str, args: &[Value], want: std::cmp::Ordering) -> Result<Value, FunctionError> {
    at_least_one(name, args)?;
    let mut best: Option<Value> = None;
    for value in flatten(args).into_iter().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(value),
            Some(current) => match ops::compare(&value, &current) {
                Some(ord) if ord == want => Some(value),
                Some(_) => Some(current),
                None => {
                    return Err(invalid(
                        name,
                        format!("cannot compare {} and {}", value.type_name(), current.type_name()),
                    ));
                }
            },
        };
    }
    Ok(best.unwrap_or(Value::Null))
}

fn min(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    extremum(name, args, std::cmp::Ordering::Less)
}

fn max(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    extremum(name, args, std::cmp::Ordering::Greater)
}

fn sum(_name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let mut total = Value::Integer(0);
    for value in flatten(args) {
        total = ops::binary(crate::ast::BinOp::Add, &total, &value)?;
    }
    Ok(total)
}

fn length(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let args = exactly(name, args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(row) => row.len(),
        Value::Null => 0,
        other => other.as_string().chars().count(),
    };
    Ok(Value::Integer(len as i64))
}

fn upper(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let args = exactly(name, args, 1)?;
    Ok(match &args[0] {
        Value::Null => Value::Null,
        v => Value::String(v.as_string().to_uppercase()),
    })
}

fn lower(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let args = exactly(name, args, 1)?;
    Ok(match &args[0] {
        Value::Null => Value::Null,
        v => Value::String(v.as_string().to_lowercase()),
    })
}

fn concat(_name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    let mut out = String::new();
    for value in args.iter().filter(|v| !v.is_null()) {
        out.push_str(&value.as_string());
    }
    Ok(Value::String(out))
}

fn coalesce(_name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
        let functions = Functions::builtins();
        let f = functions.get(name).unwrap();
        f(name, args)
    }

    #[test]
    fn test_number_parses_strings() {
        assert_eq!(call("number", &["42".into()]).unwrap(), Value::Integer(42));
        assert_eq!(call("number", &["1.5".into()]).unwrap(), Value::Float(1.5));
        assert_eq!(call("number", &["abc".into()]).unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_sum_flattens_rows() {
        let rows = Value::Array(vec![
            crate::value::Row::new().with("amount", 10).into_value(),
            crate::value::Row::new().with("amount", -4).into_value(),
        ]);
        assert_eq!(call("sum", &[rows]).unwrap(), Value::Integer(6));
    }

    #[test]
    fn test_min_max() {
        let args = [Value::Integer(3), Value::Float(1.5), Value::Null, Value::Integer(7)];
        assert_eq!(call("min", &args).unwrap(), Value::Float(1.5));
        assert_eq!(call("max", &args).unwrap(), Value::Integer(7));
        assert!(matches!(call("max", &[]), Err(FunctionError::Arity { .. })));
    }

    #[test]
    fn test_coalesce_and_round() {
        assert_eq!(
            call("coalesce", &[Value::Null, "x".into(), "y".into()]).unwrap(),
            Value::String("x".into())
        );
        assert_eq!(call("round", &[Value::Float(2.5)]).unwrap(), Value::Integer(3));
        assert_eq!(call("floor", &[Value::Float(-1.2)]).unwrap(), Value::Integer(-2));
    }
}
