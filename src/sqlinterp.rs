//! In-memory evaluation of a query's `where` clause against one row.
//!
//! Used to decide whether a changed row can affect a cached query result.
//! Anything that cannot be evaluated from the row alone (member chains
//! into joined tables, function calls) is treated as matching.

use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::NaiveDate;
use tracing::trace;

use crate::ast::{BinOp, Node, NodeKind, UnaryOp};
use crate::ops::{self, OpError};
use crate::schema::Schema;
use crate::value::{Record, Value};

static BUDGET_SCHEMA: LazyLock<Schema> = LazyLock::new(Schema::budget);

/// Three-valued result: a concrete value, or "cannot tell, assume it matches".
#[derive(Debug, Clone, PartialEq)]
enum Tri {
    Value(Value),
    AlwaysTrue,
}

impl Tri {
    fn is_truthy(&self) -> bool {
        match self {
            Tri::Value(v) => v.is_truthy(),
            Tri::AlwaysTrue => true,
        }
    }

    fn is_concrete_falsy(&self) -> bool {
        matches!(self, Tri::Value(v) if !v.is_truthy())
    }

    fn is_concrete_truthy(&self) -> bool {
        matches!(self, Tri::Value(v) if v.is_truthy())
    }
}

/// Whether `row` of `table` satisfies `where_` under the budget schema.
pub fn interpret(where_: Option<&Node>, row: &Record, table: &str) -> bool {
    SqlInterpreter::new(&BUDGET_SCHEMA).matches(where_, row, table)
}

pub struct SqlInterpreter<'a> {
    schema: &'a Schema,
}

impl<'a> SqlInterpreter<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        SqlInterpreter { schema }
    }

    pub fn matches(&self, where_: Option<&Node>, row: &Record, table: &str) -> bool {
        for filter in self.schema.filters(table) {
            if let Some(value) = row.get(&filter.column) {
                let value = match value {
                    Value::Boolean(b) => Value::Integer(*b as i64),
                    other => other.clone(),
                };
                if !ops::values_equal(&value, &Value::Integer(filter.value)) {
                    trace!(table, column = %filter.column, "row excluded by table filter");
                    return false;
                }
            }
        }

        let Some(where_) = where_ else {
            return true;
        };
        let result = evaluate(where_, row);
        trace!(table, ?result, "interpreted where clause");
        result.is_truthy()
    }
}

fn evaluate(node: &Node, row: &Record) -> Tri {
    match &node.kind {
        NodeKind::Literal(value) => Tri::Value(value.clone()),
        NodeKind::Symbol(name) if name == "null" => Tri::Value(Value::Null),
        NodeKind::Symbol(name) => Tri::Value(row.get(name).cloned().unwrap_or_default()),
        NodeKind::UnaryOp { op, target } => match evaluate(target, row) {
            Tri::AlwaysTrue => Tri::AlwaysTrue,
            Tri::Value(value) => match op {
                UnaryOp::Not => Tri::Value(Value::Boolean(!value.is_truthy())),
                UnaryOp::Negate => match ops::unary(*op, &value) {
                    Ok(value) => Tri::Value(value),
                    Err(err) => undecidable(&err),
                },
            },
        },
        NodeKind::BinOp { op, left, right } => {
            let left = evaluate(left, row);
            let right = evaluate(right, row);
            match op {
                BinOp::And => {
                    if left.is_concrete_falsy() {
                        left
                    } else if right.is_concrete_falsy() {
                        right
                    } else if left == Tri::AlwaysTrue || right == Tri::AlwaysTrue {
                        Tri::AlwaysTrue
                    } else {
                        right
                    }
                }
                BinOp::Or => {
                    if left.is_concrete_truthy() {
                        left
                    } else if right.is_concrete_truthy() {
                        right
                    } else if left == Tri::AlwaysTrue || right == Tri::AlwaysTrue {
                        Tri::AlwaysTrue
                    } else {
                        right
                    }
                }
                _ => match (left, right) {
                    (Tri::Value(l), Tri::Value(r)) => match apply(*op, &l, &r) {
                        Ok(value) => Tri::Value(value),
                        Err(err) => undecidable(&err),
                    },
                    _ => Tri::AlwaysTrue,
                },
            }
        }
        // Needs other tables or SQL functions
        NodeKind::Member { .. } | NodeKind::FunCall { .. } => Tri::AlwaysTrue,
        NodeKind::Query(_) | NodeKind::If { .. } | NodeKind::NodeList(_) | NodeKind::Root(_) => Tri::AlwaysTrue,
    }
}

/// SQLite coerces operands these operators reject, so an error cannot
/// exclude the row.
fn undecidable(err: &OpError) -> Tri {
    trace!(error = %err, "operator not decidable in memory");
    Tri::AlwaysTrue
}

fn apply(op: BinOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    if let Some(ordering) = compare_dates(left, right) {
        let result = match op {
            BinOp::Equal => ordering == Ordering::Equal,
            BinOp::NotEqual => ordering != Ordering::Equal,
            BinOp::LessThan => ordering == Ordering::Less,
            BinOp::GreaterThan => ordering == Ordering::Greater,
            BinOp::LessEqual => ordering != Ordering::Greater,
            BinOp::GreaterEqual => ordering != Ordering::Less,
            _ => return ops::binary(op, left, right),
        };
        return Ok(Value::Boolean(result));
    }
    ops::binary(op, left, right)
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        Value::Integer(n) if (10_000_101..=99_991_231).contains(n) => {
            NaiveDate::parse_from_str(&n.to_string(), "%Y%m%d").ok()
        }
        _ => None,
    }
}

/// Calendar comparison when one side is an ISO date string and the other
/// is a date too (string, or a `YYYYMMDD` integer as stored).
fn compare_dates(left: &Value, right: &Value) -> Option<Ordering> {
    if !matches!(left, Value::String(_)) && !matches!(right, Value::String(_)) {
        return None;
    }
    Some(parse_date(left)?.cmp(&parse_date(right)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_dates_compare_with_iso_strings() {
        assert_eq!(
            compare_dates(&Value::Integer(20240105), &Value::String("2024-01-01".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_dates(&Value::Integer(20240105), &Value::Integer(20240101)), None);
        assert_eq!(compare_dates(&Value::String("groceries".into()), &Value::Integer(1)), None);
    }
}
