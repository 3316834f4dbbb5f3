//! Lowering of `from` queries to SQL.
//!
//! Member chains (`acct.bank.name`) become `LEFT JOIN`s with aliases `t1`,
//! `t2`, ..., numbered per [`SqlGenerator::generate`] call. Base-table
//! columns are qualified with the table name, or replaced by their remap
//! expression when the schema remaps them.

use thiserror::Error;
use tracing::debug;

use crate::ast::{BinOp, Node, NodeKind, Position, Rewrite, SelectItem, UnaryOp};
use crate::schema::Schema;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("[{}, {}] Unknown field \"{field}\" on table \"{table}\"", .pos.line + 1, .pos.col + 1)]
    UnknownField {
        table: String,
        field: String,
        pos: Position,
    },

    #[error("[{}, {}] Table \"{table}\" is not joinable", .pos.line + 1, .pos.col + 1)]
    NotJoinable { table: String, pos: Position },

    #[error("[{}, {}] {kind} expressions are not supported in queries", .pos.line + 1, .pos.col + 1)]
    Unsupported { kind: &'static str, pos: Position },
}

/// Output of one `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSql {
    pub sql: String,
    /// The `where` clause as written, before join and remap rewriting
    pub where_: Option<Node>,
    /// Distinct tables joined into the query
    pub dependencies: Vec<String>,
    /// Base-table columns the query reads
    pub fields: Vec<String>,
}

pub struct SqlGenerator<'a> {
    schema: &'a Schema,
    table: String,
    uid: usize,
    joins: Vec<String>,
    joined_tables: Vec<String>,
    fields: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

impl<'a> SqlGenerator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        SqlGenerator {
            schema,
            table: String::new(),
            uid: 0,
            joins: vec![],
            joined_tables: vec![],
            fields: vec![],
        }
    }

    pub fn generate(
        &mut self,
        table: &str,
        where_: Option<&Node>,
        groupby: Option<&Node>,
        select: &[SelectItem],
    ) -> Result<GeneratedSql, SchemaError> {
        self.table = table.to_string();
        self.uid = 0;
        self.joins.clear();
        self.joined_tables.clear();
        self.fields.clear();

        let where_sql = where_.map(|w| self.lower_and_render(w)).transpose()?;
        let groupby_sql = groupby.map(|g| self.lower_and_render(g)).transpose()?;
        let select_sql = select
            .iter()
            .map(|item| {
                let expr = self.lower_and_render(&item.expr)?;
                Ok(match &item.alias {
                    Some(alias) => format!("{} AS {}", expr, alias),
                    None => expr,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        let mut conditions: Vec<String> = where_sql.into_iter().collect();
        for filter in self.schema.filters(table) {
            conditions.push(format!("{}.{} = {}", table, filter.column, filter.value));
            push_unique(&mut self.fields, &filter.column);
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            if select_sql.is_empty() {
                "*".to_string()
            } else {
                select_sql.join(", ")
            },
            table
        );
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        if let Some(groupby) = groupby_sql {
            sql.push_str(" GROUP BY ");
            sql.push_str(&groupby);
        }

        debug!(table, %sql, joins = self.joins.len(), "generated query");

        Ok(GeneratedSql {
            sql,
            where_: where_.cloned(),
            dependencies: self.joined_tables.clone(),
            fields: self.fields.clone(),
        })
    }

    fn lower_and_render(&mut self, node: &Node) -> Result<String, SchemaError> {
        let lowered = self.lower(node.clone())?;
        render(&lowered)
    }

    /// Rewrite member chains and base columns into qualified SQL names.
    fn lower(&mut self, node: Node) -> Result<Node, SchemaError> {
        node.rewrite(&mut |n| self.lower_node(n))
    }

    fn lower_node(&mut self, node: Node) -> Result<Rewrite, SchemaError> {
        let pos = node.pos;
        match node.kind {
            NodeKind::Member { .. } => {
                let name = self.resolve_member(&node)?;
                Ok(Rewrite::Replace(Node::symbol(name, pos)))
            }
            NodeKind::Symbol(name) if name == "null" => Ok(Rewrite::Replace(Node::symbol(name, pos))),
            NodeKind::Symbol(name) => {
                push_unique(&mut self.fields, &name);
                let qualified = match self.schema.remap(&self.table, &name) {
                    Some(remap) => {
                        let join = remap.join.replace("{parent}", &self.table);
                        push_unique(&mut self.joins, &join);
                        remap.expr()
                    }
                    None => format!("{}.{}", self.table, name),
                };
                Ok(Rewrite::Replace(Node::symbol(qualified, pos)))
            }
            // Function names are SQL functions, only the arguments are lowered
            NodeKind::FunCall { callee, args } => {
                let args = self.lower(*args)?;
                Ok(Rewrite::Replace(Node::new(
                    NodeKind::FunCall {
                        callee,
                        args: Box::new(args),
                    },
                    pos,
                )))
            }
            kind @ (NodeKind::Query(_) | NodeKind::If { .. } | NodeKind::Root(_)) => {
                let node = Node::new(kind, pos);
                Err(SchemaError::Unsupported {
                    kind: node.kind_name(),
                    pos,
                })
            }
            kind => Ok(Rewrite::Descend(Node::new(kind, pos))),
        }
    }

    /// Join every hop of a member chain and return `alias.last_field`.
    fn resolve_member(&mut self, node: &Node) -> Result<String, SchemaError> {
        let mut path = vec![];
        let mut current = node;
        loop {
            match &current.kind {
                NodeKind::Member { object, property } => {
                    path.push(property.name.as_str());
                    current = object;
                }
                NodeKind::Symbol(name) => {
                    path.push(name.as_str());
                    break;
                }
                _ => {
                    return Err(SchemaError::NotJoinable {
                        table: self.table.clone(),
                        pos: current.pos,
                    });
                }
            }
        }
        path.reverse();

        let Some((last, hops)) = path.split_last() else {
            return Err(SchemaError::NotJoinable {
                table: self.table.clone(),
                pos: node.pos,
            });
        };

        let mut table = self.table.clone();
        let mut parent = self.table.clone();
        for (i, field) in hops.iter().enumerate() {
            self.uid += 1;
            let alias = format!("t{}", self.uid);

            let Some(fields) = self.schema.join_fields(&table) else {
                return Err(SchemaError::NotJoinable { table, pos: node.pos });
            };
            let Some(join) = fields.get(*field) else {
                return Err(SchemaError::UnknownField {
                    table,
                    field: field.to_string(),
                    pos: node.pos,
                });
            };

            if i == 0 {
                push_unique(&mut self.fields, join.column(field));
            }
            self.joins.push(join.join_clause(field, &alias, &parent));
            push_unique(&mut self.joined_tables, &join.table);

            table = join.table.clone();
            parent = alias;
        }

        Ok(format!("{}.{}", parent, last))
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        Value::Boolean(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        other => other.as_string(),
    }
}

fn is_null(node: &Node) -> bool {
    node.as_symbol() == Some("null")
}

/// Render a lowered expression.
fn render(node: &Node) -> Result<String, SchemaError> {
    Ok(match &node.kind {
        NodeKind::Literal(value) => render_literal(value),
        NodeKind::Symbol(name) if name == "null" => "NULL".to_string(),
        NodeKind::Symbol(name) => name.clone(),
        NodeKind::UnaryOp { op, target } => match op {
            UnaryOp::Negate => format!("(-{})", render(target)?),
            UnaryOp::Not => format!("(NOT {})", render(target)?),
        },
        NodeKind::BinOp { op, left, right } => match op {
            BinOp::Equal | BinOp::NotEqual if is_null(left) || is_null(right) => {
                let other = if is_null(right) { left } else { right };
                let test = if *op == BinOp::Equal { "IS NULL" } else { "IS NOT NULL" };
                format!("{} {}", render(other)?, test)
            }
            BinOp::Like => format!("{} LIKE {}", render(left)?, render(right)?),
            BinOp::NotLike => format!("{} NOT LIKE {}", render(left)?, render(right)?),
            _ => format!("({} {} {})", render(left)?, op, render(right)?),
        },
        NodeKind::FunCall { callee, args } => {
            let name = match callee.as_symbol() {
                Some(name) => name.to_string(),
                None => render(callee)?,
            };
            format!("{}({})", name, render(args)?)
        }
        NodeKind::NodeList(items) => items
            .iter()
            .map(render)
            .collect::<Result<Vec<_>, _>>()?
            .join(", "),
        _ => {
            return Err(SchemaError::Unsupported {
                kind: node.kind_name(),
                pos: node.pos,
            });
        }
    })
}
