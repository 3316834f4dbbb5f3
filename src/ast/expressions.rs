use serde::Serialize;

use crate::ast::{BinOp, Position, QueryNode, SelectItem, UnaryOp};
use crate::value::Value;

/// Field name on the right of a `.` in a member chain.
///
/// Member properties are always plain names, never expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub pos: Position,
}

/// Abstract Syntax Tree node: a kind plus the source position used in
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    /// Number, string or boolean literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// -1.5
    /// "rent"
    /// ```
    Literal(Value),

    /// Bare name; cell reference once namespaced (`budget!total`)
    Symbol(String),

    /// Prefix operation (`-x`, `not x`)
    UnaryOp { op: UnaryOp, target: Box<Node> },

    /// Binary operation (arithmetic, comparison, logical)
    BinOp {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Function call; `args` is always a `NodeList`
    ///
    /// # Examples
    /// ```text
    /// count(date)
    /// max(a, b)
    /// ```
    FunCall { callee: Box<Node>, args: Box<Node> },

    /// Field access along a join path
    ///
    /// # Examples
    /// ```text
    /// acct.offbudget
    /// description.transfer_acct.offbudget
    /// ```
    Member { object: Box<Node>, property: Property },

    /// `from` query block
    Query(Box<QueryNode>),

    /// `if (cond) { body } else { else_ }`
    If {
        cond: Box<Node>,
        body: Box<Node>,
        else_: Option<Box<Node>>,
    },

    /// Ordered list of nodes (call arguments)
    NodeList(Vec<Node>),

    /// Top of a parsed formula; empty for empty input
    Root(Vec<Node>),
}

/// Visitor decision for [`Node::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Do not visit this node's children
    Skip,
}

/// Visitor decision for [`Node::rewrite`].
#[derive(Debug)]
pub enum Rewrite {
    /// Use this node as-is, without visiting its children
    Replace(Node),
    /// Keep rewriting inside this node's children
    Descend(Node),
}

impl Node {
    pub fn new(kind: NodeKind, pos: Position) -> Self {
        Node { kind, pos }
    }

    pub fn literal(value: impl Into<Value>, pos: Position) -> Self {
        Node::new(NodeKind::Literal(value.into()), pos)
    }

    pub fn symbol(name: impl Into<String>, pos: Position) -> Self {
        Node::new(NodeKind::Symbol(name.into()), pos)
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Literal(_) => "Literal",
            NodeKind::Symbol(_) => "Symbol",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::BinOp { .. } => "BinOp",
            NodeKind::FunCall { .. } => "FunCall",
            NodeKind::Member { .. } => "Member",
            NodeKind::Query(_) => "Query",
            NodeKind::If { .. } => "If",
            NodeKind::NodeList(_) => "NodeList",
            NodeKind::Root(_) => "Root",
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Literal(_) | NodeKind::Symbol(_) => vec![],
            NodeKind::UnaryOp { target, .. } => vec![target],
            NodeKind::BinOp { left, right, .. } => vec![left, right],
            NodeKind::FunCall { callee, args } => vec![callee, args],
            NodeKind::Member { object, .. } => vec![object],
            NodeKind::Query(query) => {
                let mut children: Vec<&Node> = Vec::new();
                children.extend(query.where_.iter());
                children.extend(query.groupby.iter());
                children.extend(query.select.iter().map(|item| &item.expr));
                children
            }
            NodeKind::If { cond, body, else_ } => {
                let mut children: Vec<&Node> = vec![cond, body];
                children.extend(else_.as_deref());
                children
            }
            NodeKind::NodeList(nodes) | NodeKind::Root(nodes) => nodes.iter().collect(),
        }
    }

    /// Pre-order traversal.
    pub fn walk<F: FnMut(&Node) -> Walk>(&self, f: &mut F) {
        if f(self) == Walk::Skip {
            return;
        }
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Top-down rewrite. The visitor sees each node before its children and
    /// either replaces it outright or asks to descend.
    pub fn rewrite<E, F>(self, f: &mut F) -> Result<Node, E>
    where
        F: FnMut(Node) -> Result<Rewrite, E>,
    {
        match f(self)? {
            Rewrite::Replace(node) => Ok(node),
            Rewrite::Descend(node) => node.map_children(&mut |child| child.rewrite(&mut *f)),
        }
    }

    /// Rebuild this node with every direct child passed through `f`.
    pub fn map_children<E, F>(self, f: &mut F) -> Result<Node, E>
    where
        F: FnMut(Node) -> Result<Node, E>,
    {
        let pos = self.pos;
        let kind = match self.kind {
            kind @ (NodeKind::Literal(_) | NodeKind::Symbol(_)) => kind,
            NodeKind::UnaryOp { op, target } => NodeKind::UnaryOp {
                op,
                target: Box::new(f(*target)?),
            },
            NodeKind::BinOp { op, left, right } => NodeKind::BinOp {
                op,
                left: Box::new(f(*left)?),
                right: Box::new(f(*right)?),
            },
            NodeKind::FunCall { callee, args } => NodeKind::FunCall {
                callee: Box::new(f(*callee)?),
                args: Box::new(f(*args)?),
            },
            NodeKind::Member { object, property } => NodeKind::Member {
                object: Box::new(f(*object)?),
                property,
            },
            NodeKind::Query(query) => {
                let QueryNode {
                    table,
                    select,
                    where_,
                    groupby,
                    calculated,
                } = *query;
                let where_ = where_.map(&mut *f).transpose()?;
                let groupby = groupby.map(&mut *f).transpose()?;
                let select = select
                    .into_iter()
                    .map(|item| {
                        Ok(SelectItem {
                            expr: f(item.expr)?,
                            alias: item.alias,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?;
                NodeKind::Query(Box::new(QueryNode {
                    table,
                    select,
                    where_,
                    groupby,
                    calculated,
                }))
            }
            NodeKind::If { cond, body, else_ } => NodeKind::If {
                cond: Box::new(f(*cond)?),
                body: Box::new(f(*body)?),
                else_: match else_ {
                    Some(node) => Some(Box::new(f(*node)?)),
                    None => None,
                },
            },
            NodeKind::NodeList(nodes) => {
                NodeKind::NodeList(nodes.into_iter().map(&mut *f).collect::<Result<_, E>>()?)
            }
            NodeKind::Root(nodes) => {
                NodeKind::Root(nodes.into_iter().map(&mut *f).collect::<Result<_, E>>()?)
            }
        };
        Ok(Node { kind, pos })
    }
}
