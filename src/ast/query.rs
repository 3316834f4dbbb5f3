use serde::Serialize;

use crate::ast::Node;

/// One entry of a `select { ... }` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectItem {
    pub expr: Node,
    /// Name given with `as`
    pub alias: Option<String>,
}

/// A `from <table> ...` block.
///
/// # Examples
/// ```text
/// from transactions where amount < 0 select { date, amount as spent }
/// from transactions groupby category calculate { sum(amount) }
/// ```
///
/// A calculated query always has exactly one select item and evaluates to a
/// scalar; a select query evaluates to a list of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryNode {
    pub table: String,
    pub select: Vec<SelectItem>,
    pub where_: Option<Node>,
    pub groupby: Option<Node>,
    pub calculated: bool,
}
