//! Compiled bytecode.

use std::fmt;

use serde::Serialize;

use crate::ast::{BinOp, Node, UnaryOp};
use crate::value::Value;

/// Where an instruction reads or writes a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operand {
    /// The single result register
    Reg1,
    /// Stack slot
    Sp(usize),
    /// Namespaced variable (`sheet!cell`)
    Var(String),
    Literal(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg1 => write!(f, "REG1"),
            Operand::Sp(i) => write!(f, "SP({})", i),
            Operand::Var(name) => write!(f, "VAR({})", name),
            Operand::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Operand::Literal(v) => write!(f, "{}", v.as_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Instruction {
    Mov { src: Operand, dst: Operand },
    /// Call a registered function; result goes to `REG1`
    Call { callee: String, args: Vec<Operand> },
    /// Suspend until the host supplies the query result
    Query { sql: String, calculated: bool },
    Uop { op: UnaryOp, target: Operand },
    Bop { op: BinOp, left: Operand, right: Operand },
    /// Jump to `target` when `cond` is falsy
    JumpF { cond: Operand, target: usize },
    /// Jump to `target` when `cond` is truthy
    JumpT { cond: Operand, target: usize },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Mov { src, dst } => write!(f, "MOV {} -> {}", src, dst),
            Instruction::Call { callee, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "CALL {}({})", callee, args.join(", "))
            }
            Instruction::Query { sql, calculated } => {
                write!(f, "QUERY{} {}", if *calculated { " CALC" } else { "" }, sql)
            }
            Instruction::Uop { op, target } => write!(f, "UOP {} {}", op, target),
            Instruction::Bop { op, left, right } => write!(f, "BOP {} {} {}", op, left, right),
            Instruction::JumpF { cond, target } => write!(f, "JUMPF {} -> {}", cond, target),
            Instruction::JumpT { cond, target } => write!(f, "JUMPT {} -> {}", cond, target),
        }
    }
}

/// A query the program issues, with what it reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlDependency {
    pub table: String,
    pub sql: String,
    /// `where` clause as written in the formula
    #[serde(rename = "where")]
    pub where_: Option<Node>,
    pub fields: Vec<String>,
    pub joined_tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Program {
    pub ops: Vec<Instruction>,
    /// Variables read by the program, namespaced, first-seen order
    pub dependencies: Vec<String>,
    pub sql_dependencies: Vec<SqlDependency>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Listing with one numbered instruction per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            writeln!(f, "{:>4}  {}", i, op)?;
        }
        Ok(())
    }
}
