//! AST to bytecode.
//!
//! Every expression leaves its value in `REG1`. A binary operator keeps its
//! left operand in a stack slot while the right one is computed, except when
//! the left operand is a plain variable, which is read in place.

use thiserror::Error;
use tracing::debug;

use crate::ast::{Node, NodeKind, Position, QueryNode};
use crate::config::EngineConfig;
use crate::parser::{self, ParseError};
use crate::program::{Instruction, Operand, Program, SqlDependency};
use crate::schema::Schema;
use crate::sqlgen::{SchemaError, SqlGenerator};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    #[error("Label {0} resolved twice")]
    AlreadyResolved(usize),

    #[error("Label {0} was never resolved")]
    Unresolved(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error("[{}, {}] Cannot compile {kind} here", .pos.line + 1, .pos.col + 1)]
    UnsupportedNode { kind: &'static str, pos: Position },

    #[error("[{}, {}] {message}", .pos.line + 1, .pos.col + 1)]
    InvalidCall { message: String, pos: Position },
}

/// Jump destination, resolved once its instruction index is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(usize);

pub struct Compiler<'a> {
    schema: &'a Schema,
    scope: String,
    ops: Vec<Instruction>,
    /// Next free stack slot
    si: usize,
    labels: Vec<Option<usize>>,
    /// (instruction index, label) pairs for jumps emitted before their target
    patches: Vec<(usize, Label)>,
    dependencies: Vec<String>,
    sql_dependencies: Vec<SqlDependency>,
}

/// Compile `source` with the default scope, binding and schema.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let config = EngineConfig::default();
    Compiler::new(&config.schema).compile_source(&config.binding, &config.scope, source)
}

impl<'a> Compiler<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Compiler {
            schema,
            scope: String::new(),
            ops: vec![],
            si: 0,
            labels: vec![],
            patches: vec![],
            dependencies: vec![],
            sql_dependencies: vec![],
        }
    }

    /// Compile one cell. The result is stored in `scope!binding`.
    pub fn compile_source(&mut self, binding: &str, scope: &str, source: &str) -> Result<Program, CompileError> {
        let root = parser::parse(source)?;
        self.compile_root(binding, scope, &root)
    }

    pub fn compile_root(&mut self, binding: &str, scope: &str, root: &Node) -> Result<Program, CompileError> {
        self.reset(scope);

        let NodeKind::Root(children) = &root.kind else {
            return Err(CompileError::UnsupportedNode {
                kind: root.kind_name(),
                pos: root.pos,
            });
        };
        for child in children {
            self.compile_node(child)?;
        }
        if !self.ops.is_empty() {
            let dst = Operand::Var(format!("{}!{}", scope, binding));
            self.emit(Instruction::Mov { src: Operand::Reg1, dst });
        }
        self.resolve_patches()?;

        let program = Program {
            ops: std::mem::take(&mut self.ops),
            dependencies: std::mem::take(&mut self.dependencies),
            sql_dependencies: std::mem::take(&mut self.sql_dependencies),
        };
        debug!(
            scope,
            binding,
            ops = program.ops.len(),
            dependencies = program.dependencies.len(),
            sql_dependencies = program.sql_dependencies.len(),
            "compiled formula"
        );
        Ok(program)
    }

    fn reset(&mut self, scope: &str) {
        self.scope = scope.to_string();
        self.ops.clear();
        self.si = 0;
        self.labels.clear();
        self.patches.clear();
        self.dependencies.clear();
        self.sql_dependencies.clear();
    }

    fn emit(&mut self, op: Instruction) {
        self.ops.push(op);
    }

    fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the next instruction index.
    fn resolve_label(&mut self, label: Label) -> Result<(), LabelError> {
        let index = self.ops.len();
        match self.labels.get_mut(label.0) {
            Some(Some(_)) => Err(LabelError::AlreadyResolved(label.0)),
            Some(slot) => {
                *slot = Some(index);
                Ok(())
            }
            None => Err(LabelError::Unresolved(label.0)),
        }
    }

    fn emit_jump(&mut self, jump: fn(Operand, usize) -> Instruction, cond: Operand, label: Label) {
        self.patches.push((self.ops.len(), label));
        self.emit(jump(cond, usize::MAX));
    }

    fn resolve_patches(&mut self) -> Result<(), LabelError> {
        for (index, label) in std::mem::take(&mut self.patches) {
            let target = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or(LabelError::Unresolved(label.0))?;
            match self.ops.get_mut(index) {
                Some(Instruction::JumpF { target: t, .. } | Instruction::JumpT { target: t, .. }) => *t = target,
                _ => return Err(LabelError::Unresolved(label.0)),
            }
        }
        Ok(())
    }

    /// Namespace a cell name and record it as a dependency.
    fn resolve_variable(&mut self, name: &str) -> String {
        let var = if name.contains('!') {
            name.to_string()
        } else {
            format!("{}!{}", self.scope, name)
        };
        if !self.dependencies.contains(&var) {
            self.dependencies.push(var.clone());
        }
        var
    }

    /// Operand for an already compiled `node` whose value is in `REG1`.
    ///
    /// A symbol is read straight from its variable, so its `MOV` is dropped
    /// and no slot is taken. Anything else is saved to the next stack slot.
    fn maybe_push_stack(&mut self, node: &Node) -> Operand {
        if let NodeKind::Symbol(name) = &node.kind {
            self.ops.pop();
            return Operand::Var(self.resolve_variable(name));
        }
        let slot = Operand::Sp(self.si);
        self.si += 1;
        self.emit(Instruction::Mov {
            src: Operand::Reg1,
            dst: slot.clone(),
        });
        slot
    }

    fn release(&mut self, operand: &Operand) {
        if matches!(operand, Operand::Sp(_)) {
            self.si -= 1;
        }
    }

    fn compile_node(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Literal(value) => self.emit(Instruction::Mov {
                src: Operand::Literal(value.clone()),
                dst: Operand::Reg1,
            }),
            NodeKind::Symbol(name) => {
                let var = self.resolve_variable(name);
                self.emit(Instruction::Mov {
                    src: Operand::Var(var),
                    dst: Operand::Reg1,
                });
            }
            NodeKind::BinOp { op, left, right } => {
                self.compile_node(left)?;
                let left = self.maybe_push_stack(left);
                self.compile_node(right)?;
                self.emit(Instruction::Bop {
                    op: *op,
                    left: left.clone(),
                    right: Operand::Reg1,
                });
                self.release(&left);
            }
            NodeKind::UnaryOp { op, target } => {
                self.compile_node(target)?;
                self.emit(Instruction::Uop {
                    op: *op,
                    target: Operand::Reg1,
                });
            }
            NodeKind::FunCall { callee, args } => self.compile_call(node, callee, args)?,
            NodeKind::If { cond, body, else_ } => {
                self.compile_node(cond)?;
                let else_label = self.new_label();
                self.emit_jump(
                    |cond, target| Instruction::JumpF { cond, target },
                    Operand::Reg1,
                    else_label,
                );
                self.compile_node(body)?;

                match else_ {
                    Some(else_) => {
                        let end_label = self.new_label();
                        self.emit_jump(
                            |cond, target| Instruction::JumpT { cond, target },
                            Operand::Literal(Value::Boolean(true)),
                            end_label,
                        );
                        self.resolve_label(else_label)?;
                        self.compile_node(else_)?;
                        self.resolve_label(end_label)?;
                    }
                    None => self.resolve_label(else_label)?,
                }
            }
            NodeKind::Query(query) => self.compile_query(query)?,
            NodeKind::Member { .. } | NodeKind::NodeList(_) | NodeKind::Root(_) => {
                return Err(CompileError::UnsupportedNode {
                    kind: node.kind_name(),
                    pos: node.pos,
                });
            }
        }
        Ok(())
    }

    fn compile_call(&mut self, node: &Node, callee: &Node, args: &Node) -> Result<(), CompileError> {
        let name = match callee.as_symbol() {
            Some(name) if !name.contains('!') => name.to_string(),
            Some(name) => {
                return Err(CompileError::InvalidCall {
                    message: format!("Cannot call cell reference {}", name),
                    pos: callee.pos,
                });
            }
            None => {
                return Err(CompileError::InvalidCall {
                    message: format!("Cannot call {}", callee.kind_name()),
                    pos: callee.pos,
                });
            }
        };
        let NodeKind::NodeList(items) = &args.kind else {
            return Err(CompileError::UnsupportedNode {
                kind: args.kind_name(),
                pos: node.pos,
            });
        };

        let mut operands = Vec::with_capacity(items.len());
        for arg in items {
            self.compile_node(arg)?;
            operands.push(self.maybe_push_stack(arg));
        }
        for operand in &operands {
            self.release(operand);
        }
        self.emit(Instruction::Call {
            callee: name,
            args: operands,
        });
        Ok(())
    }

    fn compile_query(&mut self, query: &QueryNode) -> Result<(), CompileError> {
        let generated = SqlGenerator::new(self.schema).generate(
            &query.table,
            query.where_.as_ref(),
            query.groupby.as_ref(),
            &query.select,
        )?;

        self.sql_dependencies.push(SqlDependency {
            table: query.table.clone(),
            sql: generated.sql.clone(),
            where_: generated.where_,
            fields: generated.fields,
            joined_tables: generated.dependencies,
        });
        self.emit(Instruction::Query {
            sql: generated.sql,
            calculated: query.calculated,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_symbol_is_read_in_place() {
        let program = compile("=a + 1").unwrap();
        assert_eq!(
            program.ops[0],
            Instruction::Mov {
                src: Operand::Literal(Value::Integer(1)),
                dst: Operand::Reg1
            }
        );
        assert_eq!(
            program.ops[1],
            Instruction::Bop {
                op: crate::ast::BinOp::Add,
                left: Operand::Var("sheet!a".into()),
                right: Operand::Reg1
            }
        );
    }

    #[test]
    fn test_label_resolved_twice() {
        let schema = Schema::empty();
        let mut compiler = Compiler::new(&schema);
        let label = compiler.new_label();
        compiler.resolve_label(label).unwrap();
        assert_eq!(compiler.resolve_label(label), Err(LabelError::AlreadyResolved(0)));
    }
}
