//! Pausable bytecode interpreter.
//!
//! A [`Vm`] runs instructions until the program ends or a `QUERY` is
//! reached. On a query it hands a [`PendingQuery`] back to the host and
//! waits; the host runs the SQL however it likes and continues the VM with
//! [`Vm::resume`] or [`Vm::complete_query`]. [`execute`] does this loop
//! against a [`QueryExecutor`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, trace, warn};

use crate::functions::{FunctionError, Functions};
use crate::ops::{self, OpError};
use crate::program::{Instruction, Operand};
use crate::value::{Row, Value};

/// Storage for namespaced cell values (`sheet!cell`).
pub trait VariableScope {
    /// Current value of `name`; unset variables read as `null`.
    fn get_variable(&self, name: &str) -> Value;
    fn set_variable(&mut self, name: &str, value: Value);
}

impl VariableScope for HashMap<String, Value> {
    fn get_variable(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or_default()
    }

    fn set_variable(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }
}

impl<T: VariableScope + ?Sized> VariableScope for &mut T {
    fn get_variable(&self, name: &str) -> Value {
        (**self).get_variable(name)
    }

    fn set_variable(&mut self, name: &str, value: Value) {
        (**self).set_variable(name, value)
    }
}

/// Failure reported by a query executor.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Query failed: {0}")]
pub struct QueryError(pub String);

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        QueryError(message.into())
    }
}

/// Runs the SQL a program issues.
pub trait QueryExecutor {
    fn run_query(
        &self,
        sql: &str,
        params: &[Value],
        single_value: bool,
    ) -> impl Future<Output = Result<Vec<Row>, QueryError>>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("Invalid jump from {pc} to {target}: program has {len} instructions")]
    InvalidJump { pc: usize, target: usize, len: usize },

    #[error("VM is not paused (state: {0:?})")]
    NotPaused(VmState),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid operand {operand} at {pc}")]
    InvalidOperand { pc: usize, operand: String },

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Op(#[from] OpError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Idle,
    Running,
    /// Waiting for a query result
    Paused,
    Finished,
}

/// A query the VM is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    pub sql: String,
    /// Whether the result is a single value rather than rows
    pub calculated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Paused(PendingQuery),
    Finished(Value),
}

type OnFinish<'p> = Box<dyn FnOnce(Value) + 'p>;

pub struct Vm<'p, S> {
    scope: S,
    functions: Arc<Functions>,
    ops: &'p [Instruction],
    pc: usize,
    reg1: Value,
    stack: Vec<Value>,
    state: VmState,
    pending: Option<PendingQuery>,
    on_finish: Option<OnFinish<'p>>,
}

impl<'p, S: VariableScope> Vm<'p, S> {
    pub fn new(scope: S) -> Self {
        Vm::with_functions(scope, Arc::new(Functions::builtins()))
    }

    pub fn with_functions(scope: S, functions: Arc<Functions>) -> Self {
        Vm {
            scope,
            functions,
            ops: &[],
            pc: 0,
            reg1: Value::String(String::new()),
            stack: vec![],
            state: VmState::Idle,
            pending: None,
            on_finish: None,
        }
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn reg1(&self) -> &Value {
        &self.reg1
    }

    pub fn pending_query(&self) -> Option<&PendingQuery> {
        self.pending.as_ref()
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }

    /// Start `ops` from the beginning. `on_finish` receives the final
    /// `REG1` once the last instruction has run.
    pub fn run(&mut self, ops: &'p [Instruction], on_finish: impl FnOnce(Value) + 'p) -> Result<Step, VmError> {
        self.ops = ops;
        self.pc = 0;
        self.reg1 = Value::String(String::new());
        self.stack.clear();
        self.pending = None;
        self.on_finish = Some(Box::new(on_finish));
        self.step()
    }

    /// Continue a paused VM with `value` as the query result.
    pub fn resume(&mut self, value: Value) -> Result<Step, VmError> {
        if self.state != VmState::Paused {
            return Err(VmError::NotPaused(self.state));
        }
        self.pending = None;
        self.reg1 = value;
        self.step()
    }

    /// Continue a paused VM with the executor's result for the pending query.
    ///
    /// A calculated query yields the first column of the first row; a select
    /// query yields an array of row objects. A failed query is logged and
    /// yields `null`.
    pub fn complete_query(&mut self, result: Result<Vec<Row>, QueryError>) -> Result<Step, VmError> {
        let Some(pending) = self.pending.as_ref() else {
            return Err(VmError::NotPaused(self.state));
        };

        let value = match result {
            Ok(rows) if pending.calculated => match rows.into_iter().next() {
                Some(row) => row.0.into_iter().next().map(|(_, v)| v).unwrap_or_default(),
                None => {
                    warn!(sql = %pending.sql, "calculated query returned no rows");
                    Value::Null
                }
            },
            Ok(rows) => Value::Array(rows.into_iter().map(Row::into_value).collect()),
            Err(err) => {
                error!(sql = %pending.sql, error = %err, "query failed");
                Value::Null
            }
        };
        self.resume(value)
    }

    /// Run `ops` to completion, sending each query to `executor`.
    pub async fn run_with<E: QueryExecutor>(&mut self, ops: &'p [Instruction], executor: &E) -> Result<Value, VmError> {
        let mut step = self.run(ops, |_| {})?;
        loop {
            match step {
                Step::Finished(value) => return Ok(value),
                Step::Paused(query) => {
                    let result = executor.run_query(&query.sql, &[], query.calculated).await;
                    step = self.complete_query(result)?;
                }
            }
        }
    }

    fn step(&mut self) -> Result<Step, VmError> {
        self.state = VmState::Running;
        let result = self.run_until_pause();
        if result.is_err() {
            self.state = VmState::Finished;
            self.on_finish = None;
        }
        result
    }

    fn run_until_pause(&mut self) -> Result<Step, VmError> {
        let ops = self.ops;
        while let Some(op) = ops.get(self.pc) {
            trace!(pc = self.pc, op = %op, "exec");
            let pc = self.pc;
            self.pc += 1;

            match op {
                Instruction::Mov { src, dst } => {
                    let value = self.read(src, pc)?;
                    self.write(dst, value, pc)?;
                }
                Instruction::Call { callee, args } => {
                    let Some(f) = self.functions.get(callee) else {
                        return Err(VmError::UnknownFunction(callee.clone()));
                    };
                    let args = args
                        .iter()
                        .map(|arg| self.read(arg, pc))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.reg1 = f(callee, &args)?;
                }
                Instruction::Query { sql, calculated } => {
                    let query = PendingQuery {
                        sql: sql.clone(),
                        calculated: *calculated,
                    };
                    self.pending = Some(query.clone());
                    self.state = VmState::Paused;
                    return Ok(Step::Paused(query));
                }
                Instruction::Uop { op, target } => {
                    let value = self.read(target, pc)?;
                    self.reg1 = ops::unary(*op, &value)?;
                }
                Instruction::Bop { op, left, right } => {
                    let left = self.read(left, pc)?;
                    let right = self.read(right, pc)?;
                    self.reg1 = ops::binary(*op, &left, &right)?;
                }
                Instruction::JumpF { cond, target } => {
                    if !self.read(cond, pc)?.is_truthy() {
                        self.jump(pc, *target)?;
                    }
                }
                Instruction::JumpT { cond, target } => {
                    if self.read(cond, pc)?.is_truthy() {
                        self.jump(pc, *target)?;
                    }
                }
            }
        }

        self.state = VmState::Finished;
        if let Some(on_finish) = self.on_finish.take() {
            on_finish(self.reg1.clone());
        }
        Ok(Step::Finished(self.reg1.clone()))
    }

    fn jump(&mut self, pc: usize, target: usize) -> Result<(), VmError> {
        if target > self.ops.len() {
            return Err(VmError::InvalidJump {
                pc,
                target,
                len: self.ops.len(),
            });
        }
        self.pc = target;
        Ok(())
    }

    fn read(&self, operand: &Operand, pc: usize) -> Result<Value, VmError> {
        match operand {
            Operand::Reg1 => Ok(self.reg1.clone()),
            Operand::Sp(i) => self.stack.get(*i).cloned().ok_or_else(|| VmError::InvalidOperand {
                pc,
                operand: operand.to_string(),
            }),
            Operand::Var(name) => Ok(self.scope.get_variable(name)),
            Operand::Literal(value) => Ok(value.clone()),
        }
    }

    fn write(&mut self, operand: &Operand, value: Value, pc: usize) -> Result<(), VmError> {
        match operand {
            Operand::Reg1 => self.reg1 = value,
            Operand::Sp(i) => {
                if self.stack.len() <= *i {
                    self.stack.resize(*i + 1, Value::Null);
                }
                self.stack[*i] = value;
            }
            Operand::Var(name) => self.scope.set_variable(name, value),
            Operand::Literal(_) => {
                return Err(VmError::InvalidOperand {
                    pc,
                    operand: operand.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Run `ops` against `scope`, sending each query to `executor`, and return
/// the final `REG1`.
pub async fn execute<S: VariableScope, E: QueryExecutor>(
    ops: &[Instruction],
    scope: S,
    executor: &E,
) -> Result<Value, VmError> {
    let mut vm = Vm::new(scope);
    vm.run_with(ops, executor).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;

    #[test]
    fn test_jump_past_end_is_an_error() {
        let ops = vec![Instruction::JumpT {
            cond: Operand::Literal(Value::Boolean(true)),
            target: 5,
        }];
        let mut vm = Vm::new(HashMap::<String, Value>::new());
        assert!(matches!(vm.run(&ops, |_| {}), Err(VmError::InvalidJump { target: 5, .. })));
    }

    #[test]
    fn test_stack_slots() {
        let ops = vec![
            Instruction::Mov {
                src: Operand::Literal(Value::Integer(40)),
                dst: Operand::Sp(0),
            },
            Instruction::Mov {
                src: Operand::Literal(Value::Integer(2)),
                dst: Operand::Reg1,
            },
            Instruction::Bop {
                op: BinOp::Add,
                left: Operand::Sp(0),
                right: Operand::Reg1,
            },
        ];
        let mut vm = Vm::new(HashMap::<String, Value>::new());
        assert_eq!(vm.run(&ops, |_| {}).unwrap(), Step::Finished(Value::Integer(42)));
        assert_eq!(vm.state(), VmState::Finished);
    }

    #[test]
    fn test_resume_requires_pause() {
        let mut vm = Vm::new(HashMap::<String, Value>::new());
        assert_eq!(vm.resume(Value::Null), Err(VmError::NotPaused(VmState::Idle)));
    }
}
