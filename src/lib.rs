pub mod ast;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod pattern;
pub mod program;
pub mod schema;
pub mod sqlgen;
pub mod sqlinterp;
pub mod value;
pub mod vm;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Node, NodeKind, Token, TokenKind, UnaryOp};
pub use compiler::{compile, CompileError, Compiler, LabelError};
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{Error, Result};
pub use functions::{FunctionError, Functions};
pub use lexer::{tokenize, LexError, Lexer, Position};
pub use parser::{parse, ParseError, Parser};
pub use program::{Instruction, Operand, Program, SqlDependency};
pub use schema::Schema;
pub use sqlgen::{GeneratedSql, SchemaError, SqlGenerator};
pub use sqlinterp::{interpret, SqlInterpreter};
pub use value::{Record, Row, Value};
pub use vm::{execute, PendingQuery, QueryError, QueryExecutor, Step, VariableScope, Vm, VmError, VmState};
