//! Crate-level error type.

use thiserror::Error;

use crate::compiler::{CompileError, LabelError};
use crate::config::ConfigError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::sqlgen::SchemaError;
use crate::vm::{QueryError, VmError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
