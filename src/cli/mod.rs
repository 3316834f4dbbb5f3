//! CLI support for sheet-lang
//!
//! Provides programmatic access to the sheet CLI commands so hosts can embed
//! them without shelling out.

mod check;
mod compile;
mod convert;
mod docs;
mod eval;
mod row_match;

pub use check::{execute_check, CheckOptions, CheckResult};
pub use compile::{execute_compile, CompileOptions, CompileOutput};
pub use convert::{json_to_row, json_to_value, json_to_vars, value_to_json};
pub use docs::{get_doc_category, get_docs_overview, DocCategory};
pub use eval::{execute_eval, EvalOptions, StaticExecutor};
pub use row_match::{execute_match, MatchOptions, QueryMatch};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Compile error: {0}")]
    Compile(#[from] crate::CompileError),

    #[error("Evaluation error: {0}")]
    Vm(#[from] crate::VmError),

    #[error(transparent)]
    Engine(#[from] crate::Error),

    #[error("Config error: {0}")]
    Config(#[from] crate::ConfigError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON input of the wrong shape
    #[error("Invalid {what}: {message}")]
    InvalidInput { what: &'static str, message: String },

    #[error("No formula provided. Pass it as an argument or pipe it to stdin.")]
    NoInput,

    #[error("Unknown category: '{0}'\nRun 'sheet docs' to see available categories.")]
    UnknownCategory(String),
}
