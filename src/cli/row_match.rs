//! Check which queries of a formula a row can affect

use serde::Serialize;

use super::convert::json_to_record;
use super::CliError;
use crate::config::EngineConfig;
use crate::{Compiler, SqlInterpreter};

#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    pub formula: String,
    /// JSON object with the row's columns
    pub row: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    pub table: String,
    pub sql: String,
    pub matches: bool,
}

pub fn execute_match(options: &MatchOptions, config: &EngineConfig) -> Result<Vec<QueryMatch>, CliError> {
    let record = json_to_record(&options.row)?;
    let program = Compiler::new(&config.schema).compile_source(&config.binding, &config.scope, &options.formula)?;
    let interpreter = SqlInterpreter::new(&config.schema);

    Ok(program
        .sql_dependencies
        .into_iter()
        .map(|dep| QueryMatch {
            matches: interpreter.matches(dep.where_.as_ref(), &record, &dep.table),
            table: dep.table,
            sql: dep.sql,
        })
        .collect())
}
