//! Compile formulas to bytecode

use super::CliError;
use crate::config::EngineConfig;
use crate::Compiler;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub formula: String,
    /// Overrides the configured scope
    pub scope: Option<String>,
    /// Overrides the configured binding
    pub binding: Option<String>,
    /// Numbered text listing instead of JSON
    pub listing: bool,
}

#[derive(Debug)]
pub enum CompileOutput {
    Json(serde_json::Value),
    Listing(String),
}

pub fn execute_compile(options: &CompileOptions, config: &EngineConfig) -> Result<CompileOutput, CliError> {
    let scope = options.scope.as_deref().unwrap_or(&config.scope);
    let binding = options.binding.as_deref().unwrap_or(&config.binding);

    let program = Compiler::new(&config.schema).compile_source(binding, scope, &options.formula)?;
    if options.listing {
        return Ok(CompileOutput::Listing(program.to_string()));
    }
    Ok(CompileOutput::Json(serde_json::to_value(&program)?))
}
