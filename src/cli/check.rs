//! Validate formulas

use super::CliError;
use crate::config::EngineConfig;
use crate::{parse, Compiler};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The formula to check
    pub formula: String,
    /// Only validate syntax, don't compile
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Formula compiled
    Compiled {
        ops: usize,
        dependencies: Vec<String>,
        queries: usize,
    },
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions, config: &EngineConfig) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        parse(&options.formula)?;
        return Ok(CheckResult::SyntaxValid);
    }

    let program = Compiler::new(&config.schema).compile_source(&config.binding, &config.scope, &options.formula)?;
    Ok(CheckResult::Compiled {
        ops: program.ops.len(),
        dependencies: program.dependencies,
        queries: program.sql_dependencies.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_only() {
        let config = EngineConfig::default();
        let options = CheckOptions {
            formula: "=from transactions where nope.x = 1 calculate { count(id) }".to_string(),
            syntax_only: true,
        };
        assert_eq!(execute_check(&options, &config).unwrap(), CheckResult::SyntaxValid);

        let options = CheckOptions {
            syntax_only: false,
            ..options
        };
        assert!(matches!(execute_check(&options, &config), Err(CliError::Compile(_))));
    }
}
