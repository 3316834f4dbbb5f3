//! Evaluate formulas against in-memory cells and canned query rows

use std::collections::HashMap;
use std::future::{ready, Future};

use super::convert::{json_to_row, json_to_vars, value_to_json};
use super::CliError;
use crate::config::EngineConfig;
use crate::{Engine, QueryError, QueryExecutor, Row, Value};

/// Answers every query with the same rows.
#[derive(Debug, Clone, Default)]
pub struct StaticExecutor {
    pub rows: Vec<Row>,
}

impl QueryExecutor for StaticExecutor {
    fn run_query(
        &self,
        _sql: &str,
        _params: &[Value],
        _single_value: bool,
    ) -> impl Future<Output = Result<Vec<Row>, QueryError>> {
        ready(Ok(self.rows.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    pub formula: String,
    /// JSON object of cell values
    pub vars: Option<String>,
    /// JSON array of rows returned by every query
    pub rows: Option<String>,
}

/// Run a formula and return its result as JSON.
pub async fn execute_eval(options: &EvalOptions, config: EngineConfig) -> Result<serde_json::Value, CliError> {
    let mut vars: HashMap<String, Value> = match &options.vars {
        Some(json) => json_to_vars(json, &config.scope)?,
        None => HashMap::new(),
    };
    let rows = match &options.rows {
        Some(json) => match serde_json::from_str(json)? {
            serde_json::Value::Array(rows) => rows.into_iter().map(json_to_row).collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(CliError::InvalidInput {
                    what: "rows",
                    message: "expected a JSON array".to_string(),
                });
            }
        },
        None => vec![],
    };

    let (scope, binding) = (config.scope.clone(), config.binding.clone());
    let engine = Engine::new(config);
    let executor = StaticExecutor { rows };
    let value = engine
        .evaluate(&binding, &scope, &options.formula, &mut vars, &executor)
        .await?;
    Ok(value_to_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_eval_with_vars_and_rows() {
        let options = EvalOptions {
            formula: "=budgeted - from transactions calculate { sum(amount) }".to_string(),
            vars: Some(r#"{ "budgeted": 500 }"#.to_string()),
            rows: Some(r#"[{ "total": 120 }]"#.to_string()),
        };
        let result = execute_eval(&options, EngineConfig::default()).await.unwrap();
        assert_eq!(result, serde_json::json!(380));
    }
}
