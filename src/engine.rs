//! Compile-once, evaluate-many front end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::compiler::{CompileError, Compiler};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::functions::{Builtin, Functions};
use crate::program::Program;
use crate::sqlinterp::SqlInterpreter;
use crate::value::{Record, Value};
use crate::vm::{QueryExecutor, VariableScope, Vm};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    scope: String,
    binding: String,
    source: String,
}

/// Holds the configuration, the function registry and compiled programs.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    functions: Arc<Functions>,
    cache: Mutex<HashMap<CacheKey, Arc<Program>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            config,
            functions: Arc::new(Functions::builtins()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    pub fn register_function(&mut self, name: impl Into<String>, f: Builtin) {
        Arc::make_mut(&mut self.functions).register(name, f);
    }

    /// Compiled program for `source`, bound to `scope!binding`.
    pub fn compile(&self, binding: &str, scope: &str, source: &str) -> std::result::Result<Arc<Program>, CompileError> {
        let key = CacheKey {
            scope: scope.to_string(),
            binding: binding.to_string(),
            source: source.to_string(),
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(program) = cache.get(&key) {
            debug!(scope, binding, "program cache hit");
            return Ok(Arc::clone(program));
        }

        let program = Arc::new(Compiler::new(&self.config.schema).compile_source(binding, scope, source)?);
        cache.insert(key, Arc::clone(&program));
        Ok(program)
    }

    /// [`Engine::compile`] with the configured scope and binding.
    pub fn compile_formula(&self, source: &str) -> std::result::Result<Arc<Program>, CompileError> {
        self.compile(&self.config.binding, &self.config.scope, source)
    }

    pub fn cached_programs(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Compile (or reuse) and run a formula to completion.
    pub async fn evaluate<S, E>(&self, binding: &str, scope: &str, source: &str, vars: S, executor: &E) -> Result<Value>
    where
        S: VariableScope,
        E: QueryExecutor,
    {
        let program = self.compile(binding, scope, source)?;
        let mut vm = Vm::with_functions(vars, Arc::clone(&self.functions));
        Ok(vm.run_with(&program.ops, executor).await?)
    }

    /// Whether `row` can affect any query of `program`.
    pub fn row_matches(&self, program: &Program, row: &Record) -> bool {
        let interpreter = SqlInterpreter::new(&self.config.schema);
        program
            .sql_dependencies
            .iter()
            .any(|dep| interpreter.matches(dep.where_.as_ref(), row, &dep.table))
    }
}
