//! Compiled scripts: handlers, user functions and loose statements.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::ast::{HandlerBlock, Statement, UserFunction};
use crate::eval::evaluator::{EvalError, EvalResult};

/// Problems found while binding a message to a script, before any statement
/// of the handler runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Script of {object} failed to compile: {message}")]
    Compile { object: String, message: String },

    #[error("Duplicate parameter '{parameter}' in handler {handler}")]
    DuplicateParameter { handler: String, parameter: String },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Handlers and functions keyed by lower-cased name; the language does not
/// distinguish `mouseUp` from `mouseup`.
#[derive(Debug, Clone, Default)]
pub struct Script {
    handlers: HashMap<String, HandlerBlock>,
    functions: HashMap<String, UserFunction>,
    statements: Option<Vec<Statement>>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_handler(mut self, handler: HandlerBlock) -> Self {
        self.handlers.insert(key(&handler.name), handler);
        self
    }

    pub fn define_function(mut self, function: UserFunction) -> Self {
        self.functions.insert(key(&function.name), function);
        self
    }

    pub fn define_statements(mut self, statements: Vec<Statement>) -> Self {
        self.statements = Some(statements);
        self
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(&key(name))
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerBlock> {
        self.handlers.get(&key(name))
    }

    pub fn function(&self, name: &str) -> EvalResult<&UserFunction> {
        self.functions
            .get(&key(name))
            .ok_or_else(|| EvalError::UndefinedFunction(name.to_string()))
    }

    pub fn statements(&self) -> Option<&[Statement]> {
        self.statements.as_deref()
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.values().map(|h| h.name.as_str())
    }
}

/// Rejects parameter lists that would bind the same name twice.
pub(crate) fn check_parameters(owner: &str, parameters: &[String]) -> ScriptResult<()> {
    let mut seen = HashSet::new();
    for parameter in parameters {
        if !seen.insert(key(parameter)) {
            return Err(ScriptError::DuplicateParameter {
                handler: owner.to_string(),
                parameter: parameter.clone(),
            });
        }
    }
    Ok(())
}
