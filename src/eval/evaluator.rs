use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::ast::{HandlerBlock, Statement};
use crate::script::{self, ScriptError};

use super::{
    context::ExecutionContext,
    statement::{ControlFlow, StatementResult},
    value::Value,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Expected a number here but found '{0}'")]
    NotANumber(String),
    #[error("Expected true or false here but found '{0}'")]
    NotABoolean(String),
    #[error("No such function {0}")]
    UndefinedFunction(String),
    #[error("{function} expects at least {minimum} argument(s)")]
    ArityError { function: String, minimum: usize },
    #[error("Variable {0} has no value")]
    UndefinedVariable(String),
    #[error("Can't divide by zero")]
    DivisionByZero,
    #[error("No such object: {0}")]
    UnknownObject(String),
    #[error("Too much recursion (deeper than {0} calls)")]
    RecursionLimit(usize),
    /// The dispatch running this script was cancelled or timed out.
    #[error("Interrupted")]
    Interrupted,
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// How a handler body finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Ran to the end, or left through `exit`/`return`. The message is trapped.
    Completed,
    /// Left through `pass`.
    Passed,
}

impl HandlerOutcome {
    pub fn trapped(&self) -> bool {
        matches!(self, HandlerOutcome::Completed)
    }
}

/// Runs handler blocks, user functions and top-level statements. Stateless;
/// everything an invocation touches lives in its [`ExecutionContext`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Top level entry point for a message handler.
    pub async fn eval_handler_block(
        &self,
        block: &HandlerBlock,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<HandlerOutcome> {
        match self.eval_block(&block.statements, context).await? {
            StatementResult::Control(ControlFlow::Pass) => {
                debug!("handler {} passed", block.name);
                Ok(HandlerOutcome::Passed)
            }
            _ => Ok(HandlerOutcome::Completed),
        }
    }

    /// Calls a function defined in the script of `caller`, in a fresh scope
    /// with the same "me", and waits for its value.
    pub async fn invoke_function(
        &self,
        function: &str,
        arguments: Vec<Value>,
        caller: &ExecutionContext,
    ) -> EvalResult<Value> {
        let limit = caller.env().config().max_call_depth;
        if caller.depth() >= limit {
            return Err(EvalError::RecursionLimit(limit));
        }

        let script = caller.script().clone();
        let definition = script.function(function)?;
        script::check_parameters(&definition.name, &definition.parameters)?;

        let context = Arc::new(caller.nested());
        context.bind_parameters(&definition.parameters, arguments);

        match self.eval_block(&definition.statements, context).await? {
            StatementResult::Control(ControlFlow::Return(value)) => Ok(value),
            _ => Ok(Value::Empty),
        }
    }

    /// Runs a script's loose statements; scripts without any are a no-op.
    pub async fn eval_top_level(
        &self,
        statements: Option<&[Statement]>,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<()> {
        if let Some(statements) = statements {
            self.eval_block(statements, context).await?;
        }
        Ok(())
    }
}
