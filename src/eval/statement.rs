use std::sync::Arc;

use async_recursion::async_recursion;
use tracing::debug;

use super::{
    context::{ExecutionContext, VariableAccess},
    evaluator::{EvalError, EvalResult, Evaluator},
    value::Value,
};
use crate::ast::{Expression, Statement, VariableTarget};
use crate::part::PartSpecifier;

/// 文の評価結果を表す型
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    Value(Value),
    Control(ControlFlow),
}

/// Statements that leave the enclosing handler or function early.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Return(Value),
    Exit,
    Pass,
}

impl Evaluator {
    #[async_recursion]
    pub async fn eval_statement(
        &self,
        statement: &Statement,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<StatementResult> {
        match statement {
            Statement::Expression(expr) => Ok(StatementResult::Value(
                self.eval_expression(expr, context).await?,
            )),
            Statement::Assignment { target, value } => {
                let value = self.eval_expression(value, context.clone()).await?;
                let access = match target {
                    VariableTarget::Local(name) => VariableAccess::Local(name.clone()),
                    VariableTarget::Global(name) => VariableAccess::Global(name.clone()),
                };
                context.set(access, value).await?;
                Ok(StatementResult::Value(Value::Empty))
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                self.eval_if(condition, then_block, else_block.as_deref(), context)
                    .await
            }
            Statement::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expression(expr, context).await?,
                    None => Value::Empty,
                };
                Ok(StatementResult::Control(ControlFlow::Return(value)))
            }
            Statement::Exit => Ok(StatementResult::Control(ControlFlow::Exit)),
            Statement::Pass => Ok(StatementResult::Control(ControlFlow::Pass)),
            Statement::Send {
                message,
                arguments,
                target,
            } => self.eval_send(message, arguments, target.as_ref(), context).await,
        }
    }

    /// Runs statements in order, stopping at the first control-flow result.
    /// Fails with `Interrupted` before the next statement once the dispatch
    /// has been interrupted.
    pub async fn eval_block(
        &self,
        statements: &[Statement],
        context: Arc<ExecutionContext>,
    ) -> EvalResult<StatementResult> {
        let mut last = StatementResult::Value(Value::Empty);
        for statement in statements {
            if context.interrupt().is_triggered() {
                debug!("interrupted, skipping the rest of the block");
                return Err(EvalError::Interrupted);
            }
            last = self.eval_statement(statement, context.clone()).await?;
            if let StatementResult::Control(_) = last {
                break;
            }
        }
        Ok(last)
    }

    async fn eval_if(
        &self,
        condition: &Expression,
        then_block: &[Statement],
        else_block: Option<&[Statement]>,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<StatementResult> {
        let condition = self
            .eval_expression(condition, context.clone())
            .await?
            .boolean_value()?;

        if condition {
            self.eval_block(then_block, context).await
        } else if let Some(else_block) = else_block {
            self.eval_block(else_block, context).await
        } else {
            Ok(StatementResult::Value(Value::Empty))
        }
    }

    /// Sends a message and waits until its chain has finished. Failures
    /// inside the chain are reported by the dispatcher; they do not abort
    /// the sending handler.
    async fn eval_send(
        &self,
        message: &str,
        arguments: &[Expression],
        target: Option<&PartSpecifier>,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<StatementResult> {
        let limit = context.env().config().max_call_depth;
        if context.depth() >= limit {
            return Err(EvalError::RecursionLimit(limit));
        }

        let arguments = self.eval_arguments(arguments, context.clone()).await?;
        let part = target.copied().unwrap_or(context.me());
        let recipient = context
            .env()
            .application()
            .resolve(&part)
            .ok_or_else(|| EvalError::UnknownObject(part.to_string()))?;

        let outcome = context
            .dispatcher()
            .send_nested(
                recipient,
                message,
                arguments,
                context.depth() + 1,
                context.interrupt().child(),
            )
            .await;
        debug!(
            "send {} to {} finished, trapped: {}",
            message, part, outcome.trapped
        );
        Ok(StatementResult::Value(Value::Boolean(outcome.trapped)))
    }
}
