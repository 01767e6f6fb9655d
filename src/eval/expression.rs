use std::sync::Arc;

use async_recursion::async_recursion;

use super::builtins;
use super::context::{ExecutionContext, VariableAccess};
use super::evaluator::{EvalError, EvalResult, Evaluator};
use super::value::Value;
use crate::ast::{BinaryOperator, BuiltInFunction, Countable, Expression};

impl Evaluator {
    #[async_recursion]
    pub async fn eval_expression(
        &self,
        expr: &Expression,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => {
                context.get(VariableAccess::Local(name.clone())).await
            }
            Expression::Global(name) => context.get(VariableAccess::Global(name.clone())).await,
            Expression::Me => Ok(Value::Text(context.me().to_string())),
            Expression::BinaryOp { op, left, right } => {
                self.eval_binary_op(*op, left, right, context).await
            }
            Expression::Not(inner) => {
                let value = self.eval_expression(inner, context).await?;
                Ok(Value::Boolean(!value.boolean_value()?))
            }
            Expression::FunctionCall {
                function,
                arguments,
            } => {
                let arguments = self.eval_arguments(arguments, context.clone()).await?;
                self.invoke_function(function, arguments, &context).await
            }
            Expression::BuiltIn(function) => self.eval_builtin(function, context).await,
        }
    }

    /// Left to right, one at a time.
    pub async fn eval_arguments(
        &self,
        arguments: &[Expression],
        context: Arc<ExecutionContext>,
    ) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.eval_expression(argument, context.clone()).await?);
        }
        Ok(values)
    }

    async fn eval_builtin(
        &self,
        function: &BuiltInFunction,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<Value> {
        match function {
            BuiltInFunction::NumberOf(Countable::Chunks { chunk, of }) => {
                let value = self.eval_expression(of, context).await?;
                Ok(builtins::count_chunks(*chunk, &value))
            }
            BuiltInFunction::NumberOf(Countable::Parts { kind, owner }) => {
                let count = context.env().application().part_count(*kind, *owner);
                Ok(Value::from(count))
            }
            BuiltInFunction::Average(list) => {
                let list = self.eval_expression(list, context).await?.list_value();
                builtins::average(&list)
            }
            BuiltInFunction::Sum(list) => {
                let list = self.eval_expression(list, context).await?.list_value();
                builtins::sum(&list)
            }
            BuiltInFunction::Min(arguments) => {
                builtins::min(&self.eval_arguments(arguments, context).await?)
            }
            BuiltInFunction::Max(arguments) => {
                builtins::max(&self.eval_arguments(arguments, context).await?)
            }
        }
    }

    async fn eval_binary_op(
        &self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        context: Arc<ExecutionContext>,
    ) -> EvalResult<Value> {
        let left = self.eval_expression(left, context.clone()).await?;

        // and/or は短絡評価
        match op {
            BinaryOperator::And if !left.boolean_value()? => return Ok(Value::Boolean(false)),
            BinaryOperator::Or if left.boolean_value()? => return Ok(Value::Boolean(true)),
            _ => {}
        }

        let right = self.eval_expression(right, context).await?;
        match op {
            BinaryOperator::Add => arithmetic(&left, &right, |a, b| Ok(a + b)),
            BinaryOperator::Subtract => arithmetic(&left, &right, |a, b| Ok(a - b)),
            BinaryOperator::Multiply => arithmetic(&left, &right, |a, b| Ok(a * b)),
            BinaryOperator::Divide => arithmetic(&left, &right, |a, b| {
                if b == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }),
            BinaryOperator::Concat => Ok(Value::Text(format!("{}{}", left, right))),
            BinaryOperator::Equal => Ok(Value::Boolean(left.loosely_equals(&right))),
            BinaryOperator::NotEqual => Ok(Value::Boolean(!left.loosely_equals(&right))),
            BinaryOperator::LessThan => Ok(Value::Boolean(compare(&left, &right).is_lt())),
            BinaryOperator::GreaterThan => Ok(Value::Boolean(compare(&left, &right).is_gt())),
            BinaryOperator::And | BinaryOperator::Or => Ok(Value::Boolean(right.boolean_value()?)),
        }
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    apply: impl Fn(f64, f64) -> EvalResult<f64>,
) -> EvalResult<Value> {
    let result = apply(left.number_value()?, right.number_value()?)?;
    Ok(Value::number(result))
}

/// Numbers compare numerically, anything else as case-folded text.
fn compare(left: &Value, right: &Value) -> std::cmp::Ordering {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        _ => left
            .to_string()
            .to_lowercase()
            .cmp(&right.to_string().to_lowercase()),
    }
}
