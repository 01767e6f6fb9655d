//! Built-in functions that work on already evaluated values.

use crate::ast::Chunk;

use super::evaluator::{EvalError, EvalResult};
use super::value::Value;

pub fn count_chunks(chunk: Chunk, value: &Value) -> Value {
    let count = match chunk {
        Chunk::Chars => value.char_count(),
        Chunk::Words => value.word_count(),
        Chunk::Lines => value.line_count(),
        Chunk::Items => value.item_count(),
    };
    Value::from(count)
}

/// Mean of a list; an empty list averages to 0.
pub fn average(list: &[Value]) -> EvalResult<Value> {
    if list.is_empty() {
        return Ok(Value::Integer(0));
    }
    let total = accumulate(list)?;
    Ok(Value::number(total / list.len() as f64))
}

pub fn sum(list: &[Value]) -> EvalResult<Value> {
    Ok(Value::number(accumulate(list)?))
}

fn accumulate(list: &[Value]) -> EvalResult<f64> {
    list.iter().try_fold(0.0, |acc, item| -> EvalResult<f64> {
        Ok(acc + item.number_value()?)
    })
}

/// The argument with the smallest numeric value, returned as given.
pub fn min(arguments: &[Value]) -> EvalResult<Value> {
    extreme("min", arguments, |candidate, best| candidate < best)
}

pub fn max(arguments: &[Value]) -> EvalResult<Value> {
    extreme("max", arguments, |candidate, best| candidate > best)
}

fn extreme(
    function: &str,
    arguments: &[Value],
    better: impl Fn(f64, f64) -> bool,
) -> EvalResult<Value> {
    let (first, rest) = arguments.split_first().ok_or_else(|| EvalError::ArityError {
        function: function.to_string(),
        minimum: 1,
    })?;

    let mut best = (first, first.number_value()?);
    for candidate in rest {
        let n = candidate.number_value()?;
        if better(n, best.1) {
            best = (candidate, n);
        }
    }
    Ok(best.0.clone())
}
