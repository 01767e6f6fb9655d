use core::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::evaluator::{EvalError, EvalResult};

lazy_static! {
    static ref NUMBER_PATTERN: Regex =
        Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?\s*$").unwrap();
}

/// Delimiter separating the items of a text value.
pub const ITEM_DELIMITER: char = ',';

// 値の型システム
#[derive(Clone, Debug, PartialEq, Default, Deserialize, Serialize)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<Value>),
    #[default]
    Empty,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                let rendered = items
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(&ITEM_DELIMITER.to_string());
                write!(f, "{}", rendered)
            }
            Value::Empty => Ok(()),
        }
    }
}

/// Whole floats print without a fractional part ("4", not "4.0").
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl Value {
    /// Result of arithmetic: whole numbers come back as integers.
    pub fn number(n: f64) -> Self {
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 / 2.0 {
            Value::Integer(n as i64)
        } else {
            Value::Float(n)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Whether this value can take part in arithmetic.
    pub fn is_number(&self) -> bool {
        self.as_number().is_some()
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(n) => Some(*n),
            Value::Text(s) if NUMBER_PATTERN.is_match(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Numeric form of the value, failing with `NotANumber` for anything else.
    pub fn number_value(&self) -> EvalResult<f64> {
        self.as_number()
            .ok_or_else(|| EvalError::NotANumber(self.to_string()))
    }

    pub fn boolean_value(&self) -> EvalResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Text(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::Text(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            other => Err(EvalError::NotABoolean(other.to_string())),
        }
    }

    pub fn string_value(&self) -> String {
        self.to_string()
    }

    /// Elements of a list, or the items of any other value.
    pub fn list_value(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.clone(),
            Value::Empty => vec![],
            other => split_chunks(&other.to_string(), ITEM_DELIMITER)
                .into_iter()
                .map(Value::from)
                .collect(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.to_string().chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.to_string().split_whitespace().count()
    }

    pub fn line_count(&self) -> usize {
        split_chunks(&self.to_string(), '\n').len()
    }

    pub fn item_count(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            other => split_chunks(&other.to_string(), ITEM_DELIMITER).len(),
        }
    }

    /// Equality used by the `is` operator: numeric when both sides are
    /// numbers, otherwise case-insensitive text comparison.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self
                .to_string()
                .trim()
                .eq_ignore_ascii_case(other.to_string().trim()),
        }
    }
}

/// Splits on `delimiter`; empty text has no chunks and a trailing delimiter
/// does not open a new one.
fn split_chunks(text: &str, delimiter: char) -> Vec<&str> {
    if text.is_empty() {
        return vec![];
    }
    let text = text.strip_suffix(delimiter).unwrap_or(text);
    text.split(delimiter).collect()
}
