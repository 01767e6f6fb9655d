//! Executable script representation.
//!
//! The parser (not part of this crate) lowers script text into these nodes.
//! Nothing here is mutated once a [`crate::script::Script`] has been built.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::eval::value::Value;
use crate::part::{Owner, PartKind, PartSpecifier};

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    /// A variable declared `global`; unset globals read as empty.
    Global(String),
    /// The object whose script is executing.
    Me,
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    /// Call of a user function defined in the executing script.
    FunctionCall {
        function: String,
        arguments: Vec<Expression>,
    },
    BuiltIn(BuiltInFunction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "&")]
    Concat,
    #[strum(serialize = "is")]
    Equal,
    #[strum(serialize = "is not")]
    NotEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuiltInFunction {
    /// `the number of <countable>`
    NumberOf(Countable),
    /// `average(<list>)`: a single list-valued argument.
    Average(Box<Expression>),
    Sum(Box<Expression>),
    Min(Vec<Expression>),
    Max(Vec<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Chunk {
    Chars,
    Words,
    Lines,
    Items,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Countable {
    /// Segments of an evaluated value.
    Chunks { chunk: Chunk, of: Box<Expression> },
    /// Parts present on the displayed card; `kind: None` counts every part.
    Parts { kind: Option<PartKind>, owner: Owner },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    Assignment {
        target: VariableTarget,
        value: Expression,
    },
    If {
        condition: Expression,
        then_block: Vec<Statement>,
        else_block: Option<Vec<Statement>>,
    },
    Return(Option<Expression>),
    /// Leaves the handler; the message counts as trapped.
    Exit,
    /// Leaves the handler and lets the message continue along the hierarchy.
    Pass,
    /// `send <message> [with <args>] [to <target>]`; without a target the
    /// message goes to "me".
    Send {
        message: String,
        arguments: Vec<Expression>,
        target: Option<PartSpecifier>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableTarget {
    Local(String),
    Global(String),
}

/// Body of a message handler (`on mouseUp ... end mouseUp`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandlerBlock {
    pub name: String,
    pub parameters: Vec<String>,
    pub statements: Vec<Statement>,
}

impl HandlerBlock {
    pub fn new(name: &str, statements: Vec<Statement>) -> Self {
        Self {
            name: name.to_string(),
            parameters: vec![],
            statements,
        }
    }

    pub fn with_parameters(mut self, parameters: &[&str]) -> Self {
        self.parameters = parameters.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// A `function ... end` definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserFunction {
    pub name: String,
    pub parameters: Vec<String>,
    pub statements: Vec<Statement>,
}

impl UserFunction {
    pub fn new(name: &str, parameters: &[&str], statements: Vec<Statement>) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            statements,
        }
    }
}

// Shorthands used by hosts that assemble scripts programmatically.
impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn variable(name: &str) -> Self {
        Expression::Variable(name.to_string())
    }

    pub fn global(name: &str) -> Self {
        Expression::Global(name.to_string())
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(function: &str, arguments: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            function: function.to_string(),
            arguments,
        }
    }
}

impl Statement {
    pub fn set_local(name: &str, value: Expression) -> Self {
        Statement::Assignment {
            target: VariableTarget::Local(name.to_string()),
            value,
        }
    }

    pub fn set_global(name: &str, value: Expression) -> Self {
        Statement::Assignment {
            target: VariableTarget::Global(name.to_string()),
            value,
        }
    }

    pub fn send(message: &str, arguments: Vec<Expression>, target: Option<PartSpecifier>) -> Self {
        Statement::Send {
            message: message.to_string(),
            arguments,
            target,
        }
    }
}
