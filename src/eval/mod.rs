//! Script Evaluation
//!
//! Executes the script representation produced by the parser.
//!
//! # Core Components
//!
//! ## Evaluator
//! Runs handler blocks, user functions and top-level statements. Statement and
//! expression evaluation are implemented in their own modules as further
//! `impl Evaluator` blocks.
//!
//! ## Execution Context
//! Per-invocation state: the "me" binding, the running script and the locals.
//! Globals and host state live in the shared
//! [`EnvironmentContext`](crate::environment::EnvironmentContext).
//!
//! ## Values and Built-ins
//! [`value::Value`] carries the coercion and chunking rules the built-in
//! functions in [`builtins`] depend on.

pub mod builtins;
pub mod context;
pub mod evaluator;
pub mod expression;
pub mod statement;
pub mod value;
