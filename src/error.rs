use thiserror::Error;

use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::eval::evaluator::EvalError;
use crate::script::ScriptError;
use crate::stack::StackError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    // eval error
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Stack error: {0}")]
    Stack(#[from] StackError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

// エラー作成用のヘルパー関数
impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
