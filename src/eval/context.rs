use std::sync::Arc;

use dashmap::DashMap;

use crate::dispatch::{Dispatcher, Interrupt};
use crate::environment::EnvironmentContext;
use crate::part::PartSpecifier;
use crate::script::Script;

use super::evaluator::{EvalError, EvalResult};
use super::value::Value;

#[derive(Debug, Clone)]
pub enum VariableAccess {
    Global(String), // global宣言された変数
    Local(String),  // 通常のローカル変数アクセス
}

/// State of one handler or function invocation: who "me" is, which script is
/// running, and the local variables. Dropped when the invocation ends.
pub struct ExecutionContext {
    me: PartSpecifier,
    script: Arc<Script>,
    locals: DashMap<String, Value>,
    dispatcher: Dispatcher,
    depth: usize,
    interrupt: Interrupt,
}

impl ExecutionContext {
    pub fn new(
        me: PartSpecifier,
        script: Arc<Script>,
        dispatcher: Dispatcher,
        depth: usize,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            me,
            script,
            locals: DashMap::new(),
            dispatcher,
            depth,
            interrupt,
        }
    }

    /// Fresh locals for a function call made from this invocation.
    pub fn nested(&self) -> Self {
        Self::new(
            self.me,
            self.script.clone(),
            self.dispatcher.clone(),
            self.depth + 1,
            self.interrupt.clone(),
        )
    }

    pub fn me(&self) -> PartSpecifier {
        self.me
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn env(&self) -> &EnvironmentContext {
        self.dispatcher.env()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fires when the chain running this invocation is cancelled or times out.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Positional binding; parameters without an argument start out empty.
    pub fn bind_parameters(&self, parameters: &[String], arguments: Vec<Value>) {
        let mut arguments = arguments.into_iter();
        for parameter in parameters {
            let value = arguments.next().unwrap_or_default();
            self.locals.insert(parameter.to_lowercase(), value);
        }
    }

    pub async fn get(&self, access: VariableAccess) -> EvalResult<Value> {
        match access {
            VariableAccess::Global(name) => Ok(self.env().global(&name)),
            VariableAccess::Local(name) => self
                .locals
                .get(&name.to_lowercase())
                .map(|v| v.clone())
                .ok_or(EvalError::UndefinedVariable(name)),
        }
    }

    pub async fn set(&self, access: VariableAccess, value: Value) -> EvalResult<()> {
        match access {
            VariableAccess::Global(name) => self.env().set_global(&name, value),
            VariableAccess::Local(name) => {
                self.locals.insert(name.to_lowercase(), value);
            }
        }
        Ok(())
    }
}
