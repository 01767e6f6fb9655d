//! # Dispatcher
//!
//! Delivers a message to an object and walks it up the hierarchy until some
//! handler traps it.
//!
//! `receive_message` returns as soon as the chain is scheduled. The chain runs
//! on its own task; every handler body runs on a single-use worker task that
//! the chain awaits before deciding whether to forward. Recipients of one
//! chain are therefore visited strictly one after another.
//!
//! ```text
//! Eligible ──gate closed──────────────────────────▶ Exhausted
//!    │
//!    ▼
//! Executing ──semantic/eval error──▶ Errored
//!    │   └────interrupted──────────▶ Exhausted
//!    ├──trapped──▶ Trapped
//!    └──not trapped──▶ Forwarding ──no next──▶ Exhausted
//!                          └──next recipient──▶ Eligible
//! ```
//!
//! The completion observer fires exactly once per chain. It is guarded so that
//! a chain task torn down before finishing still reports `trapped = false`.
//!
//! Cancelling a chain, or its handler running past `handler_timeout`, fires the
//! chain's [`Interrupt`]. The running handler stops at its next statement and
//! chains it started through `send` are interrupted with it.

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::interrupt::Interrupt;
use super::recipient::{next_recipient, MessageRecipient};
use crate::environment::EnvironmentContext;
use crate::eval::context::ExecutionContext;
use crate::eval::evaluator::{EvalError, EvalResult, Evaluator};
use crate::eval::value::Value;
use crate::script::{self, ScriptError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DispatchState {
    Eligible,
    Executing,
    Trapped,
    Forwarding,
    Exhausted,
    Errored,
}

/// What the completion observer is told when a chain ends.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageOutcome {
    pub command: String,
    pub trapped: bool,
    pub error: Option<DispatchError>,
}

impl MessageOutcome {
    pub fn trapped(command: &str) -> Self {
        Self {
            command: command.to_string(),
            trapped: true,
            error: None,
        }
    }

    pub fn untrapped(command: &str) -> Self {
        Self {
            command: command.to_string(),
            trapped: false,
            error: None,
        }
    }

    pub fn failed(command: &str, error: DispatchError) -> Self {
        Self {
            command: command.to_string(),
            trapped: false,
            error: Some(error),
        }
    }
}

pub type CompletionObserver = Box<dyn FnOnce(MessageOutcome) + Send + 'static>;

/// Holds the observer until the chain ends. Dropping it unfired reports the
/// message as untrapped.
struct Completion {
    command: String,
    observer: Option<CompletionObserver>,
}

impl Completion {
    fn new(command: &str, observer: CompletionObserver) -> Self {
        Self {
            command: command.to_string(),
            observer: Some(observer),
        }
    }

    fn complete(mut self, outcome: MessageOutcome) {
        if let Some(observer) = self.observer.take() {
            observer(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            warn!("dispatch of {} ended without an outcome", self.command);
            observer(MessageOutcome::untrapped(&self.command));
        }
    }
}

/// Handle to a scheduled chain. Dropping it does not cancel anything.
#[derive(Debug)]
pub struct DispatchHandle {
    id: Uuid,
    interrupt: Interrupt,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Interrupts the chain and every chain its handlers sent messages to.
    /// The message is reported as untrapped.
    pub fn cancel(&self) {
        self.interrupt.trigger();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Resolves once the observer has been called.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            warn!("dispatch task {} failed: {}", self.id, e);
        }
    }
}

/// Result of offering the message to a single recipient.
enum Step {
    Trapped,
    NotTrapped,
    Interrupted,
    Failed(DispatchError),
}

#[derive(Clone)]
pub struct Dispatcher {
    env: Arc<EnvironmentContext>,
    evaluator: Evaluator,
}

impl Dispatcher {
    pub fn new(env: Arc<EnvironmentContext>) -> Self {
        Self {
            env,
            evaluator: Evaluator::new(),
        }
    }

    pub fn env(&self) -> &EnvironmentContext {
        &self.env
    }

    /// Schedules `command` for `recipient` and returns immediately.
    /// `on_completion` runs on the dispatch task once the chain ends.
    ///
    /// Must be called from within a tokio runtime.
    pub fn receive_message(
        &self,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: Vec<Value>,
        on_completion: CompletionObserver,
    ) -> DispatchHandle {
        self.spawn_chain(
            recipient,
            command,
            arguments,
            on_completion,
            0,
            Interrupt::new(),
        )
    }

    /// Like [`receive_message`](Self::receive_message), with the outcome
    /// delivered through a channel.
    pub fn send(
        &self,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: Vec<Value>,
    ) -> (DispatchHandle, oneshot::Receiver<MessageOutcome>) {
        let (tx, rx) = oneshot::channel();
        let handle = self.receive_message(
            recipient,
            command,
            arguments,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        (handle, rx)
    }

    pub async fn send_and_wait(
        &self,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: Vec<Value>,
    ) -> MessageOutcome {
        self.send_nested(recipient, command, arguments, 0, Interrupt::new())
            .await
    }

    /// Runs a chain under `interrupt` and waits for its outcome.
    pub(crate) async fn send_nested(
        &self,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: Vec<Value>,
        depth: usize,
        interrupt: Interrupt,
    ) -> MessageOutcome {
        let (tx, rx) = oneshot::channel();
        let _handle = self.spawn_chain(
            recipient,
            command,
            arguments,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
            depth,
            interrupt,
        );
        rx.await
            .unwrap_or_else(|_| MessageOutcome::untrapped(command))
    }

    /// Calls a function in `recipient`'s script and waits for its value.
    pub async fn invoke_function(
        &self,
        recipient: &dyn MessageRecipient,
        function: &str,
        arguments: Vec<Value>,
    ) -> EvalResult<Value> {
        let script = recipient.script()?;
        let context = ExecutionContext::new(
            recipient.me(),
            script,
            self.clone(),
            0,
            Interrupt::new(),
        );
        self.evaluator
            .invoke_function(function, arguments, &context)
            .await
    }

    /// Runs the loose statements of `recipient`'s script, if it has any.
    pub async fn run_top_level(&self, recipient: &dyn MessageRecipient) -> EvalResult<()> {
        let script = recipient.script()?;
        let context = Arc::new(ExecutionContext::new(
            recipient.me(),
            script.clone(),
            self.clone(),
            0,
            Interrupt::new(),
        ));
        self.evaluator
            .eval_top_level(script.statements(), context)
            .await
    }

    fn spawn_chain(
        &self,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: Vec<Value>,
        on_completion: CompletionObserver,
        depth: usize,
        interrupt: Interrupt,
    ) -> DispatchHandle {
        let id = Uuid::new_v4();
        let completion = Completion::new(command, on_completion);
        let dispatcher = self.clone();
        let command = command.to_string();
        let chain_interrupt = interrupt.clone();

        let task = tokio::spawn(async move {
            let outcome = dispatcher
                .run_chain(id, recipient, &command, &arguments, depth, &chain_interrupt)
                .await;
            completion.complete(outcome);
        });

        DispatchHandle {
            id,
            interrupt,
            task,
        }
    }

    #[instrument(name = "dispatch", skip_all, fields(id = %id, command = %command))]
    async fn run_chain(
        &self,
        id: Uuid,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: &[Value],
        depth: usize,
        interrupt: &Interrupt,
    ) -> MessageOutcome {
        let mut current = recipient;
        loop {
            let me = current.me();
            debug!(state = %DispatchState::Eligible, recipient = %me);

            if interrupt.is_triggered() {
                debug!(state = %DispatchState::Exhausted, "cancelled before delivery");
                return MessageOutcome::untrapped(command);
            }

            if !self.env.tool_mode().is_browse() && me.is_card_element() {
                debug!(
                    state = %DispatchState::Exhausted,
                    "scripts of buttons and fields are suspended outside browse mode"
                );
                return MessageOutcome::untrapped(command);
            }

            debug!(state = %DispatchState::Executing, recipient = %me);
            match self.deliver(&current, command, arguments, depth, interrupt).await {
                Step::Trapped => {
                    debug!(state = %DispatchState::Trapped, recipient = %me);
                    return MessageOutcome::trapped(command);
                }
                Step::Interrupted => {
                    debug!(state = %DispatchState::Exhausted, recipient = %me, "interrupted");
                    return MessageOutcome::untrapped(command);
                }
                Step::Failed(error) => {
                    debug!(state = %DispatchState::Errored, recipient = %me, %error);
                    self.env.report(&error);
                    return MessageOutcome::failed(command, error);
                }
                Step::NotTrapped => match next_recipient(&me, self.env.application()) {
                    Some(next) => {
                        debug!(state = %DispatchState::Forwarding, from = %me, to = %next.me());
                        current = next;
                    }
                    None => {
                        debug!(state = %DispatchState::Exhausted, "hierarchy exhausted");
                        return MessageOutcome::untrapped(command);
                    }
                },
            }
        }
    }

    async fn deliver(
        &self,
        recipient: &Arc<dyn MessageRecipient>,
        command: &str,
        arguments: &[Value],
        depth: usize,
        interrupt: &Interrupt,
    ) -> Step {
        let script = match recipient.script() {
            Ok(script) => script,
            Err(e) => return Step::Failed(e.into()),
        };
        let Some(block) = script.handler(command).cloned() else {
            return Step::NotTrapped;
        };
        if let Err(e) = script::check_parameters(&block.name, &block.parameters) {
            return Step::Failed(e.into());
        }

        let context = Arc::new(ExecutionContext::new(
            recipient.me(),
            script,
            self.clone(),
            depth,
            interrupt.clone(),
        ));
        context.bind_parameters(&block.parameters, arguments.to_vec());

        let evaluator = self.evaluator;
        let mut worker =
            tokio::spawn(async move { evaluator.eval_handler_block(&block, context).await });

        tokio::select! {
            joined = &mut worker => match joined {
                Ok(Ok(outcome)) if outcome.trapped() => Step::Trapped,
                Ok(Ok(_)) => Step::NotTrapped,
                Ok(Err(EvalError::Interrupted)) => Step::Interrupted,
                Ok(Err(e)) => Step::Failed(e.into()),
                Err(e) => {
                    warn!("handler for {} did not complete: {}", command, e);
                    Step::Interrupted
                }
            },
            _ = interrupt.triggered() => {
                worker.abort();
                Step::Interrupted
            }
            _ = expired(self.env.config().handler_timeout) => {
                warn!("handler for {} timed out", command);
                interrupt.trigger();
                worker.abort();
                Step::Interrupted
            }
        }
    }
}

async fn expired(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}
