//! Key presses as messages.
//!
//! A key press is offered to scripts first (`keyDown`, `arrowKey`, ...). The
//! original event is consumed right away so the component does not act on it;
//! if no handler in the chain traps the message, a copy is handed back to the
//! component once the whole chain has finished.
//!
//! The copy is marked as a redelivery. Deferring a redelivered event is
//! refused, so handing the copy back can never start a second dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::engine::{DispatchHandle, Dispatcher};
use super::recipient::MessageRecipient;
use crate::eval::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub key_code: u32,
    pub key_char: Option<char>,
    pub modifiers: u32,
    pub when: DateTime<Utc>,
    consumed: bool,
    redelivery: bool,
}

impl KeyEvent {
    pub fn new(key_code: u32, key_char: Option<char>) -> Self {
        Self {
            key_code,
            key_char,
            modifiers: 0,
            when: Utc::now(),
            consumed: false,
            redelivery: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: u32) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Set on the copy handed back after an untrapped dispatch.
    pub fn is_redelivery(&self) -> bool {
        self.redelivery
    }

    fn redelivery_copy(&self) -> Self {
        Self {
            consumed: false,
            redelivery: true,
            ..self.clone()
        }
    }
}

/// The component a key event came from.
pub trait KeyEventSource: Send + Sync {
    /// Delivers `event` to the component as if it had just been typed.
    fn dispatch_event(&self, event: KeyEvent);
}

/// Deferral state of one component.
#[derive(Debug, Clone, Default)]
pub struct KeyEventDeferral {
    in_flight: Arc<AtomicUsize>,
}

impl KeyEventDeferral {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while any deferred dispatch of this component has not completed.
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Consumes `event` and sends `command` to `recipient`. Returns `None`
    /// without dispatching when `event` is itself a redelivery; the component
    /// should then handle it natively.
    pub fn receive_and_defer(
        &self,
        dispatcher: &Dispatcher,
        recipient: Arc<dyn MessageRecipient>,
        command: &str,
        arguments: Vec<Value>,
        event: &mut KeyEvent,
        source: Arc<dyn KeyEventSource>,
    ) -> Option<DispatchHandle> {
        if event.is_redelivery() {
            debug!("{} redelivered, not deferring again", command);
            return None;
        }

        let copy = event.redelivery_copy();
        event.consume();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.clone();
        let handle = dispatcher.receive_message(
            recipient,
            command,
            arguments,
            Box::new(move |outcome| {
                if !outcome.trapped {
                    debug!("{} not trapped, handing key back", outcome.command);
                    source.dispatch_event(copy);
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }),
        );
        Some(handle)
    }
}
