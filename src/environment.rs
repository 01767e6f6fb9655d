//! # Environment
//!
//! Everything the engine needs from the host application, passed explicitly
//! instead of being looked up through global singletons.
//!
//! - [`Application`]: the displayed card, its background, the stack, and the
//!   part inventory of the displayed card
//! - [`ModeProvider`]: browse or edit; edit mode suspends button and field scripts
//! - [`ErrorSurface`]: where script errors are shown to the user
//!
//! An [`EnvironmentContext`] bundles the three together with the global
//! variables and the dispatch configuration. It is built once by the host and
//! shared by every dispatch it starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchError, MessageRecipient};
use crate::eval::value::Value;
use crate::part::{Owner, PartKind, PartSpecifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    #[default]
    Browse,
    Edit,
}

impl ToolMode {
    pub fn is_browse(&self) -> bool {
        matches!(self, ToolMode::Browse)
    }
}

/// Host application state consulted while forwarding and counting.
pub trait Application: Send + Sync {
    fn current_card(&self) -> Arc<dyn MessageRecipient>;

    /// Background of the displayed card.
    fn current_background(&self) -> Arc<dyn MessageRecipient>;

    fn current_stack(&self) -> Arc<dyn MessageRecipient>;

    /// Number of parts on the displayed card with the given owner; `kind: None`
    /// counts buttons and fields together.
    fn part_count(&self, kind: Option<PartKind>, owner: Owner) -> usize;

    /// Finds the object named by `part` anywhere in the stack, including parts
    /// of cards that are not displayed.
    fn resolve(&self, part: &PartSpecifier) -> Option<Arc<dyn MessageRecipient>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ModeProvider: Send + Sync {
    fn tool_mode(&self) -> ToolMode;
}

#[cfg_attr(test, mockall::automock)]
pub trait ErrorSurface: Send + Sync {
    fn report(&self, error: &DispatchError);
}

/// Tool selection owned by the host's controller layer. The engine only reads it.
#[derive(Debug, Default)]
pub struct ToolState {
    editing: AtomicBool,
}

impl ToolState {
    pub fn new(mode: ToolMode) -> Self {
        let state = Self::default();
        state.set_tool_mode(mode);
        state
    }

    pub fn set_tool_mode(&self, mode: ToolMode) {
        debug!("tool mode -> {}", mode);
        self.editing.store(!mode.is_browse(), Ordering::SeqCst);
    }
}

impl ModeProvider for ToolState {
    fn tool_mode(&self) -> ToolMode {
        if self.editing.load(Ordering::SeqCst) {
            ToolMode::Edit
        } else {
            ToolMode::Browse
        }
    }
}

pub type ErrorReceiver = broadcast::Receiver<DispatchError>;

/// Broadcasts reported errors to whoever presents them (a dialog, a log
/// window, a test).
pub struct ErrorBus {
    sender: broadcast::Sender<DispatchError>,
    // チャネルを維持するための内部レシーバ
    _internal_receiver: broadcast::Receiver<DispatchError>,
}

impl ErrorBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = broadcast::channel(capacity);
        Self {
            sender,
            _internal_receiver: receiver,
        }
    }

    pub fn subscribe(&self) -> ErrorReceiver {
        self.sender.subscribe()
    }
}

impl ErrorSurface for ErrorBus {
    fn report(&self, error: &DispatchError) {
        warn!("script error: {}", error);
        if self.sender.send(error.clone()).is_err() {
            debug!("no error subscribers");
        }
    }
}

pub struct EnvironmentContext {
    application: Arc<dyn Application>,
    modes: Arc<dyn ModeProvider>,
    errors: Arc<dyn ErrorSurface>,
    globals: DashMap<String, Value>,
    config: DispatchConfig,
}

impl EnvironmentContext {
    pub fn new(
        application: Arc<dyn Application>,
        modes: Arc<dyn ModeProvider>,
        errors: Arc<dyn ErrorSurface>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            application,
            modes,
            errors,
            globals: DashMap::new(),
            config,
        }
    }

    pub fn application(&self) -> &dyn Application {
        self.application.as_ref()
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.modes.tool_mode()
    }

    pub fn report(&self, error: &DispatchError) {
        self.errors.report(error)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Globals that were never assigned read as empty.
    pub fn global(&self, name: &str) -> Value {
        self.globals
            .get(&name.to_lowercase())
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.insert(name.to_lowercase(), value);
    }
}
