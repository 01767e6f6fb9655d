//! Interruption of a dispatch chain and everything it started.
//!
//! Every chain owns an [`Interrupt`]. A chain started by `send` from one of its
//! handlers gets a child of it: interrupting a chain also interrupts its
//! descendants, while a child that times out leaves its ancestors running.
//!
//! Handlers observe the flag between statements, so work that does not yield
//! to the runtime still stops at the next statement boundary.

use std::sync::Arc;

use async_recursion::async_recursion;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Interrupt {
    own: Arc<watch::Sender<bool>>,
    parent: Option<Box<Interrupt>>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        let (own, _) = watch::channel(false);
        Self {
            own: Arc::new(own),
            parent: None,
        }
    }

    /// A fresh interrupt that also fires when `self` (or any ancestor) does.
    pub fn child(&self) -> Self {
        let (own, _) = watch::channel(false);
        Self {
            own: Arc::new(own),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn trigger(&self) {
        self.own.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.own.borrow() || self.parent.as_ref().is_some_and(|p| p.is_triggered())
    }

    /// Resolves once this interrupt or one of its ancestors has fired.
    #[async_recursion]
    pub async fn triggered(&self) {
        let mut own = self.own.subscribe();
        match &self.parent {
            Some(parent) => {
                tokio::select! {
                    _ = async { let _ = own.wait_for(|fired| *fired).await; } => {}
                    _ = parent.triggered() => {}
                }
            }
            None => {
                let _ = own.wait_for(|fired| *fired).await;
            }
        }
    }
}
