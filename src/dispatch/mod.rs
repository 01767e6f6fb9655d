//! # Message Passing
//!
//! Messages travel from the object they were sent to up a fixed hierarchy:
//!
//! ```text
//! button/field ──▶ card or background (by owner)
//! message box  ──▶ card
//! card         ──▶ background
//! background   ──▶ stack
//! stack        ──▶ (end)
//! ```
//!
//! - [`MessageRecipient`]: what every addressable object provides
//! - [`Dispatcher`]: runs handlers and forwards untrapped messages
//! - [`KeyEventDeferral`]: key presses that fall back to the component when untrapped

pub mod engine;
pub mod interrupt;
pub mod key_event;
pub mod recipient;

pub use engine::{
    CompletionObserver, DispatchError, DispatchHandle, DispatchState, Dispatcher, MessageOutcome,
};
pub use interrupt::Interrupt;
pub use key_event::{KeyEvent, KeyEventDeferral, KeyEventSource};
pub use recipient::{next_recipient, MessageRecipient};
