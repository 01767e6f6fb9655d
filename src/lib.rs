//! # CardTalk: Message Passing for Card Stacks
//!
//! CardTalk runs the scripts attached to the objects of a card stack. A
//! message (`mouseUp`, `openCard`, a user-defined command) is delivered to one
//! object; when that object's script does not trap it, the message travels on
//! to the object that contains it until a handler traps it or the stack has
//! been passed.
//!
//! ## Layers
//!
//! - Objects and their scripts: [`part`], [`script`], [`ast`]
//! - Host collaborators: [`environment`] (displayed card, tool mode, error
//!   presentation) and an in-memory host in [`stack`]
//! - Message passing: [`dispatch`], including deferred key events
//! - Script execution: [`eval`], with the value model and built-in functions
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! receive_message → tool mode gate → handler lookup → worker task → trap / forward
//! ```
//!
//! Each stage logs its state transition through `tracing`, keyed by a dispatch id.
//!
//! ## Configuration
//!
//! [`config::SystemConfig`] is read from JSON; its dispatch section sets the
//! handler timeout and the nesting limit for sends and function calls.

pub mod ast;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod eval;
pub mod part;
pub mod script;
pub mod stack;

// Re-exports
pub use ast::*;
pub use error::*;
pub use eval::value::Value;
pub use part::*;
