use std::sync::Arc;

use crate::environment::Application;
use crate::part::{Owner, PartSpecifier};
use crate::script::{Script, ScriptResult};

/// Anything a message can be sent to. Implementors only say who they are and
/// what their script is; the [`Dispatcher`](super::Dispatcher) supplies the
/// behavior.
pub trait MessageRecipient: Send + Sync {
    /// The compiled script; fails when the object's script text did not compile.
    fn script(&self) -> ScriptResult<Arc<Script>>;

    /// Bound to "me" while this object's handlers run.
    fn me(&self) -> PartSpecifier;
}

/// Where an untrapped message goes after `part`. `None` once the stack has
/// had its turn.
pub fn next_recipient(
    part: &PartSpecifier,
    application: &dyn Application,
) -> Option<Arc<dyn MessageRecipient>> {
    match part {
        PartSpecifier::Background(_) => Some(application.current_stack()),
        PartSpecifier::MessageBox => Some(application.current_card()),
        PartSpecifier::Card(_) => Some(application.current_background()),
        PartSpecifier::Stack => None,
        PartSpecifier::Field { owner, .. } | PartSpecifier::Button { owner, .. } => match owner {
            Owner::Background => Some(application.current_background()),
            Owner::Card => Some(application.current_card()),
        },
    }
}
