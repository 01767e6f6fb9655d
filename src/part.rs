//! Identity of the objects that take part in message passing.

use core::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

pub type PartId = u64;

/// Which layer a button or field lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Owner {
    Card,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum PartKind {
    Button,
    Field,
}

/// Names one addressable object. The variant plus the owner of a button or
/// field is enough to find the next recipient of an untrapped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartSpecifier {
    Stack,
    Background(PartId),
    Card(PartId),
    MessageBox,
    Field { owner: Owner, id: PartId },
    Button { owner: Owner, id: PartId },
}

impl PartSpecifier {
    pub fn button(owner: Owner, id: PartId) -> Self {
        PartSpecifier::Button { owner, id }
    }

    pub fn field(owner: Owner, id: PartId) -> Self {
        PartSpecifier::Field { owner, id }
    }

    /// Buttons and fields; scripts on these are suspended outside browse mode.
    pub fn is_card_element(&self) -> bool {
        matches!(
            self,
            PartSpecifier::Field { .. } | PartSpecifier::Button { .. }
        )
    }

    pub fn owner(&self) -> Option<Owner> {
        match self {
            PartSpecifier::Field { owner, .. } | PartSpecifier::Button { owner, .. } => {
                Some(*owner)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<PartKind> {
        match self {
            PartSpecifier::Field { .. } => Some(PartKind::Field),
            PartSpecifier::Button { .. } => Some(PartKind::Button),
            _ => None,
        }
    }
}

impl fmt::Display for PartSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PartSpecifier::Stack => write!(f, "this stack"),
            PartSpecifier::Background(id) => write!(f, "bkgnd id {}", id),
            PartSpecifier::Card(id) => write!(f, "card id {}", id),
            PartSpecifier::MessageBox => write!(f, "the message box"),
            PartSpecifier::Field { owner: Owner::Card, id } => write!(f, "card field id {}", id),
            PartSpecifier::Field {
                owner: Owner::Background,
                id,
            } => write!(f, "bkgnd field id {}", id),
            PartSpecifier::Button { owner: Owner::Card, id } => {
                write!(f, "card button id {}", id)
            }
            PartSpecifier::Button {
                owner: Owner::Background,
                id,
            } => write!(f, "bkgnd button id {}", id),
        }
    }
}
