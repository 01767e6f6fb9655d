//! # In-memory Stack
//!
//! A minimal [`Application`] for hosts that keep their stack in memory, and for
//! the demo binary and tests. It knows the stack, its backgrounds and cards,
//! the buttons and fields on them, the message box, and which card is displayed.
//!
//! Part ids are unique across the whole stack. A new stack starts with one
//! background and one card, so there is always a displayed card.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::dispatch::MessageRecipient;
use crate::environment::Application;
use crate::part::{Owner, PartId, PartKind, PartSpecifier};
use crate::script::{Script, ScriptError, ScriptResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StackError {
    #[error("No such card: {0}")]
    NoSuchCard(PartId),
    #[error("No such background: {0}")]
    NoSuchBackground(PartId),
    #[error("No such object: {0}")]
    NoSuchObject(PartSpecifier),
    #[error("{0} cannot contain buttons or fields")]
    NotAContainer(PartSpecifier),
}

pub type StackResult<T> = Result<T, StackError>;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Any object of the stack that carries a script.
pub struct ScriptedObject {
    me: PartSpecifier,
    name: String,
    script: RwLock<ScriptResult<Arc<Script>>>,
}

impl ScriptedObject {
    fn new(me: PartSpecifier, name: &str) -> Self {
        Self {
            me,
            name: name.to_string(),
            script: RwLock::new(Ok(Arc::new(Script::new()))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the script. Invocations already running keep the old one.
    pub fn set_script(&self, script: Script) {
        *write(&self.script) = Ok(Arc::new(script));
    }

    /// Records that the script text of this object does not compile; every
    /// message sent here fails until a good script is set.
    pub fn set_compile_error(&self, message: &str) {
        *write(&self.script) = Err(ScriptError::Compile {
            object: self.me.to_string(),
            message: message.to_string(),
        });
    }
}

impl MessageRecipient for ScriptedObject {
    fn script(&self) -> ScriptResult<Arc<Script>> {
        read(&self.script).clone()
    }

    fn me(&self) -> PartSpecifier {
        self.me
    }
}

struct CardEntry {
    card: Arc<ScriptedObject>,
    background: Arc<ScriptedObject>,
    parts: Vec<PartSpecifier>,
}

struct BackgroundEntry {
    background: Arc<ScriptedObject>,
    parts: Vec<PartSpecifier>,
}

struct Layout {
    cards: Vec<CardEntry>,
    backgrounds: HashMap<PartId, BackgroundEntry>,
    current: usize,
}

impl Layout {
    // cards is never empty
    fn current_card(&self) -> &CardEntry {
        &self.cards[self.current.min(self.cards.len() - 1)]
    }
}

pub struct StackModel {
    stack: Arc<ScriptedObject>,
    layout: RwLock<Layout>,
    objects: DashMap<PartSpecifier, Arc<ScriptedObject>>,
    next_id: AtomicU64,
}

impl StackModel {
    pub fn new(name: &str) -> Self {
        let stack = Arc::new(ScriptedObject::new(PartSpecifier::Stack, name));
        let message_box = Arc::new(ScriptedObject::new(PartSpecifier::MessageBox, "msg"));
        let background = Arc::new(ScriptedObject::new(PartSpecifier::Background(1), ""));
        let card = Arc::new(ScriptedObject::new(PartSpecifier::Card(2), ""));

        let objects = DashMap::new();
        objects.insert(PartSpecifier::Stack, stack.clone());
        objects.insert(PartSpecifier::MessageBox, message_box);
        objects.insert(background.me(), background.clone());
        objects.insert(card.me(), card.clone());

        let mut backgrounds = HashMap::new();
        backgrounds.insert(
            1,
            BackgroundEntry {
                background: background.clone(),
                parts: vec![],
            },
        );

        Self {
            stack,
            layout: RwLock::new(Layout {
                cards: vec![CardEntry {
                    card,
                    background,
                    parts: vec![],
                }],
                backgrounds,
                current: 0,
            }),
            objects,
            next_id: AtomicU64::new(3),
        }
    }

    fn allocate_id(&self) -> PartId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn register(&self, me: PartSpecifier, name: &str) -> Arc<ScriptedObject> {
        let object = Arc::new(ScriptedObject::new(me, name));
        self.objects.insert(me, object.clone());
        object
    }

    pub fn first_background(&self) -> PartSpecifier {
        read(&self.layout).cards[0].background.me()
    }

    pub fn first_card(&self) -> PartSpecifier {
        read(&self.layout).cards[0].card.me()
    }

    pub fn add_background(&self) -> PartSpecifier {
        let id = self.allocate_id();
        let background = self.register(PartSpecifier::Background(id), "");
        write(&self.layout).backgrounds.insert(
            id,
            BackgroundEntry {
                background,
                parts: vec![],
            },
        );
        PartSpecifier::Background(id)
    }

    /// Appends a card using `background`.
    pub fn add_card(&self, background: PartId) -> StackResult<PartSpecifier> {
        let mut layout = write(&self.layout);
        let background = layout
            .backgrounds
            .get(&background)
            .map(|entry| entry.background.clone())
            .ok_or(StackError::NoSuchBackground(background))?;

        let id = self.allocate_id();
        let card = self.register(PartSpecifier::Card(id), "");
        layout.cards.push(CardEntry {
            card,
            background,
            parts: vec![],
        });
        Ok(PartSpecifier::Card(id))
    }

    /// Creates a button or field on a card or background.
    pub fn add_part(
        &self,
        kind: PartKind,
        container: PartSpecifier,
        name: &str,
    ) -> StackResult<PartSpecifier> {
        let mut layout = write(&self.layout);
        let owner = match container {
            PartSpecifier::Card(_) => Owner::Card,
            PartSpecifier::Background(_) => Owner::Background,
            other => return Err(StackError::NotAContainer(other)),
        };

        let parts = match container {
            PartSpecifier::Card(card_id) => layout
                .cards
                .iter_mut()
                .find(|entry| entry.card.me() == container)
                .map(|entry| &mut entry.parts)
                .ok_or(StackError::NoSuchCard(card_id))?,
            PartSpecifier::Background(background_id) => layout
                .backgrounds
                .get_mut(&background_id)
                .map(|entry| &mut entry.parts)
                .ok_or(StackError::NoSuchBackground(background_id))?,
            other => return Err(StackError::NotAContainer(other)),
        };

        let id = self.allocate_id();
        let part = match kind {
            PartKind::Button => PartSpecifier::button(owner, id),
            PartKind::Field => PartSpecifier::field(owner, id),
        };
        parts.push(part);
        self.register(part, name);
        debug!("added {} ({}) to {}", part, name, container);
        Ok(part)
    }

    pub fn remove_part(&self, part: &PartSpecifier) -> StackResult<()> {
        if !part.is_card_element() || self.objects.remove(part).is_none() {
            return Err(StackError::NoSuchObject(*part));
        }
        let mut layout = write(&self.layout);
        for entry in layout.cards.iter_mut() {
            entry.parts.retain(|p| p != part);
        }
        for entry in layout.backgrounds.values_mut() {
            entry.parts.retain(|p| p != part);
        }
        Ok(())
    }

    pub fn object(&self, part: &PartSpecifier) -> StackResult<Arc<ScriptedObject>> {
        self.objects
            .get(part)
            .map(|entry| entry.value().clone())
            .ok_or(StackError::NoSuchObject(*part))
    }

    pub fn set_script(&self, part: &PartSpecifier, script: Script) -> StackResult<()> {
        self.object(part)?.set_script(script);
        Ok(())
    }

    pub fn go_to_card(&self, card: PartId) -> StackResult<()> {
        let mut layout = write(&self.layout);
        let index = layout
            .cards
            .iter()
            .position(|entry| entry.card.me() == PartSpecifier::Card(card))
            .ok_or(StackError::NoSuchCard(card))?;
        layout.current = index;
        debug!("displaying card id {}", card);
        Ok(())
    }

    pub fn card_count(&self) -> usize {
        read(&self.layout).cards.len()
    }
}

fn count_parts(parts: &[PartSpecifier], kind: Option<PartKind>) -> usize {
    parts
        .iter()
        .filter(|part| kind.is_none() || part.kind() == kind)
        .count()
}

impl Application for StackModel {
    fn current_card(&self) -> Arc<dyn MessageRecipient> {
        read(&self.layout).current_card().card.clone()
    }

    fn current_background(&self) -> Arc<dyn MessageRecipient> {
        read(&self.layout).current_card().background.clone()
    }

    fn current_stack(&self) -> Arc<dyn MessageRecipient> {
        self.stack.clone()
    }

    fn part_count(&self, kind: Option<PartKind>, owner: Owner) -> usize {
        let layout = read(&self.layout);
        let card = layout.current_card();
        match owner {
            Owner::Card => count_parts(&card.parts, kind),
            Owner::Background => {
                let background_id = match card.background.me() {
                    PartSpecifier::Background(id) => id,
                    _ => return 0,
                };
                layout
                    .backgrounds
                    .get(&background_id)
                    .map(|entry| count_parts(&entry.parts, kind))
                    .unwrap_or(0)
            }
        }
    }

    fn resolve(&self, part: &PartSpecifier) -> Option<Arc<dyn MessageRecipient>> {
        self.objects
            .get(part)
            .map(|entry| entry.value().clone() as Arc<dyn MessageRecipient>)
    }
}
