use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use cardtalk::{
    ast::{HandlerBlock, Statement},
    config::DispatchConfig,
    dispatch::{DispatchHandle, Dispatcher, KeyEvent, KeyEventDeferral, KeyEventSource, MessageRecipient},
    part::Owner,
    script::Script,
    stack::StackResult,
    Value,
};
use pretty_assertions::assert_eq;

use crate::{count_parts, visiting_handler, Harness};

/// A text field that offers every key press to its script first and falls
/// back to native editing when the script does not trap it.
struct TextField {
    deferral: KeyEventDeferral,
    dispatcher: Dispatcher,
    me: Arc<dyn MessageRecipient>,
    typed: Mutex<Vec<KeyEvent>>,
    offered: Mutex<usize>,
}

impl TextField {
    fn new(dispatcher: Dispatcher, me: Arc<dyn MessageRecipient>) -> Arc<Self> {
        Arc::new(Self {
            deferral: KeyEventDeferral::new(),
            dispatcher,
            me,
            typed: Mutex::new(vec![]),
            offered: Mutex::new(0),
        })
    }

    /// Entry point for key presses coming from the keyboard or redelivered.
    fn key_pressed(self: &Arc<Self>, mut event: KeyEvent) -> Option<DispatchHandle> {
        let handle = self.deferral.receive_and_defer(
            &self.dispatcher,
            self.me.clone(),
            "keyDown",
            vec![Value::from(event.key_char.map(String::from).unwrap_or_default())],
            &mut event,
            self.clone(),
        );
        match handle {
            Some(handle) => {
                *self.offered.lock().unwrap() += 1;
                assert!(event.is_consumed());
                Some(handle)
            }
            None => {
                self.typed.lock().unwrap().push(event);
                None
            }
        }
    }

    fn typed(&self) -> Vec<char> {
        self.typed
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.key_char)
            .collect()
    }
}

impl KeyEventSource for TextField {
    fn dispatch_event(&self, event: KeyEvent) {
        // the component treats redelivered events like fresh input
        assert!(event.is_redelivery());
        assert!(!event.is_consumed());
        assert!(self.deferral.is_pending());
        let handle = self.deferral.receive_and_defer(
            &self.dispatcher,
            self.me.clone(),
            "keyDown",
            vec![],
            &mut event.clone(),
            Arc::new(NoSource),
        );
        assert!(handle.is_none());
        self.typed.lock().unwrap().push(event);
    }
}

struct NoSource;

impl KeyEventSource for NoSource {
    fn dispatch_event(&self, _event: KeyEvent) {
        panic!("nothing should be redelivered here");
    }
}

#[tokio::test]
async fn test_untrapped_key_is_handed_back_once() -> StackResult<()> {
    let h = Harness::new();
    let field = h.add_field(Owner::Card);
    h.stack.set_script(
        &field,
        Script::new().define_handler(visiting_handler("keyDown", "field", vec![Statement::Pass])),
    )?;
    let component = TextField::new(h.dispatcher.clone(), h.recipient(field));

    let handle = component.key_pressed(KeyEvent::new(65, Some('a')));
    handle.expect("dispatch started").finished().await;

    assert_eq!(component.typed(), vec!['a']);
    assert_eq!(*component.offered.lock().unwrap(), 1);
    assert!(!component.deferral.is_pending());
    assert_eq!(h.global("trail"), Value::from("field,"));
    Ok(())
}

#[tokio::test]
async fn test_trapped_key_is_swallowed() -> StackResult<()> {
    let h = Harness::new();
    let field = h.add_field(Owner::Card);
    h.stack.set_script(
        &h.card(),
        Script::new().define_handler(HandlerBlock::new("keyDown", vec![])),
    )?;
    let component = TextField::new(h.dispatcher.clone(), h.recipient(field));

    let handle = component.key_pressed(KeyEvent::new(66, Some('b')));
    handle.expect("dispatch started").finished().await;

    assert!(component.typed().is_empty());
    assert!(!component.deferral.is_pending());
    Ok(())
}

#[tokio::test]
async fn test_key_without_any_handler_is_typed() {
    let h = Harness::new();
    let field = h.add_field(Owner::Card);
    let component = TextField::new(h.dispatcher.clone(), h.recipient(field));

    let first = component.key_pressed(KeyEvent::new(67, Some('c')));
    first.expect("dispatch started").finished().await;

    assert_eq!(component.typed(), vec!['c']);
    assert_eq!(*component.offered.lock().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn test_overlapping_keys_stay_pending_until_last_completes() -> StackResult<()> {
    let h = Harness::slow(DispatchConfig::default(), Duration::from_millis(300));
    let field = h.add_field(Owner::Card);
    h.stack.set_script(
        &field,
        Script::new().define_handler(HandlerBlock::new(
            "keyDown",
            vec![count_parts(), Statement::Pass],
        )),
    )?;
    let component = TextField::new(h.dispatcher.clone(), h.recipient(field));

    let first = component.key_pressed(KeyEvent::new(66, Some('b')));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = component.key_pressed(KeyEvent::new(65, Some('a')));

    first.expect("dispatch started").finished().await;
    assert!(component.deferral.is_pending());
    assert_eq!(component.typed(), vec!['b']);

    second.expect("dispatch started").finished().await;
    assert!(!component.deferral.is_pending());
    assert_eq!(component.typed(), vec!['b', 'a']);
    Ok(())
}
