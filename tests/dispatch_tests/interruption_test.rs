use std::time::Duration;

use cardtalk::{
    ast::{HandlerBlock, Statement},
    config::DispatchConfig,
    dispatch::{DispatchError, MessageOutcome},
    eval::evaluator::EvalError,
    part::{Owner, PartSpecifier},
    script::Script,
    stack::StackResult,
    Value,
};
use pretty_assertions::assert_eq;

use crate::{count_parts, record_visit, visiting_handler, Harness};

const DELAY: Duration = Duration::from_millis(300);

/// Long enough for a blocked handler to have finished if it was not stopped.
const SETTLE: Duration = Duration::from_millis(600);

/// A card button whose `mouseUp` handler blocks on the part inventory and
/// then passes to the card, which records its visit.
fn slow_button(h: &Harness) -> StackResult<PartSpecifier> {
    let button = h.add_button(Owner::Card);
    h.stack.set_script(
        &button,
        Script::new().define_handler(HandlerBlock::new(
            "mouseUp",
            vec![count_parts(), Statement::Pass],
        )),
    )?;
    h.stack.set_script(
        &h.card(),
        Script::new().define_handler(visiting_handler("mouseUp", "card", vec![])),
    )?;
    Ok(button)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_dispatch_is_untrapped() -> StackResult<()> {
    let h = Harness::slow(DispatchConfig::default(), DELAY);
    let mut reported = h.errors.subscribe();
    let button = slow_button(&h)?;

    let (handle, outcome) = h.dispatcher.send(h.recipient(button), "mouseUp", vec![]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();
    let outcome = outcome.await.expect("observer called");

    assert_eq!(outcome, MessageOutcome::untrapped("mouseUp"));
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.global("trail"), Value::Empty);
    assert!(reported.try_recv().is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handler_timeout_interrupts_chain() -> StackResult<()> {
    let config = DispatchConfig {
        handler_timeout: Some(Duration::from_millis(20)),
        ..DispatchConfig::default()
    };
    let h = Harness::slow(config, DELAY);
    let mut reported = h.errors.subscribe();
    let button = slow_button(&h)?;

    let outcome = h
        .dispatcher
        .send_and_wait(h.recipient(button), "mouseUp", vec![])
        .await;

    assert_eq!(outcome, MessageOutcome::untrapped("mouseUp"));
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.global("trail"), Value::Empty);
    assert!(reported.try_recv().is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_stops_handler_at_next_statement() -> StackResult<()> {
    let config = DispatchConfig {
        handler_timeout: Some(Duration::from_millis(20)),
        ..DispatchConfig::default()
    };
    let h = Harness::slow(config, DELAY);
    h.stack.set_script(
        &h.card(),
        Script::new().define_handler(HandlerBlock::new(
            "openCard",
            vec![count_parts(), record_visit("after")],
        )),
    )?;

    let outcome = h
        .dispatcher
        .send_and_wait(h.recipient(h.card()), "openCard", vec![])
        .await;

    assert!(!outcome.trapped);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.global("trail"), Value::Empty);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_stops_chains_started_by_send() -> StackResult<()> {
    let h = Harness::slow(DispatchConfig::default(), DELAY);
    let mut reported = h.errors.subscribe();
    let button = h.add_button(Owner::Card);
    h.stack.set_script(
        &button,
        Script::new().define_handler(HandlerBlock::new(
            "slow",
            vec![count_parts(), Statement::Pass],
        )),
    )?;
    h.stack.set_script(
        &h.card(),
        Script::new()
            .define_handler(HandlerBlock::new(
                "openCard",
                vec![
                    Statement::send("slow", vec![], Some(button)),
                    record_visit("sender"),
                ],
            ))
            .define_handler(visiting_handler("slow", "late", vec![])),
    )?;

    let (handle, outcome) = h.dispatcher.send(h.recipient(h.card()), "openCard", vec![]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    assert_eq!(
        outcome.await.expect("observer called"),
        MessageOutcome::untrapped("openCard")
    );
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.global("trail"), Value::Empty);
    assert!(reported.try_recv().is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nested_timeout_stops_sent_handler() -> StackResult<()> {
    let config = DispatchConfig {
        handler_timeout: Some(Duration::from_millis(100)),
        ..DispatchConfig::default()
    };
    let h = Harness::slow(config, DELAY);
    let button = h.add_button(Owner::Card);
    h.stack.set_script(
        &button,
        Script::new().define_handler(HandlerBlock::new(
            "slow",
            vec![count_parts(), record_visit("late")],
        )),
    )?;
    h.stack.set_script(
        &h.card(),
        Script::new().define_handler(HandlerBlock::new(
            "openCard",
            vec![
                Statement::send("slow", vec![], Some(button)),
                record_visit("sender"),
            ],
        )),
    )?;

    // the sender itself would time out too if it waited for the whole delay,
    // so only check that the nested handler was cut short
    let _ = h
        .dispatcher
        .send_and_wait(h.recipient(h.card()), "openCard", vec![])
        .await;
    tokio::time::sleep(SETTLE).await;

    let trail = h.global("trail").to_string();
    assert!(!trail.contains("late"), "trail: {}", trail);
    Ok(())
}

#[tokio::test]
async fn test_unbounded_send_hits_recursion_limit() -> StackResult<()> {
    let h = Harness::with_config(DispatchConfig {
        max_call_depth: 8,
        ..DispatchConfig::default()
    });
    let mut errors = h.errors.subscribe();
    h.stack.set_script(
        &h.card(),
        Script::new().define_handler(HandlerBlock::new(
            "ping",
            vec![record_visit("card"), Statement::send("ping", vec![], None)],
        )),
    )?;

    let outcome = h
        .dispatcher
        .send_and_wait(h.recipient(h.card()), "ping", vec![])
        .await;

    // only the innermost handler fails; every sender carries on
    assert!(outcome.trapped);
    assert_eq!(h.global("trail"), Value::from("card,".repeat(9)));
    assert_eq!(
        errors.recv().await.unwrap(),
        DispatchError::Eval(EvalError::RecursionLimit(8))
    );
    assert!(errors.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_send_runs_target_chain_before_continuing() -> StackResult<()> {
    let h = Harness::new();
    let button = h.add_button(Owner::Card);
    h.stack.set_script(
        &button,
        Script::new().define_handler(visiting_handler("hilite", "button", vec![Statement::Pass])),
    )?;
    h.stack.set_script(
        &h.card(),
        Script::new()
            .define_handler(visiting_handler(
                "openCard",
                "open",
                vec![
                    Statement::send("hilite", vec![], Some(button)),
                    record_visit("done"),
                ],
            ))
            .define_handler(visiting_handler("hilite", "card", vec![])),
    )?;

    let outcome = h
        .dispatcher
        .send_and_wait(h.recipient(h.card()), "openCard", vec![])
        .await;

    assert!(outcome.trapped);
    assert_eq!(outcome.error, None);
    assert_eq!(h.global("trail"), Value::from("open,button,card,done,"));
    Ok(())
}

#[tokio::test]
async fn test_send_to_unknown_object_fails_sender() -> StackResult<()> {
    let h = Harness::new();
    let missing = PartSpecifier::button(Owner::Card, 999);
    h.stack.set_script(
        &h.card(),
        Script::new().define_handler(HandlerBlock::new(
            "openCard",
            vec![Statement::send("hilite", vec![], Some(missing))],
        )),
    )?;

    let outcome = h
        .dispatcher
        .send_and_wait(h.recipient(h.card()), "openCard", vec![])
        .await;

    assert_eq!(
        outcome.error,
        Some(DispatchError::Eval(EvalError::UnknownObject(
            missing.to_string()
        )))
    );
    Ok(())
}
