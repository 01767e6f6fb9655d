use cardtalk::{
    ast::{BuiltInFunction, Chunk, Countable, Expression, Statement, UserFunction},
    eval::evaluator::EvalError,
    part::{Owner, PartKind},
    script::Script,
    InternalResult, Value,
};
use pretty_assertions::assert_eq;

use crate::Harness;

/// Evaluates `expr` as the return value of a card function.
async fn evaluate(h: &Harness, expr: Expression) -> Result<Value, EvalError> {
    h.stack
        .set_script(
            &h.card(),
            Script::new().define_function(UserFunction::new(
                "evaluate",
                &[],
                vec![Statement::Return(Some(expr))],
            )),
        )
        .expect("card exists");
    let card = h.recipient(h.card());
    h.dispatcher
        .invoke_function(card.as_ref(), "evaluate", vec![])
        .await
}

fn builtin(function: BuiltInFunction) -> Expression {
    Expression::BuiltIn(function)
}

#[tokio::test]
async fn test_average_of_items() -> InternalResult<()> {
    let h = Harness::new();

    let mean = evaluate(
        &h,
        builtin(BuiltInFunction::Average(Box::new(Expression::literal(
            "1,2,3,4",
        )))),
    )
    .await?;
    let empty = evaluate(
        &h,
        builtin(BuiltInFunction::Average(Box::new(Expression::literal("")))),
    )
    .await?;

    assert_eq!(mean, Value::Float(2.5));
    assert_eq!(empty, Value::Integer(0));
    Ok(())
}

#[tokio::test]
async fn test_average_rejects_text() {
    let h = Harness::new();
    let result = evaluate(
        &h,
        builtin(BuiltInFunction::Average(Box::new(Expression::literal(
            "1,two,3",
        )))),
    )
    .await;

    assert_eq!(result, Err(EvalError::NotANumber("two".to_string())));
}

#[tokio::test]
async fn test_min_and_max_keep_argument() -> InternalResult<()> {
    let h = Harness::new();
    let arguments = || {
        vec![
            Expression::literal(3i64),
            Expression::literal(" 1"),
            Expression::literal(2.5),
        ]
    };

    assert_eq!(
        evaluate(&h, builtin(BuiltInFunction::Min(arguments()))).await?,
        Value::from(" 1")
    );
    assert_eq!(
        evaluate(&h, builtin(BuiltInFunction::Max(arguments()))).await?,
        Value::Integer(3)
    );
    assert_eq!(
        evaluate(&h, builtin(BuiltInFunction::Min(vec![]))).await,
        Err(EvalError::ArityError {
            function: "min".to_string(),
            minimum: 1,
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_sum_of_list() -> InternalResult<()> {
    let h = Harness::new();
    let list = Expression::literal(vec![Value::Integer(2), Value::from("3"), Value::Float(0.5)]);

    assert_eq!(
        evaluate(&h, builtin(BuiltInFunction::Sum(Box::new(list)))).await?,
        Value::Float(5.5)
    );
    Ok(())
}

#[tokio::test]
async fn test_number_of_chunks() -> InternalResult<()> {
    let h = Harness::new();
    let count = |chunk, text: &str| {
        builtin(BuiltInFunction::NumberOf(Countable::Chunks {
            chunk,
            of: Box::new(Expression::literal(text)),
        }))
    };

    assert_eq!(
        evaluate(&h, count(Chunk::Words, "  the quick  fox ")).await?,
        Value::Integer(3)
    );
    assert_eq!(
        evaluate(&h, count(Chunk::Items, "a,b,")).await?,
        Value::Integer(2)
    );
    assert_eq!(
        evaluate(&h, count(Chunk::Lines, "one\ntwo\nthree")).await?,
        Value::Integer(3)
    );
    assert_eq!(
        evaluate(&h, count(Chunk::Chars, "")).await?,
        Value::Integer(0)
    );
    Ok(())
}

#[tokio::test]
async fn test_number_of_parts_on_displayed_card() -> InternalResult<()> {
    let h = Harness::new();
    h.add_button(Owner::Card);
    h.add_button(Owner::Card);
    h.add_field(Owner::Card);
    h.add_field(Owner::Background);
    let parts = |kind, owner| builtin(BuiltInFunction::NumberOf(Countable::Parts { kind, owner }));

    assert_eq!(
        evaluate(&h, parts(Some(PartKind::Button), Owner::Card)).await?,
        Value::Integer(2)
    );
    assert_eq!(
        evaluate(&h, parts(Some(PartKind::Field), Owner::Background)).await?,
        Value::Integer(1)
    );
    assert_eq!(
        evaluate(&h, parts(None, Owner::Card)).await?,
        Value::Integer(3)
    );
    assert_eq!(
        evaluate(&h, parts(Some(PartKind::Button), Owner::Background)).await?,
        Value::Integer(0)
    );
    Ok(())
}
