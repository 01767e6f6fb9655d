mod dispatch_tests;
mod evaluation_tests;
mod key_event_tests;

use std::sync::Arc;
use std::time::Duration;

use cardtalk::{
    ast::{BinaryOperator, BuiltInFunction, Countable, Expression, HandlerBlock, Statement},
    config::DispatchConfig,
    dispatch::{Dispatcher, MessageRecipient},
    environment::{Application, EnvironmentContext, ErrorBus, ToolMode, ToolState},
    part::{Owner, PartKind, PartSpecifier},
    stack::StackModel,
    Value,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    // tracing_subscriberの初期化
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// A one-card stack wired to a dispatcher, with errors going to a bus.
pub struct Harness {
    pub stack: Arc<StackModel>,
    pub tools: Arc<ToolState>,
    pub errors: Arc<ErrorBus>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self::build(config, None)
    }

    /// Part counts on this stack block the calling thread for `delay`.
    pub fn slow(config: DispatchConfig, delay: Duration) -> Self {
        Self::build(config, Some(delay))
    }

    fn build(config: DispatchConfig, delay: Option<Duration>) -> Self {
        let stack = Arc::new(StackModel::new("Test"));
        let tools = Arc::new(ToolState::new(ToolMode::Browse));
        let errors = Arc::new(ErrorBus::new(16));
        let application: Arc<dyn Application> = match delay {
            Some(delay) => Arc::new(SlowInventory {
                stack: stack.clone(),
                delay,
            }),
            None => stack.clone(),
        };
        let env = EnvironmentContext::new(application, tools.clone(), errors.clone(), config);
        Self {
            stack,
            tools,
            errors,
            dispatcher: Dispatcher::new(Arc::new(env)),
        }
    }

    pub fn card(&self) -> PartSpecifier {
        self.stack.first_card()
    }

    pub fn background(&self) -> PartSpecifier {
        self.stack.first_background()
    }

    pub fn add_button(&self, owner: Owner) -> PartSpecifier {
        let container = match owner {
            Owner::Card => self.card(),
            Owner::Background => self.background(),
        };
        self.stack
            .add_part(PartKind::Button, container, "button")
            .expect("container exists")
    }

    pub fn add_field(&self, owner: Owner) -> PartSpecifier {
        let container = match owner {
            Owner::Card => self.card(),
            Owner::Background => self.background(),
        };
        self.stack
            .add_part(PartKind::Field, container, "field")
            .expect("container exists")
    }

    pub fn recipient(&self, part: PartSpecifier) -> Arc<dyn MessageRecipient> {
        self.stack.resolve(&part).expect("object exists")
    }

    pub fn global(&self, name: &str) -> Value {
        self.dispatcher.env().global(name)
    }
}

/// Host whose part inventory takes a while to answer.
pub struct SlowInventory {
    stack: Arc<StackModel>,
    delay: Duration,
}

impl Application for SlowInventory {
    fn current_card(&self) -> Arc<dyn MessageRecipient> {
        self.stack.current_card()
    }

    fn current_background(&self) -> Arc<dyn MessageRecipient> {
        self.stack.current_background()
    }

    fn current_stack(&self) -> Arc<dyn MessageRecipient> {
        self.stack.current_stack()
    }

    fn part_count(&self, kind: Option<PartKind>, owner: Owner) -> usize {
        std::thread::sleep(self.delay);
        self.stack.part_count(kind, owner)
    }

    fn resolve(&self, part: &PartSpecifier) -> Option<Arc<dyn MessageRecipient>> {
        self.stack.resolve(part)
    }
}

/// A statement that blocks on the host's part inventory.
pub fn count_parts() -> Statement {
    Statement::Expression(Expression::BuiltIn(BuiltInFunction::NumberOf(
        Countable::Parts {
            kind: None,
            owner: Owner::Card,
        },
    )))
}

/// `put <who> & "," after global trail`
pub fn record_visit(who: &str) -> Statement {
    Statement::set_global(
        "trail",
        Expression::binary(
            BinaryOperator::Concat,
            Expression::global("trail"),
            Expression::literal(format!("{},", who)),
        ),
    )
}

/// Handler that records `who` in the trail and then runs `rest`.
pub fn visiting_handler(message: &str, who: &str, rest: Vec<Statement>) -> HandlerBlock {
    let mut statements = vec![record_visit(who)];
    statements.extend(rest);
    HandlerBlock::new(message, statements)
}
