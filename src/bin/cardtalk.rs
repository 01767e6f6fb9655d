use std::path::PathBuf;
use std::sync::Arc;

use cardtalk::{
    ast::{BinaryOperator, BuiltInFunction, Countable, Expression, HandlerBlock, Statement},
    config::SystemConfig,
    dispatch::{Dispatcher, MessageRecipient},
    environment::{EnvironmentContext, ErrorBus, ToolMode, ToolState},
    part::{Owner, PartKind, PartSpecifier},
    script::Script,
    stack::StackModel,
    Error, InternalResult, Value,
};
use clap::{command, Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Button,
    Field,
    Card,
    Background,
    Stack,
    Msg,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Message to send
    #[arg(short, long, default_value = "mouseUp")]
    message: String,

    /// Object of the demo stack that receives the message
    #[arg(short, long, value_enum, default_value = "button")]
    target: Target,

    /// Start in edit mode
    #[arg(short, long)]
    edit: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn trace(who: &str) -> Statement {
    Statement::set_global(
        "trail",
        Expression::binary(
            BinaryOperator::Concat,
            Expression::global("trail"),
            Expression::literal(format!("{} ", who)),
        ),
    )
}

/// One card with a button and a background field; every level passes the
/// message on except the stack.
fn demo_stack() -> InternalResult<(Arc<StackModel>, PartSpecifier, PartSpecifier)> {
    let stack = Arc::new(StackModel::new("Demo"));
    let button = stack.add_part(PartKind::Button, stack.first_card(), "Compute")?;
    let field = stack.add_part(PartKind::Field, stack.first_background(), "Scores")?;

    stack.set_script(
        &button,
        Script::new().define_handler(HandlerBlock::new(
            "mouseUp",
            vec![trace("button"), Statement::Pass],
        )),
    )?;
    stack.set_script(
        &field,
        Script::new().define_handler(HandlerBlock::new(
            "mouseUp",
            vec![trace("field"), Statement::Pass],
        )),
    )?;
    stack.set_script(
        &stack.first_card(),
        Script::new().define_handler(HandlerBlock::new(
            "mouseUp",
            vec![
                trace("card"),
                Statement::set_global(
                    "average",
                    Expression::BuiltIn(BuiltInFunction::Average(Box::new(
                        Expression::literal("88,92,75,100"),
                    ))),
                ),
                Statement::Pass,
            ],
        )),
    )?;
    stack.set_script(
        &stack.first_background(),
        Script::new().define_handler(HandlerBlock::new(
            "mouseUp",
            vec![
                trace("background"),
                Statement::set_global(
                    "parts",
                    Expression::BuiltIn(BuiltInFunction::NumberOf(Countable::Parts {
                        kind: None,
                        owner: Owner::Card,
                    })),
                ),
                Statement::Pass,
            ],
        )),
    )?;
    stack.set_script(
        &PartSpecifier::Stack,
        Script::new().define_handler(HandlerBlock::new("mouseUp", vec![trace("stack")])),
    )?;

    Ok((stack, button, field))
}

async fn run(cli: &Cli) -> InternalResult<()> {
    let config = if cli.config.exists() {
        SystemConfig::from_file(&cli.config)?
    } else {
        SystemConfig::default()
    };
    info!("config loaded.");
    debug!("config: {:?}", config);

    let (stack, button, field) = demo_stack()?;
    let mode = if cli.edit {
        ToolMode::Edit
    } else {
        config.initial_tool_mode
    };
    let errors = Arc::new(ErrorBus::new(config.error_buffer_size));
    let mut reported = errors.subscribe();
    let env = EnvironmentContext::new(
        stack.clone(),
        Arc::new(ToolState::new(mode)),
        errors,
        config.dispatch.clone(),
    );
    let dispatcher = Dispatcher::new(Arc::new(env));

    let part = match cli.target {
        Target::Button => button,
        Target::Field => field,
        Target::Card => stack.first_card(),
        Target::Background => stack.first_background(),
        Target::Stack => PartSpecifier::Stack,
        Target::Msg => PartSpecifier::MessageBox,
    };
    let recipient: Arc<dyn MessageRecipient> = stack.object(&part)?;

    println!("sending {} to {} ({} mode)", cli.message, part, mode);
    let outcome = dispatcher
        .send_and_wait(recipient, &cli.message, vec![])
        .await;

    while let Ok(error) = reported.try_recv() {
        println!("script error: {}", error);
    }
    for name in ["trail", "average", "parts"] {
        let value = dispatcher.env().global(name);
        if value != Value::Empty {
            println!("{}: {}", name, value.to_string().trim_end());
        }
    }
    println!("trapped: {}", outcome.trapped);

    match outcome.error {
        Some(error) => Err(Error::from(error)),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
