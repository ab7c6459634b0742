use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stack_advisor_cli::commands::{AskCommand, ChatCommand, ConfigCommand, PrefsCommand};
use stack_advisor_cli::context::AppContext;
use stack_advisor_cli::error::CliResult;
use stack_advisor_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stack-advisor")]
#[command(about = "Stack Advisor - personalized technology stack recommendations")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to data directory")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(
        long,
        global = true,
        help = "Keep preferences in memory only for this run"
    )]
    pub ephemeral: bool,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Start an interactive conversation (default)")]
    Chat(ChatCommand),

    #[clap(about = "Ask a single question and print the reply")]
    Ask(AskCommand),

    #[clap(about = "Preference profile commands")]
    Prefs(PrefsCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr so the transcript on stdout stays clean
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,stack_advisor=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let context = AppContext::load(cli.config.as_deref(), cli.data_dir.clone(), cli.ephemeral)?;

    match cli.command {
        None => ChatCommand::default().execute(&context, format).await,
        Some(Command::Chat(cmd)) => cmd.execute(&context, format).await,
        Some(Command::Ask(cmd)) => cmd.execute(&context, format).await,
        Some(Command::Prefs(cmd)) => cmd.execute(&context, format),
        Some(Command::Config(cmd)) => cmd.execute(&context, format),
    }
}
