use clap::{Parser, Subcommand};

use agent_server::logging::init_logging;
use agent_server::repl::{run_ask, run_repl};
use agent_server::{run_server, AppState, AssistantArgs};

#[derive(Parser, Debug)]
#[command(name = "agent-server")]
#[command(about = "Pharmacy assistant: HTTP server, interactive chat and one-shot questions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Server port
    #[arg(long, env = "PORT", default_value = "5000", global = true)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1", global = true)]
    host: String,

    /// Enable debug logging
    #[arg(long, env = "DEBUG", default_value = "false", global = true)]
    debug: bool,

    #[command(flatten)]
    assistant: AssistantArgs,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Chat interactively in the terminal
    Chat,
    /// Ask a single question and print the answer
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.debug {
        log::debug!("Debug mode enabled");
        log::debug!("  Model: {}", cli.assistant.model);
        log::debug!("  LLM Base URL: {:?}", cli.assistant.llm_base_url);
        log::debug!("  Max rounds: {}", cli.assistant.max_rounds);
        log::debug!("  Offline: {}", cli.assistant.offline);
    }

    let assistant = cli.assistant.build().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(AppState::new(assistant), &cli.host, cli.port).await?,
        Command::Chat => run_repl(&assistant).await?,
        Command::Ask { message } => run_ask(&assistant, &message.join(" ")).await?,
    }

    Ok(())
}
