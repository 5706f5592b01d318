//! Command-line interface for equisage
//!
//! # Usage
//!
//! ```bash
//! export LLM_API_KEY="..."
//! export EQUISAGE_SESSION_DB="data/sessions.db"   # optional
//!
//! equisage ask --conversation me "tell me about Infosys"
//! equisage repl
//! TELEGRAM_BOT_TOKEN="..." equisage telegram
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use equisage_core::{ConversationId, TurnResponse};
use equisage_stock::{StockConfig, StockService};
use equisage_utils::{Config, init_tracing};
use std::io::{self, BufRead, Write};
use tracing::info;

const DEFAULT_CONVERSATION: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "equisage")]
#[command(
    version,
    about = "Conversational research assistant for Indian stocks",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Answer a single message and exit
    Ask {
        /// Conversation the message belongs to
        #[arg(short, long, default_value = DEFAULT_CONVERSATION)]
        conversation: String,

        /// The message
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Chat interactively on stdin
    Repl {
        /// Conversation to continue
        #[arg(short, long, default_value = DEFAULT_CONVERSATION)]
        conversation: String,
    },
    /// Serve Telegram chats by long polling
    Telegram,
}

fn print_banner(app_name: &str, conversation: &str) {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║                EquiSage Stock Research Shell                 ║
║                                                              ║
║  Ask about any Indian listed company, for example:           ║
║    "tell me about Reliance Industries"                       ║
║    "what is its debt to equity?"   (after an analysis)       ║
║                                                              ║
║  /exit or Ctrl-D to quit                                     ║
╚══════════════════════════════════════════════════════════════╝
"#
    );
    println!("  App: {app_name}    Conversation: {conversation}\n");
}

fn print_response(response: &TurnResponse) {
    println!("{}\n", response.text);
    for attachment in &response.attachments {
        println!("  [{:?}] {}", attachment.kind, attachment.path.display());
    }
}

async fn repl(service: &StockService, conversation: ConversationId) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("you> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "/exit" | "/quit") {
            println!("Goodbye!");
            break;
        }

        match service.ask(conversation.clone(), input).await {
            Ok(response) => print_response(&response),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = Config::from_env()?;
    init_tracing(app.log_format);

    let config = StockConfig::from_env()
        .context("invalid stock configuration")?
        .with_data_dir(&app.data_dir);
    info!(app = %app.app_name, data_dir = %app.data_dir.display(), "Starting");
    let service = StockService::from_config(config)
        .await
        .context("could not start the orchestrator")?;

    match cli.command {
        Command::Ask {
            conversation,
            message,
        } => {
            let response = service.ask(conversation, message.join(" ")).await?;
            print_response(&response);
        }
        Command::Repl { conversation } => {
            print_banner(&app.app_name, &conversation);
            repl(&service, ConversationId::from(conversation)).await?;
        }
        Command::Telegram => service.run_telegram().await?,
    }

    Ok(())
}
