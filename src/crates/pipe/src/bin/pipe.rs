//! Pipe CLI - run chat turns against the Responses API from the terminal
//!
//! Stands in for the chat host: loads settings, reads a chat body and prints
//! every fragment as it arrives.

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use pipe::{ChatBody, ConfigLoader, HostMessage, HostUser, LoggingConfig, Pipe};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipe")]
#[command(about = "Pipe - o1-pro / o3-pro Responses API adapter", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Settings file (TOML with [pipe] and [logging] tables)
    #[arg(short, long, env = "PIPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the models offered to the host
    Models,

    /// Run one chat turn
    Chat {
        /// Chat body JSON file ({"model": .., "messages": [..]}); stdin when omitted
        #[arg(short, long, conflicts_with = "prompt")]
        body: Option<PathBuf>,

        /// Single user prompt instead of a body file
        #[arg(short, long)]
        prompt: Option<String>,

        /// Model id, used with --prompt
        #[arg(short, long, default_value = "o3-pro")]
        model: String,

        /// User id for conversation tracking
        #[arg(short, long, default_value = "cli")]
        user: String,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
}

fn read_body(path: Option<&PathBuf>) -> anyhow::Result<ChatBody> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read body file {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read body from stdin")?;
            raw
        }
    };

    serde_json::from_str(&raw).context("Failed to parse chat body")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().await?;
    init_tracing(&config.logging);

    let pipe = Pipe::new(config.pipe)?;

    match cli.command {
        Commands::Models => {
            println!("{}", serde_json::to_string_pretty(&pipe.pipes())?);
        }
        Commands::Chat {
            body,
            prompt,
            model,
            user,
        } => {
            let body = match prompt {
                Some(prompt) => ChatBody::new(model, vec![HostMessage::user(prompt)]),
                None => read_body(body.as_ref())?,
            };

            let mut fragments = Box::pin(pipe.pipe(body, HostUser::new(user)));
            let mut stdout = std::io::stdout();
            while let Some(fragment) = fragments.next().await {
                write!(stdout, "{}", fragment)?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }
    }

    Ok(())
}
