use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    api_key::generate_local_api_key, chat::ChatSession, probe::probe, Scheduler, TokioScheduler,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod commands;
mod host;
mod observer;
mod settings;

use commands::parse_command;
use host::{Flow, Host};
use observer::StatusBarObserver;
use settings::{load_settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser, Debug)]
#[command(about = "PowerAutomation MCP connection host")]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    no_auto_connect: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session with the status bar and auto-connect (default).
    Run,
    /// Connect once and print the final status.
    Connect,
    /// Probe the configured endpoint without connecting.
    TestConnection,
    /// Print a freshly generated API key.
    GenerateApiKey,
    /// Send a single chat message and print the reply.
    Chat { message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(endpoint) = args.endpoint {
        settings.mcp_endpoint = endpoint;
    }
    if let Some(api_key) = args.api_key {
        settings.api_key = api_key;
    }
    if args.no_auto_connect {
        settings.auto_connect = false;
    }

    let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_interactive(settings, scheduler).await,
        Command::Connect => {
            let mut host = Host::new(
                settings,
                scheduler,
                Arc::new(StatusBarObserver::default()),
            );
            host.handle(commands::HostCommand::Connect).await?;
            let outcome = host
                .wait_for_connect()
                .await
                .context("connect task did not complete")?;
            host.handle(commands::HostCommand::Status).await?;
            outcome.context("MCP connection failed")
        }
        Command::TestConnection => {
            let report = probe(&settings.connection_config(), scheduler.as_ref())
                .await
                .context("connection test failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::GenerateApiKey => {
            println!("{}", generate_local_api_key());
            Ok(())
        }
        Command::Chat { message } => {
            let mut session = ChatSession::new();
            let reply = session.send(&message)?;
            println!("{}", reply.text);
            Ok(())
        }
    }
}

async fn run_interactive(
    settings: settings::Settings,
    scheduler: Arc<dyn Scheduler>,
) -> Result<()> {
    info!(endpoint = %settings.mcp_endpoint, "PowerAutomation host started");

    let observer = Arc::new(StatusBarObserver::default());
    let mut host = Host::new(settings, scheduler, observer);
    host.handle(commands::HostCommand::Status).await?;
    host.start_auto_connect();
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                warn!(%err, "ignoring input");
                continue;
            }
        };
        if host.handle(command).await? == Flow::Quit {
            break;
        }
    }

    host.shutdown();
    info!("PowerAutomation host stopped");
    Ok(())
}
