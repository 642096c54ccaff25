//! OmniServe Console - Interactive Support Operator Shell
//!
//! Line-oriented front end over `console-core`: browse and search
//! conversations, resolve or escalate them, chat as a customer against the
//! configured AI agent, and feed the agent's knowledge base.
//!
//! # Usage
//!
//! ```bash
//! # Start with demo data and defaults
//! omniserve-console
//!
//! # Point at a different agent
//! omniserve-console --agent-endpoint http://agents.internal/run --agent-id support
//!
//! # Start empty, importing conversations from a JSON file
//! omniserve-console --no-demo --seed ./conversations.json
//!
//! # Verbose logging
//! RUST_LOG=debug omniserve-console
//! ```
//!
//! Type `help` at the prompt for the command list. Logs go to stderr so they
//! never interleave with command output.

mod commands;
mod console;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use console_core::seed::{demo_conversations, demo_indexed_pages, load_seed_file};
use console_core::{
    load_config_from_path, ConfigOverrides, ConsoleConfig, ControllerConfig,
    ConversationRegistry, HttpAgentAdapter, HttpIngestor, KnowledgeBase, RegistryError,
    RegistryEvent, SessionController, TimeoutAdapter,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::commands::{Command, CommandError};
use crate::console::{Console, DynAdapter, DynIngestor, Flow};

/// OmniServe Console - support operator shell
#[derive(Parser, Debug)]
#[command(name = "omniserve-console")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "OMNISERVE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Agent endpoint URL (overrides config)
    #[arg(long, value_name = "URL")]
    agent_endpoint: Option<String>,

    /// Agent identifier (overrides config)
    #[arg(long, value_name = "ID")]
    agent_id: Option<String>,

    /// Start without demo conversations and pages
    #[arg(long)]
    no_demo: bool,

    /// Import conversations from a JSON seed file
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "OMNISERVE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "omniserve_console={level},console_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file, then apply command line overrides
fn resolve_config(args: &Args) -> Result<ConsoleConfig> {
    let mut config = load_config_from_path(args.config.clone())
        .context("Failed to load console configuration")?;
    ConfigOverrides {
        agent_endpoint: args.agent_endpoint.clone(),
        agent_id: args.agent_id.clone(),
        no_demo: args.no_demo,
    }
    .apply(&mut config)
    .context("Invalid command line override")?;
    Ok(config)
}

/// Registry with demo data and any imported seed conversations
fn build_registry(config: &ConsoleConfig, seed: Option<&PathBuf>) -> Result<ConversationRegistry> {
    let registry = if config.seed_demo_data {
        ConversationRegistry::with_conversations(demo_conversations(Utc::now()))
    } else {
        ConversationRegistry::new()
    };

    if let Some(path) = seed {
        let imported = load_seed_file(path)
            .with_context(|| format!("Failed to import seed file: {}", path.display()))?;
        let count = imported.len();
        for conversation in imported {
            match registry.insert(conversation) {
                Ok(()) => {}
                Err(RegistryError::DuplicateConversation(id)) => {
                    warn!(conversation_id = %id, "Skipping seed conversation already present");
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(count, path = %path.display(), "Seed conversations imported");
    }

    Ok(registry)
}

/// Agent adapter, wrapped in a deadline when one is configured
fn build_adapter(config: &ConsoleConfig) -> DynAdapter {
    let http = HttpAgentAdapter::new(config.agent_endpoint.as_str());
    match config.agent_timeout() {
        Some(timeout) => Arc::new(TimeoutAdapter::new(http, timeout)),
        None => Arc::new(http),
    }
}

/// Log registry changes as they are published
fn spawn_event_logger(registry: &ConversationRegistry) {
    let mut events = registry.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                RegistryEvent::StatusChanged { .. } | RegistryEvent::Cleared => {
                    info!(?event, "Registry changed");
                }
                _ => debug!(?event, "Registry changed"),
            }
        }
    });
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("OmniServe console starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args)?;
    if let Some(ref path) = config.config_file_path {
        info!(config_path = ?path, "Config file");
    }
    info!(
        agent_endpoint = %config.agent_endpoint,
        source = ?config.source(),
        "Agent endpoint"
    );

    let registry = Arc::new(build_registry(&config, args.seed.as_ref())?);
    spawn_event_logger(&registry);

    let controller = SessionController::new(
        Arc::clone(&registry),
        build_adapter(&config),
        ControllerConfig {
            agent_id: config.agent_id.clone(),
        },
    );

    let ingestor: DynIngestor = Arc::new(HttpIngestor::new(config.knowledge_endpoint.as_str()));
    let mut knowledge = KnowledgeBase::new(ingestor, config.knowledge_base_id.as_str());
    if config.seed_demo_data {
        knowledge = knowledge.with_pages(demo_indexed_pages(Utc::now()));
    }

    let mut console = Console::new(config, controller, knowledge);
    println!("{} conversations loaded. Type 'help' for commands.", registry.len());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt().await?;
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match console.execute(command).await {
            Flow::Continue(output) => print!("{output}"),
            Flow::Quit => break,
        }
    }

    info!("OmniServe console stopped");
    Ok(())
}
