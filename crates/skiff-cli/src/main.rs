//! Skiff CLI - LLM-driven browser agent behind a web chat UI
//!
//! Usage:
//!   skiff serve                 Run the chat server
//!   skiff init-config           Write a default skiff.toml
//!
//! The API key is read from the environment variable named in the config
//! (`OPENAI_API_KEY` by default), never from the config file itself.

use anyhow::Result;
use clap::{Parser, Subcommand};
use skiff_core::SkiffConfig;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(author, version, about = "LLM-driven browser agent with a web chat UI")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing skiff.toml (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat server (the default when no subcommand is given)
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured bind port
        #[arg(long)]
        port: Option<u16>,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Write a default skiff.toml to the config directory
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        headed: false,
    }) {
        Commands::InitConfig => {
            SkiffConfig::write_default(&cli.config_dir)?;
            info!(
                "Wrote default configuration to {}",
                cli.config_dir.join(skiff_core::config::CONFIG_FILE).display()
            );
        }

        Commands::Serve { host, port, headed } => {
            let mut config = SkiffConfig::load_or_default(&cli.config_dir)?;

            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if headed {
                config.browser.headless = false;
            }

            info!(
                "Starting Skiff (model: {}, browser headless: {})",
                config.model.model, config.browser.headless
            );
            skiff_server::serve(config).await?;
        }
    }

    Ok(())
}
