mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::CliConfig;
use luckydraw_core::{open_file_store, DrawError, SessionController};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "luckydraw")]
#[command(about = "Weighted prize draw for live events")]
#[command(version)]
struct Cli {
    /// Data directory for the local cache
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Shared directory every replica reads and writes
    #[arg(short, long, global = true)]
    remote_dir: Option<PathBuf>,

    /// Session settings file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prize management commands
    #[command(subcommand)]
    Prize(commands::PrizeCommands),

    /// Draw one or more prizes
    Draw {
        /// Number of draws
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        times: u32,
    },

    /// Show the current result and remaining stock
    Status,

    /// Show past draws
    History {
        /// Only show the most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Follow state changes from every replica
    Watch,

    /// Restock every prize and clear the history
    Reset {
        #[arg(short, long)]
        yes: bool,
    },

    /// Replace the pool with the default prizes
    RestoreDefaults {
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all prizes and history
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "luckydraw={},luckydraw_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli_config = CliConfig::new(cli.data_dir, cli.remote_dir, cli.config);
    let session_config = cli_config
        .session_config()
        .context("Failed to load session settings")?;

    tokio::fs::create_dir_all(cli_config.data_dir())
        .await
        .with_context(|| format!("Failed to create {}", cli_config.data_dir().display()))?;

    let store = open_file_store(cli_config.data_dir(), cli_config.remote_dir(), &session_config)
        .await
        .context("Failed to open lottery storage")?;
    let controller = SessionController::start(store, &session_config).await?;

    // Execute command
    let result = match cli.command {
        Commands::Prize(cmd) => commands::handle_prize_command(cmd, &controller).await,
        Commands::Draw { times } => commands::handle_draw(times, &controller).await,
        Commands::Status => commands::handle_status(&controller),
        Commands::History { limit } => commands::handle_history(limit, &controller),
        Commands::Watch => commands::handle_watch(&controller).await,
        Commands::Reset { yes } => commands::handle_reset(yes, &controller).await,
        Commands::RestoreDefaults { yes } => {
            commands::handle_restore_defaults(yes, &controller).await
        }
        Commands::Clear { yes } => commands::handle_clear(yes, &controller).await,
    };

    if let Err(e) = controller.shutdown().await {
        tracing::warn!("Session did not shut down cleanly: {}", e);
    }

    if let Err(e) = result {
        match e {
            DrawError::NotFound { id } => {
                eprintln!("Error: Prize '{}' not found", id);
                eprintln!("Use 'luckydraw prize list' to see prize IDs");
            }
            DrawError::Validation(reason) => {
                eprintln!("Error: {}", reason);
            }
            DrawError::Depleted { name, .. } => {
                eprintln!("Error: '{}' is out of stock", name);
            }
            DrawError::Persistence(msg) => {
                eprintln!("Error: The change was applied locally but not saved remotely");
                eprintln!("{}", msg);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
