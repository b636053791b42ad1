//! Minefield CLI - mines command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod render;
mod system_config;
mod util;

/// Minefield - Minesweeper in your terminal
#[derive(Parser)]
#[command(name = "mines")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/mines/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game
    Play {
        /// Number of rows (default: from config)
        #[arg(long)]
        rows: Option<usize>,
        /// Number of columns (default: from config)
        #[arg(long)]
        cols: Option<usize>,
        /// Percentage of squares holding mines (default: from config)
        #[arg(long)]
        mine_rate: Option<u32>,
        /// Seed for board generation (default: random)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a sample batch and print the batch log
    Log {
        /// Batcher name used in the log
        #[arg(long, default_value = "demo")]
        name: String,
    },
    /// View or edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one value
    Get {
        /// Key such as game.rows
        key: String,
    },
    /// Set one value
    Set {
        /// Key such as game.rows
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path {
        /// Write a default config file if none exists
        #[arg(long)]
        create: bool,
    },
    /// Print an example config file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = system_config::resolve_path(cli.config.as_deref())?;
    let config = system_config::load_from(&config_path)?;

    // Initialize tracing
    let level = match cli.verbose {
        0 if config.batcher.console_logging => tracing::Level::INFO,
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Play { rows, cols, mine_rate, seed } => {
            cmd::play::run(&config, rows, cols, mine_rate, seed).await
        }
        Commands::Log { name } => cmd::log::run(&config, &name).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(&config_path, &config),
            ConfigCommands::Get { key } => cmd::config::run_get(&config, &key),
            ConfigCommands::Set { key, value } => cmd::config::run_set(&config_path, config, &key, &value),
            ConfigCommands::Path { create } => cmd::config::run_path(&config_path, create),
            ConfigCommands::Example => cmd::config::run_example(),
        },
    }
}
