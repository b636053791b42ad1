//! Configuration management command
//!
//! Provides CLI interface to view and edit the config file.

use crate::system_config::{self, SystemConfig};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub fn run_list(config_path: &Path, config: &SystemConfig) -> Result<()> {
    println!("{}", "Minefield Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[batcher]".yellow());
    println!(
        "  {} = {} {}",
        "interval_ms".cyan(),
        config.batcher.interval_ms,
        if config.batcher.interval_ms == 0 {
            "(next tick)".dimmed().to_string()
        } else {
            format!("({}ms)", config.batcher.interval_ms).dimmed().to_string()
        }
    );
    println!("  {} = {}", "require_lull".cyan(), config.batcher.require_lull);
    println!("  {} = {}", "log_capacity".cyan(), config.batcher.log_capacity);
    println!("  {} = {}", "console_logging".cyan(), config.batcher.console_logging);

    println!("\n{}", "[game]".yellow());
    println!("  {} = {}", "rows".cyan(), config.game.rows);
    println!("  {} = {}", "cols".cyan(), config.game.cols);
    println!(
        "  {} = {} {}",
        "mine_rate_percent".cyan(),
        config.game.mine_rate_percent,
        format!("({}%)", config.game.mine_rate_percent).dimmed()
    );
    println!("  {} = {}", "undo_depth".cyan(), config.game.undo_depth);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  interval_ms: 0-60,000 (0 = next tick)");
    println!("  log_capacity: 1-10,000");
    println!("  rows, cols: 1-100");
    println!("  mine_rate_percent: 0-100");
    println!("  undo_depth: 1-100");

    Ok(())
}

/// Get a single configuration value
pub fn run_get(config: &SystemConfig, key: &str) -> Result<()> {
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value
pub fn run_set(config_path: &Path, mut config: SystemConfig, key: &str, value: &str) -> Result<()> {
    config.set(key, value)?;
    system_config::save_to(config_path, &config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Show the config file path and optionally create it
pub fn run_path(config_path: &Path, create: bool) -> Result<()> {
    if create && system_config::init_if_missing(config_path)? {
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}
