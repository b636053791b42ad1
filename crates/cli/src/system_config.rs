//! System configuration
//!
//! Loaded from `<config dir>/mines/config.toml` unless `--config` points
//! elsewhere. A missing file means defaults.

use anyhow::{bail, Context, Result};
use batcher::{BatchLog, BatcherConfig, DEFAULT_LOG_CAPACITY};
use minefield::GameSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub batcher: BatcherSection,
    pub game: GameSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherSection {
    /// Flush delay in milliseconds (0 = next tick)
    pub interval_ms: u64,
    /// Restart the delay on every run
    pub require_lull: bool,
    /// Number of batch log entries kept
    pub log_capacity: usize,
    /// Mirror batch log entries to stderr
    pub console_logging: bool,
}

impl Default for BatcherSection {
    fn default() -> Self {
        Self {
            interval_ms: 0,
            require_lull: true,
            log_capacity: DEFAULT_LOG_CAPACITY,
            console_logging: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSection {
    pub rows: usize,
    pub cols: usize,
    pub mine_rate_percent: u32,
    pub undo_depth: usize,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            mine_rate_percent: 12,
            undo_depth: minefield::history::DEFAULT_UNDO_DEPTH,
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        let game = &self.game;
        if !(1..=100).contains(&game.rows) {
            bail!("game.rows must be between 1 and 100 (got {})", game.rows);
        }
        if !(1..=100).contains(&game.cols) {
            bail!("game.cols must be between 1 and 100 (got {})", game.cols);
        }
        if game.mine_rate_percent > 100 {
            bail!("game.mine_rate_percent must be between 0 and 100 (got {})", game.mine_rate_percent);
        }
        if !(1..=100).contains(&game.undo_depth) {
            bail!("game.undo_depth must be between 1 and 100 (got {})", game.undo_depth);
        }

        let batcher = &self.batcher;
        if batcher.interval_ms > 60_000 {
            bail!("batcher.interval_ms must be at most 60000 (got {})", batcher.interval_ms);
        }
        if !(1..=10_000).contains(&batcher.log_capacity) {
            bail!("batcher.log_capacity must be between 1 and 10000 (got {})", batcher.log_capacity);
        }
        Ok(())
    }

    pub fn batcher_config(&self, name: &str) -> BatcherConfig {
        BatcherConfig::new(name)
            .with_interval_ms(self.batcher.interval_ms)
            .with_require_lull(self.batcher.require_lull)
    }

    pub fn batch_log(&self) -> BatchLog {
        BatchLog::new(self.batcher.log_capacity).with_console_logging(self.batcher.console_logging)
    }

    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            rows: self.game.rows,
            cols: self.game.cols,
            mine_rate: f64::from(self.game.mine_rate_percent) / 100.0,
        }
    }

    /// Read a value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "batcher.interval_ms" => self.batcher.interval_ms.to_string(),
            "batcher.require_lull" => self.batcher.require_lull.to_string(),
            "batcher.log_capacity" => self.batcher.log_capacity.to_string(),
            "batcher.console_logging" => self.batcher.console_logging.to_string(),
            "game.rows" => self.game.rows.to_string(),
            "game.cols" => self.game.cols.to_string(),
            "game.mine_rate_percent" => self.game.mine_rate_percent.to_string(),
            "game.undo_depth" => self.game.undo_depth.to_string(),
            _ => bail!("Unknown config key: {}. Use 'mines config list' to see available keys.", key),
        };
        Ok(value)
    }

    /// Set a value by dotted key, then validate
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        const UINT: &str = "Invalid value: must be a non-negative integer";
        const BOOL: &str = "Invalid value: must be 'true' or 'false'";

        match key {
            "batcher.interval_ms" => self.batcher.interval_ms = value.parse().context(UINT)?,
            "batcher.require_lull" => self.batcher.require_lull = value.parse().context(BOOL)?,
            "batcher.log_capacity" => self.batcher.log_capacity = value.parse().context(UINT)?,
            "batcher.console_logging" => self.batcher.console_logging = value.parse().context(BOOL)?,
            "game.rows" => self.game.rows = value.parse().context(UINT)?,
            "game.cols" => self.game.cols = value.parse().context(UINT)?,
            "game.mine_rate_percent" => self.game.mine_rate_percent = value.parse().context(UINT)?,
            "game.undo_depth" => self.game.undo_depth = value.parse().context(UINT)?,
            _ => bail!("Unknown config key: {}. Use 'mines config list' to see available keys.", key),
        }

        self.validate().context("Invalid configuration value")
    }
}

/// Default config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mines").join("config.toml"))
}

/// Explicit path if given, otherwise the default location
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => config_file_path().context("Could not determine config file path"),
    }
}

/// Parse the config file without validating ranges
///
/// Commands that use the values call [`SystemConfig::validate`] themselves, so
/// `mines config set` can still repair an out-of-range file.
pub fn load_from(path: &Path) -> Result<SystemConfig> {
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn save_to(path: &Path, config: &SystemConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Write a default config file unless one exists
///
/// Returns true when a file was created.
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_to(path, &SystemConfig::default())?;
    Ok(true)
}

pub fn example_config() -> String {
    r#"# Minefield configuration

[batcher]
# Delay before staged redraws flush, in milliseconds (0 = next tick)
interval_ms = 0
# Restart the delay on every run instead of flushing at a fixed rate
require_lull = true
# Batch log entries kept for `mines log` and the in-game `log` command
log_capacity = 50
# Mirror batch log entries to stderr
console_logging = false

[game]
rows = 10
cols = 10
# Chance of each square holding a mine
mine_rate_percent = 12
# Number of renders `undo` can step back
undo_depth = 1
"#
    .to_string()
}
