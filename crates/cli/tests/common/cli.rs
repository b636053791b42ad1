//! CLI command execution helpers
//!
//! Runs the `mines` binary against a config file inside a temp directory,
//! feeding stdin and capturing output with colour codes stripped.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// CLI command builder
pub struct MinesCommand {
    config_path: PathBuf,
    args: Vec<String>,
    stdin_data: Option<String>,
}

impl MinesCommand {
    /// Create a command that reads `config.toml` from `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join("config.toml"),
            args: Vec::new(),
            stdin_data: None,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Provide stdin data
    pub fn stdin(&mut self, data: &str) -> &mut Self {
        self.stdin_data = Some(data.to_string());
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut child = Command::new(env!("CARGO_BIN_EXE_mines"))
            .arg("--config")
            .arg(&self.config_path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn command")?;

        // Dropping stdin closes it, ending the play loop
        if let Some(mut stdin) = child.stdin.take() {
            if let Some(data) = &self.stdin_data {
                stdin.write_all(data.as_bytes())?;
            }
        }

        let output = child.wait_with_output().context("Failed to wait for command")?;

        Ok(CommandResult {
            stdout: strip_ansi(&String::from_utf8_lossy(&output.stdout)),
            stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Number of board prints in the output
    pub fn frames(&self) -> usize {
        self.stdout.lines().filter(|line| line.contains("redrawn)")).count()
    }
}

/// Remove ANSI escape sequences (`ESC [ ... letter`)
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// mines!(dir, "config", "get", "game.rows").assert_success()?;
/// mines!(dir, "play", "--seed", "7").stdin("dig 0 0\n").assert_success()?;
/// ```
#[macro_export]
macro_rules! mines {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::MinesCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[36m42\u{1b}[39m"), "42");
        assert_eq!(strip_ansi("seed \u{1b}[1mbold\u{1b}[0m!"), "seed bold!");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn test_frames() {
        let result = CommandResult {
            stdout: "board\n(100 squares redrawn)\n> board\n(1 square redrawn)\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration: Duration::from_millis(10),
        };
        assert_eq!(result.frames(), 2);
    }
}
