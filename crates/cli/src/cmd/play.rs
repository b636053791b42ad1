//! Interactive game loop
//!
//! Reads commands from stdin, applies them to the game, then waits for the
//! staged redraws to flush before prompting again.

use crate::render::{self, TerminalSink};
use crate::system_config::SystemConfig;
use crate::util::{self, PlayCommand};
use anyhow::{Context, Result};
use batcher::ActionBatcher;
use minefield::{Game, Outcome, SquareId};
use owo_colors::OwoColorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config: &SystemConfig,
    rows: Option<usize>,
    cols: Option<usize>,
    mine_rate: Option<u32>,
    seed: Option<u64>,
) -> Result<()> {
    let mut overrides = config.clone();
    if let Some(rows) = rows {
        overrides.game.rows = rows;
    }
    if let Some(cols) = cols {
        overrides.game.cols = cols;
    }
    if let Some(rate) = mine_rate {
        overrides.game.mine_rate_percent = rate;
    }
    overrides.validate().context("Invalid game options")?;
    let settings = overrides.game_settings();

    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let log = overrides.batch_log();
    let batcher = ActionBatcher::new(overrides.batcher_config("MineSquare"), log.clone());
    let sink = Arc::new(TerminalSink::new());
    let mut game = Game::generate(settings, &mut rng, batcher, sink, overrides.game.undo_depth)
        .context("Failed to create game")?;

    println!(
        "{} {}x{} board, seed {}",
        "Minefield".bold(),
        settings.rows,
        settings.cols,
        seed.to_string().cyan()
    );
    println!("{}", "Type 'help' for commands.".dimmed());
    game.settled().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_outcome = game.outcome();
    let mut focus: Option<SquareId> = None;

    loop {
        print!("{} [{}] > ", render::face(game.face(focus)), game.mode());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        let command = match util::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                continue;
            }
        };

        let result = match command {
            PlayCommand::Activate(id) => {
                focus = Some(id);
                game.activate(id).map(drop)
            }
            PlayCommand::Dig(id) => {
                focus = Some(id);
                game.dig(id).map(drop)
            }
            PlayCommand::Flag(id) => {
                focus = Some(id);
                game.flag(id).map(drop)
            }
            PlayCommand::Unknown(id) => {
                focus = Some(id);
                game.mark_unknown(id).map(drop)
            }
            PlayCommand::Chord(id) => {
                focus = Some(id);
                game.chord(id).map(drop)
            }
            PlayCommand::Mode => {
                println!("Mode: {}", game.cycle_mode().cyan());
                Ok(())
            }
            PlayCommand::Undo => {
                if !game.undo() {
                    println!("{}", "Nothing to undo".yellow());
                }
                Ok(())
            }
            PlayCommand::Reveal => {
                game.reveal_all();
                Ok(())
            }
            PlayCommand::New => {
                focus = None;
                game.new_game(settings, &mut rng)
            }
            PlayCommand::Show => {
                game.render_all();
                Ok(())
            }
            PlayCommand::Log(name) => {
                if log.is_empty() {
                    println!("{}", "(batch log is empty)".dimmed());
                } else {
                    log.write_log(&mut std::io::stdout().lock(), name.as_deref())?;
                }
                Ok(())
            }
            PlayCommand::Help => {
                println!("{}", util::HELP);
                Ok(())
            }
            PlayCommand::Quit => break,
        };

        if let Err(e) = result {
            println!("{} {}", "✗".red(), e);
        }

        game.settled().await;

        let outcome = game.outcome();
        if outcome != last_outcome {
            match outcome {
                Outcome::Won => println!("{}", "You cleared the field!".green().bold()),
                Outcome::Lost => println!("{}", "Boom! You hit a mine.".red().bold()),
                Outcome::Playing => {}
            }
            last_outcome = outcome;
        }
    }

    game.batcher().dispose();
    Ok(())
}
