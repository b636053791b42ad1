//! Input parsing for the play loop

use anyhow::{bail, Context, Result};
use minefield::SquareId;

/// One line of player input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayCommand {
    /// Apply the current click mode (`r c`)
    Activate(SquareId),
    Dig(SquareId),
    Flag(SquareId),
    Unknown(SquareId),
    /// Dig every unmarked neighbour
    Chord(SquareId),
    /// Cycle the click mode
    Mode,
    Undo,
    Reveal,
    New,
    /// Redraw the whole board
    Show,
    /// Dump the batch log, optionally for one batcher
    Log(Option<String>),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  r c            apply the current mode to row r, column c
  dig r c        dig a square
  flag r c       toggle a flag
  unknown r c    toggle an unknown mark
  chord r c      dig all unmarked squares around a square
  mode           cycle dig / flag / unknown mode
  undo           step back one move
  reveal         reveal the whole board
  new            start a new game
  show           redraw the board
  log [name]     print the batch log
  help           show this help
  quit           leave the game";

/// Parse a line of input; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<PlayCommand>> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match first.to_ascii_lowercase().as_str() {
        "d" | "dig" => PlayCommand::Dig(parse_square(&rest)?),
        "f" | "flag" => PlayCommand::Flag(parse_square(&rest)?),
        "u" | "unknown" => PlayCommand::Unknown(parse_square(&rest)?),
        "c" | "chord" => PlayCommand::Chord(parse_square(&rest)?),
        "m" | "mode" => no_args(PlayCommand::Mode, &rest)?,
        "undo" => no_args(PlayCommand::Undo, &rest)?,
        "reveal" => no_args(PlayCommand::Reveal, &rest)?,
        "new" => no_args(PlayCommand::New, &rest)?,
        "show" => no_args(PlayCommand::Show, &rest)?,
        "log" => match rest.as_slice() {
            [] => PlayCommand::Log(None),
            [name] => PlayCommand::Log(Some(name.to_string())),
            _ => bail!("Usage: log [name]"),
        },
        "h" | "help" | "?" => PlayCommand::Help,
        "q" | "quit" | "exit" => PlayCommand::Quit,
        _ if first.chars().all(|c| c.is_ascii_digit()) => {
            let mut coords = vec![first];
            coords.extend(rest);
            PlayCommand::Activate(parse_square(&coords)?)
        }
        other => bail!("Unknown command: {}. Type 'help' for a list.", other),
    };

    Ok(Some(command))
}

fn parse_square(args: &[&str]) -> Result<SquareId> {
    let [row, col] = args else {
        bail!("Expected a row and a column");
    };
    let row = row.parse().with_context(|| format!("Invalid row: {}", row))?;
    let col = col.parse().with_context(|| format!("Invalid column: {}", col))?;
    Ok(SquareId::new(row, col))
}

fn no_args(command: PlayCommand, args: &[&str]) -> Result<PlayCommand> {
    if !args.is_empty() {
        bail!("{:?} takes no arguments", command);
    }
    Ok(command)
}
