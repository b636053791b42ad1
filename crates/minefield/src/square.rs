//! Square data

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a square on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SquareId {
    pub row: usize,
    pub col: usize,
}

impl SquareId {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Key used when staging this square's redraw
    pub fn render_key(&self) -> String {
        format!("square-{}", self)
    }
}

impl fmt::Display for SquareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

/// What lies under a square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contents {
    Mine,
    /// Number of adjacent mines
    Clear(u8),
}

/// Player mark on a square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    Dig,
    Flag,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub contents: Contents,
    pub mark: Option<Mark>,
}

impl Square {
    pub(crate) fn clear() -> Self {
        Self {
            contents: Contents::Clear(0),
            mark: None,
        }
    }

    pub fn is_mine(&self) -> bool {
        self.contents == Contents::Mine
    }

    pub fn is_dug(&self) -> bool {
        self.mark == Some(Mark::Dig)
    }

    pub fn is_flagged(&self) -> bool {
        self.mark == Some(Mark::Flag)
    }
}

/// What activating a square does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClickMode {
    #[default]
    Dig,
    Flag,
    Unknown,
}

impl ClickMode {
    /// Next mode in dig → flag → unknown order
    pub fn cycle(self) -> Self {
        match self {
            ClickMode::Dig => ClickMode::Flag,
            ClickMode::Flag => ClickMode::Unknown,
            ClickMode::Unknown => ClickMode::Dig,
        }
    }

    pub fn mark(self) -> Mark {
        match self {
            ClickMode::Dig => Mark::Dig,
            ClickMode::Flag => Mark::Flag,
            ClickMode::Unknown => Mark::Unknown,
        }
    }
}

impl fmt::Display for ClickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClickMode::Dig => "dig",
            ClickMode::Flag => "flag",
            ClickMode::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
