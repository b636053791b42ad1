//! Minesweeper game model
//!
//! This crate provides:
//! - Board generation with per-square mine probability
//! - Digging with first-dig armour and flood-fill reveal
//! - Flag / unknown marking, chording and win/loss detection
//! - A `Game` session that routes square redraws through an `ActionBatcher`
//! - Bounded undo history

pub mod board;
pub mod error;
pub mod game;
pub mod history;
pub mod square;

// Re-exports
pub use board::{Board, Face, Outcome};
pub use error::GameError;
pub use game::{Game, GameSettings, SquareSink};
pub use history::History;
pub use square::{ClickMode, Contents, Mark, Square, SquareId};

/// Result type for game operations
pub type Result<T> = std::result::Result<T, GameError>;
