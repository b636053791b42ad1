//! Game errors

use crate::SquareId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("Invalid board dimensions {rows}x{cols}: need at least one row and column and a size that fits in memory")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Mine rate must be between 0 and 1 (got {0})")]
    InvalidMineRate(f64),

    #[error("Square {id} is outside the {rows}x{cols} board")]
    OutOfBounds { id: SquareId, rows: usize, cols: usize },
}
