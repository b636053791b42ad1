//! Undo history
//!
//! Snapshots are taken after each render. The stack holds the boards that
//! were on screen before the current one, so undo steps back one render.

use crate::Board;
use std::collections::VecDeque;

/// Depth used by the original game ("last state" only)
pub const DEFAULT_UNDO_DEPTH: usize = 1;

/// Bounded stack of previously rendered boards
#[derive(Debug, Clone)]
pub struct History {
    /// Board as of the latest render
    current: Option<Board>,
    /// Earlier renders, most recent at the back
    previous: VecDeque<Board>,
    depth: usize,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            current: None,
            previous: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Record the board after a render
    ///
    /// Renders that did not change the board are ignored.
    pub fn record(&mut self, board: &Board) {
        if self.current.as_ref() == Some(board) {
            return;
        }

        if let Some(last) = self.current.replace(board.clone()) {
            self.previous.push_back(last);
            while self.previous.len() > self.depth {
                self.previous.pop_front();
            }
        }
    }

    /// Step back one render
    pub fn undo(&mut self) -> Option<Board> {
        let board = self.previous.pop_back()?;
        self.current = Some(board.clone());
        Some(board)
    }

    pub fn can_undo(&self) -> bool {
        !self.previous.is_empty()
    }

    /// Forget everything (new game)
    pub fn reset(&mut self) {
        self.current = None;
        self.previous.clear();
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}
