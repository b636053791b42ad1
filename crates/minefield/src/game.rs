//! Game session
//!
//! Couples a [`Board`] with an [`ActionBatcher`] so that every mutation stages
//! a redraw of the squares it touched. Several mutations of the same square
//! within one tick collapse into a single redraw, and after each flush the
//! rendered board is recorded for undo.

use crate::board::{Board, Face, Outcome};
use crate::history::History;
use crate::square::{ClickMode, Mark, Square, SquareId};
use crate::Result;
use batcher::{ActionBatcher, BatchOutcome};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// Listener key for post-render bookkeeping
const RENDER_LISTENER: &str = "on-render";

/// Presentation side of a game
pub trait SquareSink: Send + Sync {
    /// Redraw one square
    fn render_square(&self, id: SquareId, square: &Square);

    /// Called once after each batch of square redraws
    fn board_rendered(&self, _board: &Board) {}
}

/// New game parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSettings {
    pub rows: usize,
    pub cols: usize,
    /// Probability of each square holding a mine (0.0 - 1.0)
    pub mine_rate: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            mine_rate: 0.12,
        }
    }
}

/// A running game
pub struct Game {
    board: Arc<Mutex<Board>>,
    history: Arc<Mutex<History>>,
    batcher: ActionBatcher,
    sink: Arc<dyn SquareSink>,
    mode: ClickMode,
}

impl Game {
    /// Start a session on an existing board and stage a full redraw
    pub fn new(board: Board, batcher: ActionBatcher, sink: Arc<dyn SquareSink>, undo_depth: usize) -> Self {
        let game = Self {
            board: Arc::new(Mutex::new(board)),
            history: Arc::new(Mutex::new(History::new(undo_depth))),
            batcher,
            sink,
            mode: ClickMode::default(),
        };

        game.install_render_listener();
        game.render_all();
        game
    }

    /// Generate a board from `settings` and start a session on it
    pub fn generate<R: Rng>(
        settings: GameSettings,
        rng: &mut R,
        batcher: ActionBatcher,
        sink: Arc<dyn SquareSink>,
        undo_depth: usize,
    ) -> Result<Self> {
        let board = Board::generate(settings.rows, settings.cols, settings.mine_rate, rng)?;
        Ok(Self::new(board, batcher, sink, undo_depth))
    }

    fn install_render_listener(&self) {
        let board = Arc::clone(&self.board);
        let history = Arc::clone(&self.history);
        let sink = Arc::clone(&self.sink);

        self.batcher.add_listener(RENDER_LISTENER, move || {
            let snapshot = board.lock().clone();
            history.lock().record(&snapshot);
            sink.board_rendered(&snapshot);
        });
    }

    /// Replace the board with a freshly generated one
    pub fn new_game<R: Rng>(&self, settings: GameSettings, rng: &mut R) -> Result<()> {
        let board = Board::generate(settings.rows, settings.cols, settings.mine_rate, rng)?;
        info!("New {}x{} game with {} mines", settings.rows, settings.cols, board.mine_count());

        *self.board.lock() = board;
        self.history.lock().reset();
        self.batcher.clear("new game");
        self.render_all();
        Ok(())
    }

    /// Apply the current click mode to a square
    pub fn activate(&self, id: SquareId) -> Result<Vec<SquareId>> {
        self.mark(id, self.mode.mark())
    }

    pub fn dig(&self, id: SquareId) -> Result<Vec<SquareId>> {
        self.mark(id, Mark::Dig)
    }

    pub fn flag(&self, id: SquareId) -> Result<Vec<SquareId>> {
        self.mark(id, Mark::Flag)
    }

    pub fn mark_unknown(&self, id: SquareId) -> Result<Vec<SquareId>> {
        self.mark(id, Mark::Unknown)
    }

    fn mark(&self, id: SquareId, mark: Mark) -> Result<Vec<SquareId>> {
        let changed = self.board.lock().toggle_mark(id, mark)?;
        Ok(self.stage_changes(changed))
    }

    /// Dig around every unmarked neighbour of `id`
    pub fn chord(&self, id: SquareId) -> Result<Vec<SquareId>> {
        let changed = self.board.lock().chord(id)?;
        Ok(self.stage_changes(changed))
    }

    /// Dig the whole board
    pub fn reveal_all(&self) -> Vec<SquareId> {
        let changed = self.board.lock().reveal_all();
        self.stage_changes(changed)
    }

    /// Restore the board from before the last render
    ///
    /// Returns false when there is nothing to undo.
    pub fn undo(&self) -> bool {
        let Some(previous) = self.history.lock().undo() else {
            debug!("Nothing to undo");
            return false;
        };

        *self.board.lock() = previous;
        self.batcher.clear("undo");
        self.render_all();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.lock().can_undo()
    }

    pub fn mode(&self) -> ClickMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ClickMode) {
        self.mode = mode;
    }

    /// Advance to the next click mode
    pub fn cycle_mode(&mut self) -> ClickMode {
        self.mode = self.mode.cycle();
        self.mode
    }

    pub fn outcome(&self) -> Outcome {
        self.board.lock().outcome()
    }

    pub fn face(&self, focus: Option<SquareId>) -> Face {
        self.board.lock().face(focus)
    }

    /// Copy of the current board
    pub fn board(&self) -> Board {
        self.board.lock().clone()
    }

    pub fn batcher(&self) -> &ActionBatcher {
        &self.batcher
    }

    /// Wait until pending redraws have flushed (or been discarded)
    pub async fn settled(&self) -> BatchOutcome {
        self.batcher.completion().await
    }

    /// Stage a redraw of every square
    pub fn render_all(&self) {
        let ids: Vec<_> = self.board.lock().ids().collect();
        for id in ids {
            self.stage_render(id);
        }
        self.batcher.run_pending();
    }

    fn stage_changes(&self, changed: Vec<SquareId>) -> Vec<SquareId> {
        for &id in &changed {
            self.stage_render(id);
        }
        self.batcher.run_pending();
        changed
    }

    fn stage_render(&self, id: SquareId) {
        let board = Arc::clone(&self.board);
        let sink = Arc::clone(&self.sink);

        self.batcher.stage(id.render_key(), move || {
            let square = board.lock().square(id).ok().copied();
            if let Some(square) = square {
                sink.render_square(id, &square);
            }
        });
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.batcher.remove_listener(RENDER_LISTENER);
    }
}
