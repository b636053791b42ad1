//! Minefield board and game rules

use crate::error::GameError;
use crate::square::{Contents, Mark, Square, SquareId};
use crate::Result;
use rand::Rng;

/// Offsets of the eight surrounding squares
const SURROUNDING: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// State of play derived from the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    /// Every mine flagged and nothing else flagged
    Won,
    /// A mine was dug
    Lost,
}

/// Avatar face shown next to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Smile,
    Think,
    Dead,
    Sunglasses,
}

/// A rectangular minefield (row-major)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    squares: Vec<Square>,
    /// The first dig of a game defuses mines around it
    armored: bool,
}

impl Board {
    /// Generate a board where each square is a mine with probability `mine_rate`
    pub fn generate<R: Rng>(rows: usize, cols: usize, mine_rate: f64, rng: &mut R) -> Result<Self> {
        if !(0.0..=1.0).contains(&mine_rate) {
            return Err(GameError::InvalidMineRate(mine_rate));
        }
        let mut board = Self::empty(rows, cols)?;

        for square in board.squares.iter_mut() {
            if rng.gen_bool(mine_rate) {
                square.contents = Contents::Mine;
            }
        }
        board.recount();

        tracing::debug!(
            "Generated {}x{} board with {} mines (rate {:.2})",
            rows,
            cols,
            board.mine_count(),
            mine_rate
        );
        Ok(board)
    }

    /// Build a board with mines at exactly the given squares
    pub fn from_mines(rows: usize, cols: usize, mines: &[SquareId]) -> Result<Self> {
        let mut board = Self::empty(rows, cols)?;
        for &id in mines {
            let idx = board.index(id)?;
            board.squares[idx].contents = Contents::Mine;
        }
        board.recount();
        Ok(board)
    }

    fn empty(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .filter(|&len| len > 0)
            .filter(|&len| len.checked_mul(std::mem::size_of::<Square>()).is_some_and(|bytes| bytes <= isize::MAX as usize))
            .ok_or(GameError::InvalidDimensions { rows, cols })?;

        Ok(Self {
            rows,
            cols,
            squares: vec![Square::clear(); len],
            armored: true,
        })
    }

    /// Recompute every clear square's neighbour count
    fn recount(&mut self) {
        for id in self.ids().collect::<Vec<_>>() {
            if self.squares[self.idx(id)].is_mine() {
                continue;
            }
            let count = self.adjacent_mines(id);
            let idx = self.idx(id);
            self.squares[idx].contents = Contents::Clear(count);
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the next dig still defuses surrounding mines
    pub fn is_armored(&self) -> bool {
        self.armored
    }

    pub fn square(&self, id: SquareId) -> Result<&Square> {
        Ok(&self.squares[self.index(id)?])
    }

    /// All square ids in row-major order
    pub fn ids(&self) -> impl Iterator<Item = SquareId> {
        let cols = self.cols;
        (0..self.rows * self.cols).map(move |i| SquareId::new(i / cols, i % cols))
    }

    /// Squares with their ids in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (SquareId, &Square)> {
        self.ids().zip(self.squares.iter())
    }

    pub fn mine_count(&self) -> usize {
        self.squares.iter().filter(|s| s.is_mine()).count()
    }

    pub fn flag_count(&self) -> usize {
        self.squares.iter().filter(|s| s.is_flagged()).count()
    }

    pub fn dug_count(&self) -> usize {
        self.squares.iter().filter(|s| s.is_dug()).count()
    }

    /// Dig a square, flood-filling through squares with no adjacent mines
    ///
    /// Returns every square whose state changed.
    pub fn dig(&mut self, id: SquareId) -> Result<Vec<SquareId>> {
        self.index(id)?;
        let mut changed = Vec::new();

        if self.armored {
            let area: Vec<_> = std::iter::once(id).chain(self.neighbors(id)).collect();
            for target in area {
                changed.extend(self.defuse(target));
            }
            self.armored = false;
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let idx = self.idx(current);
            if self.squares[idx].is_dug() {
                continue;
            }
            self.squares[idx].mark = Some(Mark::Dig);
            changed.push(current);

            if self.squares[idx].contents == Contents::Clear(0) {
                pending.extend(self.neighbors(current));
            }
        }

        Ok(changed)
    }

    /// Turn a mine into a clear square and fix up the counts around it
    fn defuse(&mut self, id: SquareId) -> Vec<SquareId> {
        let idx = self.idx(id);
        if !self.squares[idx].is_mine() {
            return Vec::new();
        }

        let count = self.adjacent_mines(id);
        self.squares[idx].contents = Contents::Clear(count);
        let mut changed = vec![id];
        for neighbor in self.neighbors(id).collect::<Vec<_>>() {
            let n = self.idx(neighbor);
            if let Contents::Clear(count) = self.squares[n].contents {
                if count > 0 {
                    self.squares[n].contents = Contents::Clear(count - 1);
                    changed.push(neighbor);
                }
            }
        }

        tracing::debug!("Defused mine at {}", id);
        changed
    }

    /// Apply a mark; repeating a flag/unknown mark removes it
    ///
    /// `Mark::Dig` digs the square. Dug squares ignore other marks.
    pub fn toggle_mark(&mut self, id: SquareId, mark: Mark) -> Result<Vec<SquareId>> {
        if mark == Mark::Dig {
            return self.dig(id);
        }

        let idx = self.index(id)?;
        let square = &mut self.squares[idx];
        if square.is_dug() {
            return Ok(Vec::new());
        }

        square.mark = if square.mark == Some(mark) { None } else { Some(mark) };
        Ok(vec![id])
    }

    /// Dig every unmarked square around `id`
    pub fn chord(&mut self, id: SquareId) -> Result<Vec<SquareId>> {
        self.index(id)?;
        let mut changed = Vec::new();
        for neighbor in self.neighbors(id).collect::<Vec<_>>() {
            if self.squares[self.idx(neighbor)].mark.is_none() {
                changed.extend(self.dig(neighbor)?);
            }
        }
        Ok(changed)
    }

    /// Dig every square
    pub fn reveal_all(&mut self) -> Vec<SquareId> {
        for square in self.squares.iter_mut() {
            square.mark = Some(Mark::Dig);
        }
        self.ids().collect()
    }

    pub fn outcome(&self) -> Outcome {
        let mut won = true;
        for square in &self.squares {
            if square.is_mine() && square.is_dug() {
                return Outcome::Lost;
            }
            if square.is_mine() != square.is_flagged() {
                won = false;
            }
        }

        if won {
            Outcome::Won
        } else {
            Outcome::Playing
        }
    }

    /// Face for the current state, given the focused square
    pub fn face(&self, focus: Option<SquareId>) -> Face {
        match self.outcome() {
            Outcome::Won => Face::Sunglasses,
            Outcome::Lost => Face::Dead,
            Outcome::Playing => match focus.and_then(|id| self.square(id).ok()) {
                Some(square) if !square.is_dug() && !square.is_flagged() => Face::Think,
                _ => Face::Smile,
            },
        }
    }

    fn neighbors(&self, id: SquareId) -> impl Iterator<Item = SquareId> + '_ {
        SURROUNDING.iter().filter_map(move |&(dr, dc)| {
            let row = id.row.checked_add_signed(dr)?;
            let col = id.col.checked_add_signed(dc)?;
            (row < self.rows && col < self.cols).then_some(SquareId::new(row, col))
        })
    }

    fn adjacent_mines(&self, id: SquareId) -> u8 {
        self.neighbors(id)
            .filter(|&n| self.squares[self.idx(n)].is_mine())
            .count() as u8
    }

    fn index(&self, id: SquareId) -> Result<usize> {
        if id.row >= self.rows || id.col >= self.cols {
            return Err(GameError::OutOfBounds {
                id,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(self.idx(id))
    }

    /// Unchecked index for ids already known to be on the board
    fn idx(&self, id: SquareId) -> usize {
        id.row * self.cols + id.col
    }
}
