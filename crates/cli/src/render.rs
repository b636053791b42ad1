//! Terminal rendering for the game board

use minefield::{Board, Contents, Face, Mark, Square, SquareId, SquareSink};
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prints the board once per flushed batch
#[derive(Debug, Default)]
pub struct TerminalSink {
    /// Squares redrawn since the last board print
    pending: AtomicUsize,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SquareSink for TerminalSink {
    fn render_square(&self, _id: SquareId, _square: &Square) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    fn board_rendered(&self, board: &Board) {
        let redrawn = self.pending.swap(0, Ordering::Relaxed);

        println!();
        print!("{}", draw_board(board));
        println!(
            "{}",
            format!("({} square{} redrawn)", redrawn, if redrawn == 1 { "" } else { "s" }).dimmed()
        );
    }
}

/// Plain glyph for a square
pub fn symbol(square: &Square) -> char {
    match (square.mark, square.contents) {
        (Some(Mark::Dig), Contents::Mine) => '*',
        (Some(Mark::Dig), Contents::Clear(0)) => ' ',
        (Some(Mark::Dig), Contents::Clear(n)) => char::from_digit(u32::from(n), 10).unwrap_or('#'),
        (Some(Mark::Flag), _) => 'F',
        (Some(Mark::Unknown), _) => '?',
        (None, _) => '.',
    }
}

fn colored(square: &Square) -> String {
    let glyph = symbol(square);
    let styled = match (square.mark, square.contents) {
        (Some(Mark::Dig), Contents::Mine) => glyph.red().bold().to_string(),
        (Some(Mark::Dig), Contents::Clear(1)) => glyph.blue().to_string(),
        (Some(Mark::Dig), Contents::Clear(2)) => glyph.green().to_string(),
        (Some(Mark::Dig), Contents::Clear(3)) => glyph.red().to_string(),
        (Some(Mark::Dig), Contents::Clear(_)) => glyph.magenta().to_string(),
        (Some(Mark::Flag), _) => glyph.yellow().bold().to_string(),
        (Some(Mark::Unknown), _) => glyph.cyan().to_string(),
        (None, _) => glyph.dimmed().to_string(),
    };
    styled
}

/// Board as text with row and column indices
pub fn draw_board(board: &Board) -> String {
    let mut out = String::from("    ");
    for col in 0..board.cols() {
        out.push_str(&format!("{:>3}", col).dimmed().to_string());
    }
    out.push('\n');

    for row in 0..board.rows() {
        out.push_str(&format!("{:>3} ", row).dimmed().to_string());
        for col in 0..board.cols() {
            match board.square(SquareId::new(row, col)) {
                Ok(square) => out.push_str(&format!("  {}", colored(square))),
                Err(_) => out.push_str("   "),
            }
        }
        out.push('\n');
    }
    out
}

pub fn face(face: Face) -> &'static str {
    match face {
        Face::Smile => "🙂",
        Face::Think => "🤔",
        Face::Dead => "😵",
        Face::Sunglasses => "😎",
    }
}
