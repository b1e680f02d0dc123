//! A single Reversi game: one board plus its lifecycle flags.
//!
//! The game does not track whose turn it is. Callers supply the mover's
//! color with every move and the game trusts it; only structural legality
//! (occupied cell, nothing captured, off the board) is enforced here.

use crate::board::{Board, Color, IllegalMove};
use serde::{Deserialize, Serialize};

/// Lifecycle of a game. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Finished,
}

/// Final result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Color),
    Draw,
}

impl Outcome {
    /// The winning color, `None` for a draw.
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::Winner(color) => Some(color),
            Outcome::Draw => None,
        }
    }
}

/// Stone counts for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub black: usize,
    pub white: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Game {
    board: Board,
    started: bool,
    finished: bool,
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        if self.finished {
            GameStatus::Finished
        } else if self.started {
            GameStatus::InProgress
        } else {
            GameStatus::NotStarted
        }
    }

    /// Marks the game as in progress once both sides are present.
    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Applies a move for `color` and reports whether the game is now over.
    ///
    /// Moves on a finished game succeed without touching the board. A
    /// rejected move leaves the game unchanged.
    pub fn apply_move(&mut self, x: i32, y: i32, color: Color) -> Result<bool, IllegalMove> {
        if self.finished {
            return Ok(true);
        }
        self.board.place(x, y, color)?;
        if self.is_over() {
            self.finished = true;
        }
        Ok(self.finished)
    }

    /// True when neither side has a legal move left.
    pub fn is_over(&self) -> bool {
        self.board.available_move_count(Color::Black) == 0
            && self.board.available_move_count(Color::White) == 0
    }

    pub fn score(&self) -> Score {
        Score {
            black: self.board.score(Color::Black),
            white: self.board.score(Color::White),
        }
    }

    pub fn winner(&self) -> Outcome {
        let Score { black, white } = self.score();
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => Outcome::Winner(Color::Black),
            std::cmp::Ordering::Less => Outcome::Winner(Color::White),
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }
}
