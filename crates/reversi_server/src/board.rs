//! Reversi rules engine.
//!
//! The board is stored as a `GRID_SIZE x GRID_SIZE` grid whose outer ring is
//! permanently [`Cell::Border`]. A directional scan walks while it sees
//! opponent stones, and a border cell is never an opponent stone, so every
//! walk stops inside the grid without its own bounds checks. Coordinates
//! handed in from outside are validated against the interior before any
//! grid access.
//!
//! Cells are addressed as `cells[x][y]` with `x` the column and `y` the row,
//! both 1-based over the playable interior.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Width and height of the playable interior.
pub const BOARD_SIZE: usize = 8;

/// Width and height of the stored grid, including the border ring.
pub const GRID_SIZE: usize = BOARD_SIZE + 2;

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One of the two competing sides. Black is the host's side and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "black"),
            Color::White => write!(f, "white"),
        }
    }
}

/// Content of a single grid cell.
///
/// `Border` only ever appears on the outer ring and can never be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Empty,
    Black,
    White,
    Border,
}

impl Cell {
    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Black => '○',
            Cell::White => '◉',
            Cell::Border => '#',
        }
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }
}

/// Reasons a stone cannot be placed.
///
/// A rejected placement never mutates the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("({x}, {y}) is outside the {size}x{size} board", size = BOARD_SIZE)]
    OutOfBounds { x: i32, y: i32 },
    #[error("({x}, {y}) is already occupied")]
    Occupied { x: i32, y: i32 },
    #[error("a stone at ({x}, {y}) would not flip anything")]
    NoCapture { x: i32, y: i32 },
}

/// Result of a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Opponent stones turned over by the move.
    pub flipped: usize,
}

/// An 8x8 Reversi board surrounded by a sentinel border.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates the standard opening position: two stones per side crossed
    /// in the center.
    pub fn new() -> Self {
        let mut board = Self::empty();
        let low = BOARD_SIZE / 2;
        let high = low + 1;
        board.cells[low][low] = Cell::White;
        board.cells[high][high] = Cell::White;
        board.cells[high][low] = Cell::Black;
        board.cells[low][high] = Cell::Black;
        board
    }

    /// A board with the border ring in place and an empty interior.
    fn empty() -> Self {
        let mut cells = [[Cell::Empty; GRID_SIZE]; GRID_SIZE];
        for i in 0..GRID_SIZE {
            cells[0][i] = Cell::Border;
            cells[GRID_SIZE - 1][i] = Cell::Border;
            cells[i][0] = Cell::Border;
            cells[i][GRID_SIZE - 1] = Cell::Border;
        }
        Self { cells }
    }

    /// Maps 1-based interior coordinates to grid indices.
    fn interior(x: i32, y: i32) -> Option<(usize, usize)> {
        let range = 1..=BOARD_SIZE as i32;
        (range.contains(&x) && range.contains(&y)).then(|| (x as usize, y as usize))
    }

    fn is_border_index(x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x == GRID_SIZE - 1 || y == GRID_SIZE - 1
    }

    /// Returns the cell at grid coordinates `0..GRID_SIZE`, border included.
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        let range = 0..GRID_SIZE as i32;
        if range.contains(&x) && range.contains(&y) {
            Some(self.cells[x as usize][y as usize])
        } else {
            None
        }
    }

    /// Length of the capturing run starting next to `(x, y)` in direction
    /// `(dx, dy)`, or zero when the run is not closed by a `color` stone.
    fn run_length(&self, x: usize, y: usize, color: Color, (dx, dy): (isize, isize)) -> usize {
        let opponent = Cell::from(color.opponent());
        let mut nx = x.wrapping_add_signed(dx);
        let mut ny = y.wrapping_add_signed(dy);
        let mut count = 0;

        while self.cells[nx][ny] == opponent {
            count += 1;
            nx = nx.wrapping_add_signed(dx);
            ny = ny.wrapping_add_signed(dy);
        }

        if count > 0 && self.cells[nx][ny] == Cell::from(color) {
            count
        } else {
            0
        }
    }

    fn can_place_at(&self, x: usize, y: usize, color: Color) -> bool {
        self.cells[x][y] == Cell::Empty
            && DIRECTIONS
                .iter()
                .any(|&direction| self.run_length(x, y, color, direction) > 0)
    }

    /// Whether `color` may legally place a stone at `(x, y)`.
    ///
    /// Out-of-range coordinates are never placeable.
    pub fn can_place(&self, x: i32, y: i32, color: Color) -> bool {
        Self::interior(x, y).is_some_and(|(x, y)| self.can_place_at(x, y, color))
    }

    /// Places a `color` stone at `(x, y)` and flips every captured run.
    pub fn place(&mut self, x: i32, y: i32, color: Color) -> Result<Placement, IllegalMove> {
        let (ix, iy) = Self::interior(x, y).ok_or(IllegalMove::OutOfBounds { x, y })?;
        if self.cells[ix][iy] != Cell::Empty {
            return Err(IllegalMove::Occupied { x, y });
        }

        let runs = DIRECTIONS.map(|direction| (direction, self.run_length(ix, iy, color, direction)));
        let flipped: usize = runs.iter().map(|&(_, length)| length).sum();
        if flipped == 0 {
            return Err(IllegalMove::NoCapture { x, y });
        }

        let stone = Cell::from(color);
        self.cells[ix][iy] = stone;
        for ((dx, dy), length) in runs {
            let mut nx = ix;
            let mut ny = iy;
            for _ in 0..length {
                nx = nx.wrapping_add_signed(dx);
                ny = ny.wrapping_add_signed(dy);
                self.cells[nx][ny] = stone;
            }
        }

        Ok(Placement { flipped })
    }

    fn interior_cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        (1..=BOARD_SIZE)
            .flat_map(|x| (1..=BOARD_SIZE).map(move |y| (x, y)))
            .map(|(x, y)| (x, y, self.cells[x][y]))
    }

    /// Number of interior cells where `color` has a legal move.
    pub fn available_move_count(&self, color: Color) -> usize {
        self.interior_cells()
            .filter(|&(x, y, _)| self.can_place_at(x, y, color))
            .count()
    }

    /// Number of interior stones of `color`.
    pub fn score(&self, color: Color) -> usize {
        let stone = Cell::from(color);
        self.interior_cells().filter(|&(_, _, cell)| cell == stone).count()
    }

    pub fn empty_count(&self) -> usize {
        self.interior_cells()
            .filter(|&(_, _, cell)| cell == Cell::Empty)
            .count()
    }

    /// Full grid copy for the wire, border included.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cells: self.cells.iter().map(|column| column.to_vec()).collect(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for column in (b'A'..).take(BOARD_SIZE) {
            write!(f, " {}", column as char)?;
        }
        writeln!(f)?;
        for y in 1..=BOARD_SIZE {
            write!(f, "{y:>2}")?;
            for x in 1..=BOARD_SIZE {
                write!(f, " {}", self.cells[x][y].symbol())?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "Score: BLACK={} WHITE={} REST={}",
            self.score(Color::Black),
            self.score(Color::White),
            self.empty_count()
        )
    }
}

/// Problems found when decoding a board snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("expected {expected} columns, got {actual}")]
    ColumnCount { expected: usize, actual: usize },
    #[error("column {column} has {actual} cells, expected {expected}")]
    ColumnLength {
        column: usize,
        expected: usize,
        actual: usize,
    },
    #[error("cell ({x}, {y}) must be a border cell")]
    MissingBorder { x: usize, y: usize },
    #[error("cell ({x}, {y}) is a border cell inside the playing area")]
    MisplacedBorder { x: usize, y: usize },
}

/// Wire form of a board: the full `GRID_SIZE x GRID_SIZE` grid, indexed
/// `[x][y]`.
///
/// Decoding rejects unknown cell values (through [`Cell`]'s deserializer)
/// and any grid that is not exactly `GRID_SIZE` square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct BoardSnapshot {
    cells: Vec<Vec<Cell>>,
}

impl BoardSnapshot {
    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        self.cells.get(x).and_then(|column| column.get(y)).copied()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for BoardSnapshot {
    type Error = SnapshotError;

    fn try_from(cells: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        if cells.len() != GRID_SIZE {
            return Err(SnapshotError::ColumnCount {
                expected: GRID_SIZE,
                actual: cells.len(),
            });
        }
        if let Some((column, cells)) = cells
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() != GRID_SIZE)
        {
            return Err(SnapshotError::ColumnLength {
                column,
                expected: GRID_SIZE,
                actual: cells.len(),
            });
        }
        Ok(Self { cells })
    }
}

impl From<BoardSnapshot> for Vec<Vec<Cell>> {
    fn from(snapshot: BoardSnapshot) -> Self {
        snapshot.cells
    }
}

impl TryFrom<&BoardSnapshot> for Board {
    type Error = SnapshotError;

    /// Rebuilds a board from a snapshot, checking that the border ring is
    /// intact and that no border cell sits in the interior.
    fn try_from(snapshot: &BoardSnapshot) -> Result<Self, Self::Error> {
        let mut board = Board::empty();
        for (x, column) in snapshot.cells.iter().enumerate() {
            for (y, &cell) in column.iter().enumerate() {
                match (Self::is_border_index(x, y), cell) {
                    (true, Cell::Border) | (false, Cell::Empty | Cell::Black | Cell::White) => {
                        board.cells[x][y] = cell;
                    }
                    (true, _) => return Err(SnapshotError::MissingBorder { x, y }),
                    (false, Cell::Border) => return Err(SnapshotError::MisplacedBorder { x, y }),
                }
            }
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(i32, i32, Color)]) -> Board {
        let mut board = Board::empty();
        for &(x, y, color) in stones {
            board.cells[x as usize][y as usize] = Cell::from(color);
        }
        board
    }

    fn border_ring(board: &Board) -> Vec<Cell> {
        (0..GRID_SIZE)
            .flat_map(|x| (0..GRID_SIZE).map(move |y| (x, y)))
            .filter(|&(x, y)| Board::is_border_index(x, y))
            .map(|(x, y)| board.cells[x][y])
            .collect()
    }

    /// Picks the first legal move for `color` in column-major order.
    fn first_move(board: &Board, color: Color) -> Option<(i32, i32)> {
        (1..=BOARD_SIZE as i32)
            .flat_map(|x| (1..=BOARD_SIZE as i32).map(move |y| (x, y)))
            .find(|&(x, y)| board.can_place(x, y, color))
    }

    #[test]
    fn test_opening_position() {
        let board = Board::new();
        assert_eq!(board.cell(4, 4), Some(Cell::White));
        assert_eq!(board.cell(5, 5), Some(Cell::White));
        assert_eq!(board.cell(5, 4), Some(Cell::Black));
        assert_eq!(board.cell(4, 5), Some(Cell::Black));
        assert_eq!(board.score(Color::Black), 2);
        assert_eq!(board.score(Color::White), 2);
        assert_eq!(board.empty_count(), BOARD_SIZE * BOARD_SIZE - 4);
        assert!(border_ring(&board).iter().all(|&cell| cell == Cell::Border));
    }

    #[test]
    fn test_opening_moves() {
        let board = Board::new();
        assert_eq!(board.available_move_count(Color::Black), 4);
        assert_eq!(board.available_move_count(Color::White), 4);
        for (x, y) in [(3, 4), (4, 3), (6, 5), (5, 6)] {
            assert!(board.can_place(x, y, Color::Black), "black should play ({x}, {y})");
        }
        assert!(!board.can_place(1, 1, Color::Black));
    }

    #[test]
    fn test_place_flips_single_run() {
        let mut board = Board::new();
        let placement = board.place(3, 4, Color::Black).unwrap();
        assert_eq!(placement.flipped, 1);
        assert_eq!(board.cell(4, 4), Some(Cell::Black));
        assert_eq!(board.score(Color::Black), 4);
        assert_eq!(board.score(Color::White), 1);
    }

    #[test]
    fn test_place_flips_run_of_two() {
        let mut board = board_with(&[
            (4, 4, Color::White),
            (5, 4, Color::White),
            (6, 4, Color::Black),
        ]);
        let black_before = board.score(Color::Black);

        let placement = board.place(3, 4, Color::Black).unwrap();

        assert_eq!(placement.flipped, 2);
        assert_eq!(board.score(Color::Black), black_before + 3);
        assert_eq!(board.score(Color::White), 0);
    }

    #[test]
    fn test_place_flips_multiple_directions() {
        // Black at (3, 3) closes a horizontal and a diagonal run at once.
        let mut board = board_with(&[
            (4, 3, Color::White),
            (5, 3, Color::Black),
            (4, 4, Color::White),
            (5, 5, Color::White),
            (6, 6, Color::Black),
            (3, 4, Color::White),
        ]);

        let placement = board.place(3, 3, Color::Black).unwrap();

        assert_eq!(placement.flipped, 3);
        assert_eq!(board.cell(4, 3), Some(Cell::Black));
        assert_eq!(board.cell(4, 4), Some(Cell::Black));
        assert_eq!(board.cell(5, 5), Some(Cell::Black));
        // Not closed by a black stone, so it stays white.
        assert_eq!(board.cell(3, 4), Some(Cell::White));
    }

    #[test]
    fn test_run_ending_at_border_or_gap_does_not_capture() {
        let board = board_with(&[(1, 2, Color::White), (1, 1, Color::White)]);
        // The run walks into the border without a black anchor.
        assert!(!board.can_place(1, 3, Color::Black));

        let board = board_with(&[(2, 2, Color::White), (4, 2, Color::Black)]);
        // Empty cell at (3, 2) breaks the run.
        assert!(!board.can_place(1, 2, Color::Black));
    }

    #[test]
    fn test_occupied_cell_is_rejected_without_change() {
        let mut board = Board::new();
        let before = board.clone();

        let result = board.place(4, 4, Color::Black);

        assert_eq!(result, Err(IllegalMove::Occupied { x: 4, y: 4 }));
        assert_eq!(board, before);
    }

    #[test]
    fn test_non_capturing_move_is_rejected_without_change() {
        let mut board = Board::new();
        let before = board.clone();

        assert_eq!(
            board.place(1, 1, Color::Black),
            Err(IllegalMove::NoCapture { x: 1, y: 1 })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_out_of_range_is_rejected_before_grid_access() {
        let mut board = Board::new();
        let before = board.clone();
        for (x, y) in [(0, 4), (9, 4), (4, 0), (4, 9), (-1, -1), (i32::MAX, 3)] {
            assert_eq!(board.place(x, y, Color::Black), Err(IllegalMove::OutOfBounds { x, y }));
            assert!(!board.can_place(x, y, Color::Black));
        }
        assert_eq!(board, before);
    }

    #[test]
    fn test_stone_accounting_and_border_over_full_game() {
        let mut board = Board::new();
        let border = border_ring(&board);
        let mut color = Color::Black;
        let mut passes = 0;

        while passes < 2 {
            let Some((x, y)) = first_move(&board, color) else {
                passes += 1;
                color = color.opponent();
                continue;
            };
            passes = 0;

            let mover_before = board.score(color);
            let opponent_before = board.score(color.opponent());
            let placement = board.place(x, y, color).unwrap();

            assert_eq!(board.score(color), mover_before + 1 + placement.flipped);
            assert_eq!(board.score(color.opponent()), opponent_before - placement.flipped);
            assert_eq!(
                board.score(color) + board.score(color.opponent()),
                mover_before + opponent_before + 1
            );
            assert_eq!(border_ring(&board), border);
            color = color.opponent();
        }

        assert_eq!(board.available_move_count(Color::Black), 0);
        assert_eq!(board.available_move_count(Color::White), 0);
        assert_eq!(
            board.score(Color::Black) + board.score(Color::White) + board.empty_count(),
            BOARD_SIZE * BOARD_SIZE
        );
    }

    #[test]
    fn test_one_sided_board_has_no_moves() {
        let board = board_with(&[(1, 1, Color::Black), (4, 4, Color::Black)]);
        assert_eq!(board.available_move_count(Color::Black), 0);
        assert_eq!(board.available_move_count(Color::White), 0);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = Board::new().snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json.as_array().unwrap().len(), GRID_SIZE);
        assert_eq!(json[0][0], "border");
        assert_eq!(json[4][4], "white");
        assert_eq!(json[5][4], "black");
        assert_eq!(json[1][1], "empty");

        let decoded: BoardSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(Board::try_from(&decoded).unwrap(), Board::new());
    }

    #[test]
    fn test_snapshot_rejects_unknown_cell() {
        let mut json = serde_json::to_value(Board::new().snapshot()).unwrap();
        json[3][3] = serde_json::json!("purple");
        assert!(serde_json::from_value::<BoardSnapshot>(json).is_err());
    }

    #[test]
    fn test_snapshot_rejects_ragged_grid() {
        let mut cells: Vec<Vec<Cell>> = Board::new().snapshot().into();
        cells[2].pop();
        assert_eq!(
            BoardSnapshot::try_from(cells),
            Err(SnapshotError::ColumnLength {
                column: 2,
                expected: GRID_SIZE,
                actual: GRID_SIZE - 1
            })
        );
        let json = serde_json::json!([["border"]]);
        assert!(serde_json::from_value::<BoardSnapshot>(json).is_err());
    }

    #[test]
    fn test_snapshot_to_board_checks_border() {
        let mut cells: Vec<Vec<Cell>> = Board::new().snapshot().into();
        cells[0][3] = Cell::Black;
        let snapshot = BoardSnapshot::try_from(cells).unwrap();
        assert_eq!(
            Board::try_from(&snapshot),
            Err(SnapshotError::MissingBorder { x: 0, y: 3 })
        );

        let mut cells: Vec<Vec<Cell>> = Board::new().snapshot().into();
        cells[2][2] = Cell::Border;
        let snapshot = BoardSnapshot::try_from(cells).unwrap();
        assert_eq!(
            Board::try_from(&snapshot),
            Err(SnapshotError::MisplacedBorder { x: 2, y: 2 })
        );
    }

    #[test]
    fn test_display_lists_rows_and_score() {
        let rendered = Board::new().to_string();
        assert!(rendered.starts_with("   A B C D E F G H"));
        assert_eq!(rendered.lines().count(), BOARD_SIZE + 2);
        assert!(rendered.ends_with("Score: BLACK=2 WHITE=2 REST=60"));
    }
}
