//! Xiangqi (Chinese chess) board and rules engine
//!
//! Xiangqi is played on a 9-column, 10-row grid of intersections. Each side
//! starts with 16 pieces and wins by capturing the opposing General.
//!
//! # Board Layout
//!
//! Positions are `(x, y)` with `x` the column and `y` the row. Black's back
//! rank is row 0, Red's is row 9; the river runs between rows 4 and 5.
//! ```text
//! y=0  C H E A G A E H C   <- Black
//! y=1  . . . . . . . . .
//! y=2  . N . . . . . N .
//! y=3  S . S . S . S . S
//! y=4  . . . . . . . . .   ~~ river ~~
//! y=5  . . . . . . . . .
//! y=6  S . S . S . S . S
//! y=7  . N . . . . . N .
//! y=8  . . . . . . . . .
//! y=9  C H E A G A E H C   <- Red
//!      x=0 1 2 3 4 5 6 7 8
//! ```
//!
//! # Usage
//!
//! ```rust
//! use games_xiangqi::{Board, Color, Position};
//!
//! let mut board = Board::new();
//! let from = Position::new(1, 9);
//! let to = Position::new(2, 7);
//! assert!(board.is_legal_move(from, to));
//!
//! let record = board.apply_move(from, to).unwrap();
//! assert_eq!(record.sequence_number, 1);
//! assert_eq!(board.current_player(), Color::Black);
//! ```

mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Board dimensions
pub const COLS: usize = 9;
pub const ROWS: usize = 10;

/// Stable identifier of a piece for the lifetime of a board.
pub type PieceId = u8;

/// Back rank order from column 0 to column 8 (identical for both sides).
const BACK_RANK: [PieceKind; COLS] = [
    PieceKind::Chariot,
    PieceKind::Horse,
    PieceKind::Elephant,
    PieceKind::Advisor,
    PieceKind::General,
    PieceKind::Advisor,
    PieceKind::Elephant,
    PieceKind::Horse,
    PieceKind::Chariot,
];

const CANNON_COLUMNS: [u8; 2] = [1, 7];
const SOLDIER_COLUMNS: [u8; 5] = [0, 2, 4, 6, 8];

/// Side to move. Red always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }

    /// Row delta of a forward step for this side.
    pub fn forward(self) -> i8 {
        match self {
            Color::Red => -1,
            Color::Black => 1,
        }
    }

    /// True if `y` lies on this side's half of the river.
    pub fn owns_row(self, y: u8) -> bool {
        match self {
            Color::Red => y >= 5,
            Color::Black => y <= 4,
        }
    }

    /// True if `pos` lies inside this side's palace.
    pub fn palace_contains(self, pos: Position) -> bool {
        let rows = match self {
            Color::Red => 7..=9,
            Color::Black => 0..=2,
        };
        (3..=5).contains(&pos.x) && rows.contains(&pos.y)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    General,
    Advisor,
    Elephant,
    Horse,
    Chariot,
    Cannon,
    Soldier,
}

impl PieceKind {
    /// Single-letter symbol used by the ASCII rendering.
    pub fn symbol(self) -> char {
        match self {
            PieceKind::General => 'G',
            PieceKind::Advisor => 'A',
            PieceKind::Elephant => 'E',
            PieceKind::Horse => 'H',
            PieceKind::Chariot => 'R',
            PieceKind::Cannon => 'C',
            PieceKind::Soldier => 'S',
        }
    }
}

/// A board intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn is_on_board(self) -> bool {
        (self.x as usize) < COLS && (self.y as usize) < ROWS
    }

    /// Offset this position, returning `None` when the result leaves the board.
    pub fn offset(self, dx: i8, dy: i8) -> Option<Self> {
        let x = self.x as i16 + dx as i16;
        let y = self.y as i16 + dy as i16;
        if (0..COLS as i16).contains(&x) && (0..ROWS as i16).contains(&y) {
            Some(Self::new(x as u8, y as u8))
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub id: PieceId,
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub color: Color,
    pub position: Position,
    pub has_moved: bool,
}

/// Transport view of an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceDescriptor {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub color: Color,
}

impl From<&Piece> for PieceDescriptor {
    fn from(piece: &Piece) -> Self {
        Self {
            kind: piece.kind,
            color: piece.color,
        }
    }
}

/// One applied move. `moved_piece` is the piece as it stood before moving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub moved_piece: Piece,
    pub captured_piece: Option<Piece>,
    pub sequence_number: u32,
}

/// Terminal-state report. No draw detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub finished: bool,
    pub winner: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XiangqiError {
    #[error("illegal move from {from} to {to}")]
    IllegalMove { from: Position, to: Position },
}

/// A Xiangqi board: piece grid, side to move and the move log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Indexed `[y][x]`
    cells: [[Option<Piece>; COLS]; ROWS],
    current_player: Color,
    moves: Vec<Move>,
    next_piece_id: PieceId,
}

impl Board {
    /// Create a board in the standard opening position, Red to move.
    pub fn new() -> Self {
        let mut board = Self::empty(Color::Red);
        for (color, back, cannons, soldiers) in [(Color::Black, 0, 2, 3), (Color::Red, 9, 7, 6)] {
            for (x, kind) in BACK_RANK.iter().enumerate() {
                board.place(*kind, color, Position::new(x as u8, back));
            }
            for x in CANNON_COLUMNS {
                board.place(PieceKind::Cannon, color, Position::new(x, cannons));
            }
            for x in SOLDIER_COLUMNS {
                board.place(PieceKind::Soldier, color, Position::new(x, soldiers));
            }
        }
        board
    }

    /// Create a board with no pieces and the given side to move.
    pub fn empty(current_player: Color) -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
            current_player,
            moves: Vec::new(),
            next_piece_id: 0,
        }
    }

    /// Put a new piece on `pos`, replacing whatever stood there.
    ///
    /// Used to compose positions; returns the new piece's id.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is off the board.
    pub fn place(&mut self, kind: PieceKind, color: Color, pos: Position) -> PieceId {
        assert!(pos.is_on_board(), "position {pos} is off the board");
        let id = self.next_piece_id;
        self.next_piece_id = self.next_piece_id.wrapping_add(1);
        self.cells[pos.y as usize][pos.x as usize] = Some(Piece {
            id,
            kind,
            color,
            position: pos,
            has_moved: false,
        });
        id
    }

    pub fn current_player(&self) -> Color {
        self.current_player
    }

    /// Piece standing on `pos`, if any. Off-board positions are empty.
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        if !pos.is_on_board() {
            return None;
        }
        self.cells[pos.y as usize][pos.x as usize].as_ref()
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.piece_at(pos).is_none()
    }

    /// All pieces on the board, row by row.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.cells.iter().flatten().flatten()
    }

    /// The move log in play order.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    /// Grid of `{type, color}` descriptors, `[y][x]`.
    pub fn cells(&self) -> Vec<Vec<Option<PieceDescriptor>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_ref().map(PieceDescriptor::from)).collect())
            .collect()
    }

    /// Whether the side to move may play `from -> to`.
    pub fn is_legal_move(&self, from: Position, to: Position) -> bool {
        if !to.is_on_board() {
            return false;
        }
        let Some(piece) = self.piece_at(from) else {
            return false;
        };
        if piece.color != self.current_player {
            return false;
        }
        if let Some(target) = self.piece_at(to) {
            if target.color == piece.color {
                return false;
            }
        }
        rules::piece_can_reach(self, piece, to)
    }

    /// Apply a legal move, flip the side to move and return the logged record.
    ///
    /// The board is left untouched when the move is illegal.
    pub fn apply_move(&mut self, from: Position, to: Position) -> Result<Move, XiangqiError> {
        if !self.is_legal_move(from, to) {
            return Err(XiangqiError::IllegalMove { from, to });
        }

        let moved_piece = self.cells[from.y as usize][from.x as usize]
            .take()
            .ok_or(XiangqiError::IllegalMove { from, to })?;
        let captured_piece = self.cells[to.y as usize][to.x as usize].take();

        self.cells[to.y as usize][to.x as usize] = Some(Piece {
            position: to,
            has_moved: true,
            ..moved_piece
        });

        let record = Move {
            from,
            to,
            moved_piece,
            captured_piece,
            sequence_number: self.moves.len() as u32 + 1,
        };
        self.moves.push(record.clone());
        self.current_player = self.current_player.opponent();

        Ok(record)
    }

    /// Every legal destination for the piece on `pos`.
    ///
    /// Empty when `pos` holds no piece or a piece of the side not to move.
    pub fn possible_moves(&self, pos: Position) -> Vec<Position> {
        if self.piece_at(pos).map(|p| p.color) != Some(self.current_player) {
            return Vec::new();
        }
        all_positions()
            .filter(|&to| self.is_legal_move(pos, to))
            .collect()
    }

    /// Every legal `(from, to)` pair for the side to move.
    pub fn all_legal_moves(&self) -> Vec<(Position, Position)> {
        self.pieces()
            .filter(|p| p.color == self.current_player)
            .flat_map(|p| {
                let from = p.position;
                self.possible_moves(from).into_iter().map(move |to| (from, to))
            })
            .collect()
    }

    /// The game is finished once either General is gone.
    pub fn terminal(&self) -> Terminal {
        let has_general = |color: Color| {
            self.pieces()
                .any(|p| p.kind == PieceKind::General && p.color == color)
        };
        match (has_general(Color::Red), has_general(Color::Black)) {
            (true, true) => Terminal {
                finished: false,
                winner: None,
            },
            (true, false) => Terminal {
                finished: true,
                winner: Some(Color::Red),
            },
            (false, true) => Terminal {
                finished: true,
                winner: Some(Color::Black),
            },
            (false, false) => Terminal {
                finished: true,
                winner: None,
            },
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    /// Red pieces upper-case, Black lower-case, empty cells as dots.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row
                .iter()
                .map(|cell| match cell {
                    Some(p) if p.color == Color::Red => p.kind.symbol(),
                    Some(p) => p.kind.symbol().to_ascii_lowercase(),
                    None => '.',
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn all_positions() -> impl Iterator<Item = Position> {
    (0..ROWS as u8).flat_map(|y| (0..COLS as u8).map(move |x| Position::new(x, y)))
}
