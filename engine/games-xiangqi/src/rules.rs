//! Per-piece movement rules.
//!
//! These only check the geometry and obstruction of a move. Bounds, side to
//! move and same-color targets are checked by `Board::is_legal_move`.

use crate::{Board, Piece, PieceKind, Position};

pub(crate) fn piece_can_reach(board: &Board, piece: &Piece, to: Position) -> bool {
    let from = piece.position;
    let dx = to.x as i8 - from.x as i8;
    let dy = to.y as i8 - from.y as i8;

    match piece.kind {
        PieceKind::General => {
            dx.abs() + dy.abs() == 1 && piece.color.palace_contains(to)
        }
        PieceKind::Advisor => {
            dx.abs() == 1 && dy.abs() == 1 && piece.color.palace_contains(to)
        }
        PieceKind::Elephant => {
            if dx.abs() != 2 || dy.abs() != 2 || !piece.color.owns_row(to.y) {
                return false;
            }
            // Blocked "elephant eye"
            from.offset(dx / 2, dy / 2)
                .is_some_and(|eye| board.is_empty_at(eye))
        }
        PieceKind::Horse => {
            let leg = match (dx.abs(), dy.abs()) {
                (1, 2) => from.offset(0, dy / 2),
                (2, 1) => from.offset(dx / 2, 0),
                _ => return false,
            };
            leg.is_some_and(|leg| board.is_empty_at(leg))
        }
        PieceKind::Chariot => pieces_between(board, from, to) == Some(0),
        PieceKind::Cannon => {
            let Some(screens) = pieces_between(board, from, to) else {
                return false;
            };
            if board.is_empty_at(to) {
                screens == 0
            } else {
                screens == 1
            }
        }
        PieceKind::Soldier => {
            let forward = piece.color.forward();
            if dx == 0 && dy == forward {
                return true;
            }
            let crossed_river = !piece.color.owns_row(from.y);
            crossed_river && dy == 0 && dx.abs() == 1
        }
    }
}

/// Number of occupied cells strictly between two positions on one line.
///
/// `None` when the positions are equal or not on the same row or column.
fn pieces_between(board: &Board, from: Position, to: Position) -> Option<usize> {
    if from == to || (from.x != to.x && from.y != to.y) {
        return None;
    }
    let step_x = (to.x as i8 - from.x as i8).signum();
    let step_y = (to.y as i8 - from.y as i8).signum();

    let mut count = 0;
    let mut cursor = from.offset(step_x, step_y)?;
    while cursor != to {
        if !board.is_empty_at(cursor) {
            count += 1;
        }
        cursor = cursor.offset(step_x, step_y)?;
    }
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pieces_between_counts_only_strict_interior() {
        let board = Board::new();
        // Column 1 from the red cannon up to the black horse: one black cannon in between
        assert_eq!(
            pieces_between(&board, Position::new(1, 7), Position::new(1, 0)),
            Some(1)
        );
        // Row 9 between the two red chariots: seven pieces
        assert_eq!(
            pieces_between(&board, Position::new(0, 9), Position::new(8, 9)),
            Some(7)
        );
    }

    #[test]
    fn test_pieces_between_rejects_non_lines() {
        let board = Board::new();
        assert_eq!(
            pieces_between(&board, Position::new(0, 0), Position::new(1, 1)),
            None
        );
        assert_eq!(
            pieces_between(&board, Position::new(4, 4), Position::new(4, 4)),
            None
        );
    }
}
