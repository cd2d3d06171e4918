//! Block geometry engine
//!
//! A falling block is a 3x3 local grid of cells anchored at an absolute
//! board coordinate. The local grid is an immutable value: every transform
//! returns a new grid, and trial moves copy the whole block, apply the
//! transform and test the copy, so the committed state is never aliased by
//! a speculative one.
//!
//! Landing decomposes a falling block into [`SettledPiece`]s, the one-cell
//! form the board tracks permanently.

use std::cmp::Ordering;

use arrayvec::ArrayVec;

use crate::core::Board;
use crate::types::{BoardPos, Cell, Piece, GRID_CENTER, GRID_DIM};

/// Immutable 3x3 grid of cells in block-local coordinates.
///
/// `(GRID_CENTER, GRID_CENTER)` is the anchor cell. Rotation and flip
/// return new shapes and preserve the multiset of non-empty markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    cells: [[Cell; GRID_DIM]; GRID_DIM],
}

impl Shape {
    /// Vertical two-piece layout: `lower` at the center cell, `upper` one
    /// row above it.
    pub fn pair(lower: Piece, upper: Piece) -> Self {
        let mut cells = [[None; GRID_DIM]; GRID_DIM];
        cells[GRID_CENTER][GRID_CENTER] = Some(lower);
        cells[GRID_CENTER - 1][GRID_CENTER] = Some(upper);
        Self { cells }
    }

    /// A single piece at the center cell.
    pub fn single(piece: Piece) -> Self {
        let mut cells = [[None; GRID_DIM]; GRID_DIM];
        cells[GRID_CENTER][GRID_CENTER] = Some(piece);
        Self { cells }
    }

    /// Cell at local coordinates.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    /// True when no cell holds a piece.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_none())
    }

    /// Iterate the non-empty cells as `(local_row, local_col, piece)` in
    /// row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (usize, usize, Piece)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cols)| {
            cols.iter()
                .enumerate()
                .filter_map(move |(col, &cell)| cell.map(|piece| (row, col, piece)))
        })
    }

    /// Quarter turn clockwise: `(r, c)` maps to `(c, DIM-1-r)`.
    pub fn rotated_cw(self) -> Self {
        let mut rotated = [[None; GRID_DIM]; GRID_DIM];
        for (row, col, piece) in self.pieces() {
            rotated[col][GRID_DIM - 1 - row] = Some(piece);
        }
        Self { cells: rotated }
    }

    /// Quarter turn counter-clockwise: `(r, c)` maps to `(DIM-1-c, r)`.
    pub fn rotated_ccw(self) -> Self {
        let mut rotated = [[None; GRID_DIM]; GRID_DIM];
        for (row, col, piece) in self.pieces() {
            rotated[GRID_DIM - 1 - col][row] = Some(piece);
        }
        Self { cells: rotated }
    }

    /// Swap the markers of consecutive non-empty cells in row-major order
    /// (1st with 2nd, 3rd with 4th, ...). Cell positions never change, so
    /// applying flip twice restores the original shape; an unpaired last
    /// piece stays put.
    pub fn flipped(self) -> Self {
        let mut flipped = self.cells;
        let mut pending: Option<(usize, usize)> = None;
        for row in 0..GRID_DIM {
            for col in 0..GRID_DIM {
                if flipped[row][col].is_none() {
                    continue;
                }
                match pending.take() {
                    None => pending = Some((row, col)),
                    Some((prev_row, prev_col)) => {
                        let tmp = flipped[prev_row][prev_col];
                        flipped[prev_row][prev_col] = flipped[row][col];
                        flipped[row][col] = tmp;
                    }
                }
            }
        }
        Self { cells: flipped }
    }
}

/// A falling block anchored at an absolute board coordinate.
///
/// Its cells may hold different markers, so it has no singular piece
/// accessor; landing decomposes it into [`SettledPiece`]s, which do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallingBlock {
    shape: Shape,
    row: i16,
    col: i16,
}

impl FallingBlock {
    /// Two-piece vertical block: `lower` at `(row, col)`, `upper` at
    /// `(row - 1, col)`.
    pub fn pair(lower: Piece, upper: Piece, row: i16, col: i16) -> Self {
        Self::from_parts(Shape::pair(lower, upper), row, col)
    }

    fn from_parts(shape: Shape, row: i16, col: i16) -> Self {
        assert!(!shape.is_empty(), "a block must hold at least one piece");
        Self { shape, row, col }
    }

    /// Board row of the anchor cell.
    pub fn center_row(&self) -> i16 {
        self.row
    }

    /// Board column of the anchor cell.
    pub fn center_col(&self) -> i16 {
        self.col
    }

    /// The block's local grid.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    fn to_board(&self, local_row: usize, local_col: usize) -> BoardPos {
        BoardPos::new(
            local_row as i16 + self.row - GRID_CENTER as i16,
            local_col as i16 + self.col - GRID_CENTER as i16,
        )
    }

    fn to_local(&self, row: i16, col: i16) -> Option<(usize, usize)> {
        let local_row = row - (self.row - GRID_CENTER as i16);
        let local_col = col - (self.col - GRID_CENTER as i16);
        if (0..GRID_DIM as i16).contains(&local_row) && (0..GRID_DIM as i16).contains(&local_col) {
            Some((local_row as usize, local_col as usize))
        } else {
            None
        }
    }

    /// Piece at an absolute board coordinate, `None` outside the current
    /// 3x3 footprint.
    pub fn piece_at(&self, row: i16, col: i16) -> Cell {
        self.to_local(row, col)
            .and_then(|(local_row, local_col)| self.shape.get(local_row, local_col))
    }

    /// True when an occupied cell of this block sits at the coordinate.
    pub fn has_piece_at(&self, row: i16, col: i16) -> bool {
        self.piece_at(row, col).is_some()
    }

    /// Iterate the occupied cells in absolute board coordinates.
    pub fn board_cells(&self) -> impl Iterator<Item = (BoardPos, Piece)> + '_ {
        self.shape
            .pieces()
            .map(|(row, col, piece)| (self.to_board(row, col), piece))
    }

    /// True when any occupied cell leaves the column range, reaches past
    /// the bottom row, or overlaps an occupied settled cell. Rows above the
    /// top of the board are allowed while the block falls in and are never
    /// tested against the settled grid.
    pub fn collides_with(&self, board: &Board) -> bool {
        self.board_cells().any(|(pos, _)| {
            pos.col < 0
                || pos.col >= board.columns()
                || pos.row >= board.rows()
                || (pos.row >= 0 && board.piece_at(pos.row, pos.col).is_some())
        })
    }

    /// Whether a one-row drop would keep the block clear of the board.
    /// Tests a copy; the receiver is untouched.
    pub fn can_move_down(&self, board: &Board) -> bool {
        let mut probe = *self;
        probe.move_down();
        !probe.collides_with(board)
    }

    /// Whether a one-column move left stays clear of the board.
    pub fn can_move_left(&self, board: &Board) -> bool {
        let mut probe = *self;
        probe.move_left();
        !probe.collides_with(board)
    }

    /// Whether a one-column move right stays clear of the board.
    pub fn can_move_right(&self, board: &Board) -> bool {
        let mut probe = *self;
        probe.move_right();
        !probe.collides_with(board)
    }

    /// Whether a clockwise quarter turn stays clear of the board.
    pub fn can_rotate_cw(&self, board: &Board) -> bool {
        let mut probe = *self;
        probe.rotate_cw();
        !probe.collides_with(board)
    }

    /// Whether a counter-clockwise quarter turn stays clear of the board.
    pub fn can_rotate_ccw(&self, board: &Board) -> bool {
        let mut probe = *self;
        probe.rotate_ccw();
        !probe.collides_with(board)
    }

    /// Drop the anchor one row.
    pub fn move_down(&mut self) {
        self.row += 1;
    }

    /// Shift the anchor one column left.
    pub fn move_left(&mut self) {
        self.col -= 1;
    }

    /// Shift the anchor one column right.
    pub fn move_right(&mut self) {
        self.col += 1;
    }

    /// Turn the local grid a quarter clockwise around the anchor.
    pub fn rotate_cw(&mut self) {
        self.shape = self.shape.rotated_cw();
    }

    /// Turn the local grid a quarter counter-clockwise around the anchor.
    pub fn rotate_ccw(&mut self) {
        self.shape = self.shape.rotated_ccw();
    }

    /// Swap the markers of the block's pieces in place. The footprint does
    /// not change, so a flip can never introduce a collision.
    pub fn flip(&mut self) {
        self.shape = self.shape.flipped();
    }

    /// One settled piece per occupied cell, each anchored at that cell's
    /// absolute board coordinate with its marker preserved. At most the 9
    /// cells of the local grid.
    pub fn break_to_pieces(&self) -> ArrayVec<SettledPiece, 9> {
        self.board_cells()
            .map(|(pos, piece)| SettledPiece::new(piece, pos))
            .collect()
    }
}

/// A single-cell piece merged into the settled grid after landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettledPiece {
    piece: Piece,
    pos: BoardPos,
}

impl SettledPiece {
    pub fn new(piece: Piece, pos: BoardPos) -> Self {
        Self { piece, pos }
    }

    /// The piece in this cell. Always defined, unlike a falling block's
    /// mixed-marker grid.
    pub fn piece(&self) -> Piece {
        self.piece
    }

    pub fn pos(&self) -> BoardPos {
        self.pos
    }

    pub fn row(&self) -> i16 {
        self.pos.row
    }

    pub fn col(&self) -> i16 {
        self.pos.col
    }

    pub fn is_diamond(&self) -> bool {
        self.piece.is_diamond()
    }

    pub fn is_explosive(&self) -> bool {
        self.piece.is_explosive()
    }

    /// Case-insensitive letter-family match; diamonds match diamonds only.
    pub fn same_family_as(&self, other: &SettledPiece) -> bool {
        self.piece.same_family(&other.piece)
    }

    /// Orthogonal adjacency on the board.
    pub fn touches(&self, other: &SettledPiece) -> bool {
        self.pos.adjacent_to(&other.pos)
    }

    /// An explosive piece detonates a touching piece of its own family.
    /// Diamonds are never explosive, so they never detonate anything.
    pub fn can_explode(&self, other: &SettledPiece) -> bool {
        self.is_explosive() && self.same_family_as(other) && self.touches(other)
    }

    /// True when the cell directly below is inside the board and empty.
    pub fn can_move_down(&self, board: &Board) -> bool {
        let below = self.pos.below();
        below.row < board.rows() && board.piece_at(below.row, below.col).is_none()
    }
}

impl PartialOrd for SettledPiece {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Row-major board order: larger rows sort later, ties break on column
/// ascending.
impl Ord for SettledPiece {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pos
            .cmp(&other.pos)
            .then_with(|| self.piece.marker().cmp(&other.piece.marker()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(letter: char) -> Piece {
        Piece::Normal(letter)
    }

    #[test]
    fn test_pair_shape_layout() {
        let shape = Shape::pair(normal('b'), normal('g'));
        assert_eq!(shape.get(GRID_CENTER, GRID_CENTER), Some(normal('b')));
        assert_eq!(shape.get(GRID_CENTER - 1, GRID_CENTER), Some(normal('g')));
        assert_eq!(shape.pieces().count(), 2);
    }

    #[test]
    fn test_single_shape_is_centered() {
        let shape = Shape::single(Piece::Diamond);
        assert_eq!(shape.get(GRID_CENTER, GRID_CENTER), Some(Piece::Diamond));
        assert_eq!(shape.pieces().count(), 1);
    }

    #[test]
    fn test_rotation_round_trips() {
        let shape = Shape::pair(normal('b'), normal('g'));
        let mut turned = shape;
        for _ in 0..4 {
            turned = turned.rotated_cw();
        }
        assert_eq!(turned, shape);

        let mut turned = shape;
        for _ in 0..4 {
            turned = turned.rotated_ccw();
        }
        assert_eq!(turned, shape);
    }

    #[test]
    fn test_cw_then_ccw_is_identity() {
        let shape = Shape::pair(normal('r'), Piece::Explosive('r'));
        assert_eq!(shape.rotated_cw().rotated_ccw(), shape);
    }

    #[test]
    fn test_rotate_cw_moves_upper_piece_to_the_right() {
        // Upper piece sits at local (0, 1); one clockwise turn lands it at
        // local (1, 2), the cell right of the center.
        let shape = Shape::pair(normal('b'), normal('g')).rotated_cw();
        assert_eq!(shape.get(GRID_CENTER, GRID_CENTER), Some(normal('b')));
        assert_eq!(shape.get(GRID_CENTER, GRID_CENTER + 1), Some(normal('g')));
    }

    #[test]
    fn test_flip_is_an_involution() {
        let shape = Shape::pair(normal('b'), normal('g'));
        let flipped = shape.flipped();
        assert_ne!(flipped, shape);
        assert_eq!(flipped.flipped(), shape);
    }

    #[test]
    fn test_flip_swaps_the_two_markers_in_place() {
        let flipped = Shape::pair(normal('b'), normal('g')).flipped();
        assert_eq!(flipped.get(GRID_CENTER, GRID_CENTER), Some(normal('g')));
        assert_eq!(flipped.get(GRID_CENTER - 1, GRID_CENTER), Some(normal('b')));
    }

    #[test]
    fn test_flip_leaves_odd_piece_unpaired() {
        // Three pieces in row-major order a, b, c: flip swaps a and b and
        // leaves c where it was.
        let mut base = Shape::single(normal('c'));
        base = Shape {
            cells: {
                let mut cells = base.cells;
                cells[0][0] = Some(normal('a'));
                cells[0][2] = Some(normal('b'));
                cells
            },
        };
        let flipped = base.flipped();
        assert_eq!(flipped.get(0, 0), Some(normal('b')));
        assert_eq!(flipped.get(0, 2), Some(normal('a')));
        assert_eq!(flipped.get(GRID_CENTER, GRID_CENTER), Some(normal('c')));
    }

    #[test]
    fn test_board_coordinate_mapping() {
        let block = FallingBlock::pair(normal('b'), normal('g'), 4, 2);
        assert_eq!(block.piece_at(4, 2), Some(normal('b')));
        assert_eq!(block.piece_at(3, 2), Some(normal('g')));
        assert_eq!(block.piece_at(5, 2), None);
        assert!(!block.has_piece_at(4, 3));
        // Far outside the 3x3 window.
        assert_eq!(block.piece_at(0, 0), None);
    }

    #[test]
    fn test_break_to_pieces_preserves_markers_and_positions() {
        let block = FallingBlock::pair(normal('b'), normal('g'), 4, 2);
        let pieces = block.break_to_pieces();
        assert_eq!(pieces.len(), 2);
        // Row-major local order puts the upper piece first.
        assert_eq!(pieces[0].piece(), normal('g'));
        assert_eq!(pieces[0].pos(), BoardPos::new(3, 2));
        assert_eq!(pieces[1].piece(), normal('b'));
        assert_eq!(pieces[1].pos(), BoardPos::new(4, 2));
    }

    #[test]
    fn test_settled_piece_ordering() {
        let high = SettledPiece::new(normal('a'), BoardPos::new(1, 5));
        let low = SettledPiece::new(normal('a'), BoardPos::new(3, 0));
        assert!(high < low);

        let left = SettledPiece::new(normal('a'), BoardPos::new(2, 1));
        let right = SettledPiece::new(normal('a'), BoardPos::new(2, 4));
        assert!(left < right);
    }

    #[test]
    fn test_touches_is_orthogonal_only() {
        let center = SettledPiece::new(normal('a'), BoardPos::new(2, 2));
        let above = SettledPiece::new(normal('a'), BoardPos::new(1, 2));
        let diagonal = SettledPiece::new(normal('a'), BoardPos::new(1, 1));
        let far = SettledPiece::new(normal('a'), BoardPos::new(2, 4));
        assert!(center.touches(&above));
        assert!(!center.touches(&diagonal));
        assert!(!center.touches(&far));
        assert!(!center.touches(&center));
    }

    #[test]
    fn test_can_explode_rules() {
        let bomb = SettledPiece::new(Piece::Explosive('g'), BoardPos::new(2, 2));
        let same = SettledPiece::new(normal('g'), BoardPos::new(2, 3));
        let other = SettledPiece::new(normal('b'), BoardPos::new(2, 1));
        let gem = SettledPiece::new(Piece::Diamond, BoardPos::new(1, 2));

        assert!(bomb.can_explode(&same));
        // A normal piece never initiates, even against an explosive one.
        assert!(!same.can_explode(&bomb));
        assert!(!bomb.can_explode(&other));
        assert!(!bomb.can_explode(&gem));
        assert!(!gem.is_explosive());
    }
}
