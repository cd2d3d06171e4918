//! Board settlement engine
//!
//! The board owns the sparse grid of settled pieces plus the (at most one)
//! falling block, and drives the per-tick transition: advance or land, then
//! resolve chain detonation and gravity compaction to a fixed point before
//! the call returns. Callers never observe a mid-chain board.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::block::{FallingBlock, SettledPiece};
use crate::core::snapshot::{BoardSnapshot, FallingSnapshot};
use crate::types::{BoardPos, Piece, EMPTY_MARKER};

/// Why a new falling block could not be spawned.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SpawnError {
    /// A block is still falling; the board handles one at a time.
    #[error("a block is already falling")]
    BlockInFlight,
    /// A settled piece occupies the spawn footprint (board full, game over).
    #[error("spawn position is blocked")]
    SpawnBlocked,
}

/// What a single [`Board::tick`] transition did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickOutcome {
    /// No block is falling; nothing happened.
    Idle,
    /// The falling block advanced one row.
    Fell,
    /// The falling block landed and the board settled; `exploded` pieces
    /// were removed by chain detonation along the way.
    Settled { exploded: u32 },
}

/// The persistent game board.
///
/// Settled pieces live in a sparse map keyed by [`BoardPos`], whose ordering
/// is row-major; the falling block is overlaid only by the renderer and
/// [`Board::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: i16,
    columns: i16,
    settled: BTreeMap<BoardPos, Piece>,
    falling: Option<FallingBlock>,
}

impl Board {
    /// Create an empty board. Dimensions must be positive.
    pub fn new(rows: i16, columns: i16) -> Self {
        assert!(rows > 0 && columns > 0, "board dimensions must be positive");
        Self {
            rows,
            columns,
            settled: BTreeMap::new(),
            falling: None,
        }
    }

    pub fn rows(&self) -> i16 {
        self.rows
    }

    pub fn columns(&self) -> i16 {
        self.columns
    }

    /// Settled piece at a coordinate. Out-of-bounds reads return `None`;
    /// the falling block's cells are not visible here.
    pub fn piece_at(&self, row: i16, col: i16) -> Option<Piece> {
        self.settled.get(&BoardPos::new(row, col)).copied()
    }

    /// The active falling block, if any.
    pub fn falling(&self) -> Option<&FallingBlock> {
        self.falling.as_ref()
    }

    /// Number of settled pieces on the board.
    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }

    /// Put a piece straight into the settled grid, for level setup and
    /// tests. Returns false when the cell is outside the board or occupied.
    pub fn place(&mut self, piece: Piece, row: i16, col: i16) -> bool {
        if row < 0 || row >= self.rows || col < 0 || col >= self.columns {
            return false;
        }
        let pos = BoardPos::new(row, col);
        if self.settled.contains_key(&pos) {
            return false;
        }
        self.settled.insert(pos, piece);
        true
    }

    /// Spawn a two-piece falling block at the top-middle column: the lower
    /// piece on row 0, the upper piece overhanging above the board.
    pub fn add_block(&mut self, lower: Piece, upper: Piece) -> Result<(), SpawnError> {
        if self.falling.is_some() {
            return Err(SpawnError::BlockInFlight);
        }
        let block = FallingBlock::pair(lower, upper, 0, self.columns / 2);
        if block.collides_with(self) {
            return Err(SpawnError::SpawnBlocked);
        }
        self.falling = Some(block);
        Ok(())
    }

    /// Advance the board by one transition: the falling block drops one
    /// row, or it lands and the board resolves detonation and compaction
    /// to a fixed point.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(mut block) = self.falling.take() else {
            return TickOutcome::Idle;
        };

        if block.can_move_down(self) {
            block.move_down();
            self.falling = Some(block);
            return TickOutcome::Fell;
        }

        for piece in block.break_to_pieces() {
            self.settle(piece);
        }
        let exploded = self.resolve();
        TickOutcome::Settled { exploded }
    }

    /// Move the falling block one column left. Returns false when no block
    /// is falling or the move is blocked.
    pub fn move_left(&mut self) -> bool {
        self.steer(FallingBlock::can_move_left, FallingBlock::move_left)
    }

    /// Move the falling block one column right.
    pub fn move_right(&mut self) -> bool {
        self.steer(FallingBlock::can_move_right, FallingBlock::move_right)
    }

    /// Rotate the falling block a quarter clockwise.
    pub fn rotate_cw(&mut self) -> bool {
        self.steer(FallingBlock::can_rotate_cw, FallingBlock::rotate_cw)
    }

    /// Rotate the falling block a quarter counter-clockwise.
    pub fn rotate_ccw(&mut self) -> bool {
        self.steer(FallingBlock::can_rotate_ccw, FallingBlock::rotate_ccw)
    }

    /// Swap the markers of the falling pair. Never blocked: the footprint
    /// does not change.
    pub fn flip(&mut self) -> bool {
        match self.falling.as_mut() {
            Some(block) => {
                block.flip();
                true
            }
            None => false,
        }
    }

    /// Capture a serializable view of the board: the rendered grid with the
    /// falling block overlaid, plus a falling-block summary.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            rows: self.rows,
            columns: self.columns,
            grid: self.to_string().lines().map(str::to_owned).collect(),
            falling: self.falling.as_ref().map(|block| FallingSnapshot {
                center_row: block.center_row(),
                center_col: block.center_col(),
                cells: block
                    .board_cells()
                    .map(|(pos, piece)| (pos.row, pos.col, piece.marker()))
                    .collect(),
            }),
            settled_count: self.settled.len(),
        }
    }

    /// Speculative-move steering: test a copy of the falling block against
    /// the board, commit only when the probe stays clear.
    fn steer(
        &mut self,
        can: impl Fn(&FallingBlock, &Board) -> bool,
        apply: impl Fn(&mut FallingBlock),
    ) -> bool {
        let Some(mut block) = self.falling.take() else {
            return false;
        };
        let ok = can(&block, self);
        if ok {
            apply(&mut block);
        }
        self.falling = Some(block);
        ok
    }

    /// Merge a decomposed piece into the settled grid. The target cell must
    /// be free: landing only happens after a failed can-move-down check.
    fn settle(&mut self, piece: SettledPiece) {
        let prev = self.settled.insert(piece.pos(), piece.piece());
        assert!(
            prev.is_none(),
            "landed onto an occupied cell at {:?}",
            piece.pos()
        );
    }

    /// Run the landed board to its stable state: compact, then alternate
    /// detonation cascades with compaction until a cascade removes nothing.
    /// Afterwards no piece can detonate and none can move down.
    fn resolve(&mut self) -> u32 {
        let mut exploded = 0;
        self.compact();
        loop {
            let removed = self.detonate();
            if removed == 0 {
                break;
            }
            exploded += removed;
            self.compact();
        }
        exploded
    }

    /// Chain-detonation cascade: each wave marks every settled piece that
    /// appears in some explode pair and removes all marked pieces at once;
    /// waves repeat against the reduced grid until nothing detonates.
    /// Returns the number of pieces removed.
    fn detonate(&mut self) -> u32 {
        let mut removed = 0;
        loop {
            let pieces = self.settled_pieces();
            let mut marked: Vec<BoardPos> = Vec::new();
            for bomb in &pieces {
                for other in &pieces {
                    if bomb.can_explode(other) {
                        marked.push(bomb.pos());
                        marked.push(other.pos());
                    }
                }
            }
            if marked.is_empty() {
                break;
            }
            marked.sort_unstable();
            marked.dedup();
            for pos in &marked {
                self.settled.remove(pos);
            }
            removed += marked.len() as u32;
        }
        removed
    }

    /// Gravity pack: full passes that move each piece down one row when the
    /// cell below is free, repeated until a pass moves nothing.
    fn compact(&mut self) {
        loop {
            let mut pieces = self.settled_pieces();
            pieces.sort_unstable_by(bottom_first);

            let mut moved = false;
            for piece in pieces {
                if piece.can_move_down(self) {
                    self.settled.remove(&piece.pos());
                    self.settled.insert(piece.pos().below(), piece.piece());
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }

    fn settled_pieces(&self) -> Vec<SettledPiece> {
        self.settled
            .iter()
            .map(|(&pos, &piece)| SettledPiece::new(piece, pos))
            .collect()
    }
}

/// Compaction order: larger rows first, columns ascending within a row.
///
/// This ordering is a correctness requirement of [`Board`] compaction, not
/// a display order: the pieces nearest the bottom must relocate first, or a
/// piece higher up would test its drop against a neighbour that is about to
/// move out of the way.
fn bottom_first(a: &SettledPiece, b: &SettledPiece) -> Ordering {
    b.row().cmp(&a.row()).then_with(|| a.col().cmp(&b.col()))
}

impl fmt::Display for Board {
    /// Text rendering: `rows` newline-terminated lines of `columns` marker
    /// characters, settled pieces overlaid with the falling block, `.` for
    /// empty cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.columns {
                let cell = self
                    .piece_at(row, col)
                    .or_else(|| self.falling.as_ref().and_then(|b| b.piece_at(row, col)));
                let marker = cell.map_or(EMPTY_MARKER, |piece| piece.marker());
                write!(f, "{}", marker)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
