//! Read-only board snapshots for external drivers and protocols.

use serde::{Deserialize, Serialize};

/// Falling-block summary inside a [`BoardSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallingSnapshot {
    pub center_row: i16,
    pub center_col: i16,
    /// Occupied cells as `(board_row, board_col, marker)`.
    pub cells: Vec<(i16, i16, char)>,
}

/// Serializable view of the whole board at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: i16,
    pub columns: i16,
    /// One string of marker characters per board row, top to bottom, with
    /// the falling block overlaid.
    pub grid: Vec<String>,
    pub falling: Option<FallingSnapshot>,
    pub settled_count: usize,
}
