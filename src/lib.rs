//! chainfall - rules engine for a falling-piece chain-clear puzzle game.
//!
//! Pieces fall in two-piece blocks onto a rectangular board, land, detonate
//! in chains against touching pieces of the same letter family, and the
//! board packs back down under gravity. The crate owns the rules only:
//! spawn cadence, input handling, rendering and scoring belong to the
//! caller, which drives the engine through [`core::Board::add_block`] and
//! [`core::Board::tick`].
//!
//! # Example
//!
//! ```
//! use chainfall::core::{Board, TickOutcome};
//! use chainfall::types::Piece;
//!
//! let mut board = Board::new(3, 6);
//! board.add_block(Piece::Normal('b'), Piece::Normal('g')).unwrap();
//! assert_eq!(board.to_string(), "...b..\n......\n......\n");
//!
//! // One tick later both pieces of the pair are visible.
//! assert_eq!(board.tick(), TickOutcome::Fell);
//! assert_eq!(board.to_string(), "...g..\n...b..\n......\n");
//! ```

pub mod core;
pub mod types;
