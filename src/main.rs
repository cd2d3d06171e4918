//! Headless demo runner (default binary).
//!
//! Drops a short scripted sequence of blocks and prints every settled board
//! to stdout, including the chain removals along the way.

use anyhow::{anyhow, Result};

use chainfall::core::{Board, TickOutcome};
use chainfall::types::Piece;

fn main() -> Result<()> {
    let mut board = Board::new(8, 6);

    // Two mixed pairs build a small stack, an explosive green pair clears
    // the greens, and a final pair lands on what is left.
    for (lower, upper) in [('g', 'b'), ('b', 'g'), ('G', 'g'), ('y', 'y')] {
        let lower = parse(lower)?;
        let upper = parse(upper)?;
        board.add_block(lower, upper)?;
        println!("drop {}{}:", lower.marker(), upper.marker());

        loop {
            match board.tick() {
                TickOutcome::Fell => {}
                TickOutcome::Settled { exploded } => {
                    if exploded > 0 {
                        println!("chain removed {} pieces", exploded);
                    }
                    break;
                }
                TickOutcome::Idle => break,
            }
        }
        println!("{}", board);
    }
    Ok(())
}

fn parse(marker: char) -> Result<Piece> {
    Piece::from_marker(marker).ok_or_else(|| anyhow!("invalid piece marker: {:?}", marker))
}
