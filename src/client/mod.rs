//! Client side of the draughts protocol: REST calls, the optimistic
//! predictor and the reconnecting live feed.

pub mod api;
pub mod backoff;
pub mod predictor;
pub mod subscriber;

pub use api::{ApiClient, ClientError};
pub use backoff::Backoff;
pub use predictor::Predictor;
pub use subscriber::{FeedEvent, Subscriber};

use draughts_engine::{Board, Pos};

/// Text diagram with file letters and rank numbers
pub fn render(board: &Board) -> String {
    let mut out = String::new();
    for (row, cells) in board.rows().iter().enumerate() {
        out.push_str(&format!("{} ", 8 - row));
        for (col, cell) in cells.iter().enumerate() {
            let code = match cell.piece() {
                Some(piece) => piece.code(),
                None if Pos::new(row as i8, col as i8).is_playable() => '.',
                None => ' ',
            };
            out.push(code);
        }
        out.push('\n');
    }
    out.push_str("  ABCDEFGH\n");
    out
}
