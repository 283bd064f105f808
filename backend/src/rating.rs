//! Rating collaborator
//!
//! The authority only needs "a numeric delta per color" when a rated game
//! ends. [`EloTable`] is the in-process default; a deployment can plug in any
//! other [`RatingService`].

use draughts_engine::{Color, Status};
use parking_lot::Mutex;
use shared::RatingChange;
use std::collections::HashMap;

pub const STARTING_RATING: i32 = 1200;
pub const K_FACTOR: f64 = 32.0;

pub trait RatingService: Send + Sync {
    /// Settle a finished game between two users. `None` for unfinished games.
    fn settle(&self, white: &str, black: &str, status: Status) -> Option<RatingChange>;

    fn rating(&self, user: &str) -> i32;
}

/// Elo ratings kept in memory, floored at zero
#[derive(Debug, Default)]
pub struct EloTable {
    ratings: Mutex<HashMap<String, i32>>,
}

impl EloTable {
    pub fn new() -> Self {
        Self::default()
    }
}

fn expected_score(own: i32, other: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(other - own) / 400.0))
}

impl RatingService for EloTable {
    fn settle(&self, white: &str, black: &str, status: Status) -> Option<RatingChange> {
        if !status.is_over() {
            return None;
        }
        let white_score = match status.winner() {
            Some(Color::White) => 1.0,
            Some(Color::Black) => 0.0,
            None => 0.5,
        };

        let mut ratings = self.ratings.lock();
        let white_before = *ratings.get(white).unwrap_or(&STARTING_RATING);
        let black_before = *ratings.get(black).unwrap_or(&STARTING_RATING);

        let adjust = |before: i32, other: i32, score: f64| {
            let delta = (K_FACTOR * (score - expected_score(before, other))).round() as i32;
            (before + delta).max(0)
        };
        let white_after = adjust(white_before, black_before, white_score);
        let black_after = adjust(black_before, white_before, 1.0 - white_score);

        ratings.insert(white.to_string(), white_after);
        ratings.insert(black.to_string(), black_after);

        Some(RatingChange {
            white: white_after - white_before,
            black: black_after - black_before,
        })
    }

    fn rating(&self, user: &str) -> i32 {
        self.ratings
            .lock()
            .get(user)
            .copied()
            .unwrap_or(STARTING_RATING)
    }
}
