//! # Clock Manager
//!
//! Two countdowns with a single anchor. Only the running side's time moves,
//! and it is never ticked: the remaining time of the running clock is
//! `stored - (now - anchor)`, computed when asked. Charging folds the elapsed
//! time into the stored value and moves the anchor to `now`.
//!
//! ```text
//! move applied ─► charge(mover) ─► anchor = now ─► running = opponent
//! chain step   ─► charge(mover) ─► anchor = now   (running unchanged)
//! game over    ─► charge(mover) ─► running = none
//! ```

use draughts_engine::Color;
use shared::Timers;
use std::time::Duration;
use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    white: Duration,
    black: Duration,
    running: Option<Color>,
    anchor: Instant,
}

impl Clock {
    /// Both sides get `budget`; White's clock starts at `now`
    pub fn new(budget: Duration, now: Instant) -> Self {
        Self {
            white: budget,
            black: budget,
            running: Some(Color::White),
            anchor: now,
        }
    }

    pub fn running(&self) -> Option<Color> {
        self.running
    }

    fn stored(&self, color: Color) -> Duration {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    fn stored_mut(&mut self, color: Color) -> &mut Duration {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Remaining time for `color` as of `now`, floored at zero
    pub fn remaining(&self, color: Color, now: Instant) -> Duration {
        let stored = self.stored(color);
        if self.running == Some(color) {
            stored.saturating_sub(now.saturating_duration_since(self.anchor))
        } else {
            stored
        }
    }

    /// The running side, if its time is used up
    pub fn expired(&self, now: Instant) -> Option<Color> {
        self.running
            .filter(|color| self.remaining(*color, now).is_zero())
    }

    /// Fold elapsed time into the running clock and re-anchor
    pub fn charge(&mut self, now: Instant) {
        if let Some(color) = self.running {
            let left = self.remaining(color, now);
            *self.stored_mut(color) = left;
        }
        self.anchor = now;
    }

    /// Charge the running side, then start `next`
    pub fn switch(&mut self, next: Color, now: Instant) {
        self.charge(now);
        self.running = Some(next);
    }

    pub fn stop(&mut self, now: Instant) {
        self.charge(now);
        self.running = None;
    }

    pub fn timers(&self, now: Instant) -> Timers {
        Timers {
            white: self.remaining(Color::White, now).as_secs_f64(),
            black: self.remaining(Color::Black, now).as_secs_f64(),
            turn: self.running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: Duration = Duration::from_secs(600);

    #[test]
    fn test_only_running_clock_moves() {
        let start = Instant::now();
        let clock = Clock::new(BUDGET, start);
        let later = start + Duration::from_secs(30);

        assert_eq!(clock.remaining(Color::White, later), Duration::from_secs(570));
        assert_eq!(clock.remaining(Color::Black, later), BUDGET);
    }

    #[test]
    fn test_switch_charges_mover_and_reanchors() {
        let start = Instant::now();
        let mut clock = Clock::new(BUDGET, start);

        clock.switch(Color::Black, start + Duration::from_secs(10));
        assert_eq!(clock.running(), Some(Color::Black));

        let later = start + Duration::from_secs(25);
        assert_eq!(clock.remaining(Color::White, later), Duration::from_secs(590));
        assert_eq!(clock.remaining(Color::Black, later), Duration::from_secs(585));
    }

    #[test]
    fn test_charge_keeps_running_side() {
        let start = Instant::now();
        let mut clock = Clock::new(BUDGET, start);
        clock.charge(start + Duration::from_secs(5));
        clock.charge(start + Duration::from_secs(8));
        assert_eq!(clock.running(), Some(Color::White));
        assert_eq!(
            clock.remaining(Color::White, start + Duration::from_secs(8)),
            Duration::from_secs(592)
        );
    }

    #[test]
    fn test_expiry_is_detected_lazily() {
        let start = Instant::now();
        let clock = Clock::new(Duration::from_secs(3), start);
        assert_eq!(clock.expired(start + Duration::from_secs(2)), None);
        assert_eq!(clock.expired(start + Duration::from_secs(3)), Some(Color::White));
        assert_eq!(
            clock.timers(start + Duration::from_secs(9)).white,
            0.0,
            "Remaining time never goes negative"
        );
    }

    #[test]
    fn test_stopped_clock_reports_no_turn() {
        let start = Instant::now();
        let mut clock = Clock::new(BUDGET, start);
        clock.stop(start + Duration::from_secs(1));
        let timers = clock.timers(start + Duration::from_secs(100));
        assert_eq!(timers.turn, None);
        assert_eq!(timers.white, 599.0);
        assert_eq!(clock.expired(start + Duration::from_secs(10_000)), None);
    }
}
