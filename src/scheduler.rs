//! Burn-in scheduler: decides what the clock shows, where, and how opaque.
//!
//! One driving clock feeds three counters:
//!
//! - **tick** (1 s): refresh the time text
//! - **jitter** (every 60 ticks): pick a new jitter offset
//! - **macro** (every 300 ticks): fade out, move to the next grid cell, fade in
//!
//! The host calls [`BurnInScheduler::advance`] with however much time has
//! passed. The call is split at tick boundaries, so a 16 ms frame step and a
//! 1 s test step produce the same firings.
//!
//! ## Rust concepts
//! - `let ... else` for early return on an enum variant
//! - `Duration` arithmetic instead of raw millisecond integers
//! - `&dyn Trait` parameters for the clock source

use crate::clock::{WallClock, format_time_of_day};
use crate::fade;
use crate::grid::{self, GRID_CELLS};
use crate::jitter::JitterGenerator;
use crate::{Geometry, Offset};
use rand::Rng;
use rand::rngs::StdRng;
use std::time::Duration;

pub const TICK: Duration = Duration::from_millis(1000);
pub const JITTER_INTERVAL_TICKS: u32 = 60;
pub const MACRO_INTERVAL_TICKS: u32 = 300;
pub const FADE_DURATION: Duration = Duration::from_millis(1500);
pub const TRANSITION_DURATION: Duration = Duration::from_millis(3000);

/// Everything the renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    /// `HH:MM` as of the last tick
    pub time_text: String,
    /// Grid cell in `0..9`
    pub cell_index: usize,
    /// Small nudge on top of the cell position; never `(0, 0)`
    pub jitter: Offset,
    /// 1.0 at rest, dips to 0.0 mid-transition
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A cell move is fading; `elapsed` runs from zero to [`TRANSITION_DURATION`].
    Transitioning { elapsed: Duration },
}

pub struct BurnInScheduler<R: Rng = StdRng> {
    state: DisplayState,
    jitter: JitterGenerator<R>,
    phase: Phase,
    since_tick: Duration,
    jitter_ticks: u32,
    macro_ticks: u32,
    completed_moves: u64,
}

impl<R: Rng> BurnInScheduler<R> {
    /// Start at cell 0, fully opaque, with the current time already formatted.
    pub fn new(clock: &dyn WallClock, mut jitter: JitterGenerator<R>) -> Self {
        let state = DisplayState {
            time_text: format_time_of_day(clock.now()),
            cell_index: 0,
            jitter: jitter.next_offset(),
            opacity: 1.0,
        };
        Self {
            state,
            jitter,
            phase: Phase::Idle,
            since_tick: Duration::ZERO,
            jitter_ticks: 0,
            macro_ticks: 0,
            completed_moves: 0,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, Phase::Transitioning { .. })
    }

    /// Number of cell moves that have fully finished fading back in.
    pub fn completed_moves(&self) -> u64 {
        self.completed_moves
    }

    /// Ticks left before the macro timer fires, or `None` mid-transition.
    pub fn ticks_until_move(&self) -> Option<u32> {
        match self.phase {
            Phase::Idle => Some(MACRO_INTERVAL_TICKS.saturating_sub(self.macro_ticks)),
            Phase::Transitioning { .. } => None,
        }
    }

    /// Where to draw the clock: cell center plus jitter, relative to the
    /// geometry's center.
    pub fn offset(&self, geometry: Geometry, margin_px: u32) -> Offset {
        grid::cell_offset(self.state.cell_index, geometry, margin_px) + self.state.jitter
    }

    /// Move time forward by `dt`.
    ///
    /// `settings_visible` pauses the macro counter (without resetting it);
    /// ticks and jitter keep running.
    pub fn advance(&mut self, dt: Duration, clock: &dyn WallClock, settings_visible: bool) {
        let mut remaining = dt;
        while !remaining.is_zero() {
            let step = remaining.min(TICK - self.since_tick);
            let fade_finished = self.step_transition(step);
            self.since_tick += step;
            remaining -= step;

            if self.since_tick >= TICK {
                self.since_tick = Duration::ZERO;
                // A tick that lands on the end of a fade still belongs to it.
                let counts_toward_move = !fade_finished && !settings_visible;
                self.on_tick(clock, counts_toward_move);
            }
        }
    }

    /// Start a cell move right away. Returns `false` if one is already running.
    pub fn advance_now(&mut self) -> bool {
        if self.is_transitioning() {
            return false;
        }
        self.start_transition();
        true
    }

    fn on_tick(&mut self, clock: &dyn WallClock, counts_toward_move: bool) {
        self.state.time_text = format_time_of_day(clock.now());

        self.jitter_ticks += 1;
        if self.jitter_ticks >= JITTER_INTERVAL_TICKS {
            self.jitter_ticks = 0;
            self.state.jitter = self.jitter.next_offset();
            tracing::debug!("Jitter now {:?}", self.state.jitter);
        }

        if self.is_transitioning() || !counts_toward_move {
            return;
        }
        self.macro_ticks += 1;
        if self.macro_ticks >= MACRO_INTERVAL_TICKS {
            self.start_transition();
        }
    }

    fn start_transition(&mut self) {
        tracing::debug!("Fading out of cell {}", self.state.cell_index);
        self.phase = Phase::Transitioning {
            elapsed: Duration::ZERO,
        };
    }

    /// Run the active transition forward by `step`. Returns `true` when this
    /// step finished it.
    fn step_transition(&mut self, step: Duration) -> bool {
        let Phase::Transitioning { elapsed } = self.phase else {
            return false;
        };
        let after = elapsed + step;

        if elapsed < FADE_DURATION && after >= FADE_DURATION {
            self.state.cell_index = (self.state.cell_index + 1) % GRID_CELLS;
            self.state.jitter = self.jitter.next_offset();
            tracing::info!("Clock moved to cell {}", self.state.cell_index);
        }

        if after >= TRANSITION_DURATION {
            self.phase = Phase::Idle;
            self.state.opacity = 1.0;
            // The next countdown starts only once the fade-in is done.
            self.macro_ticks = 0;
            self.completed_moves += 1;
            return true;
        }

        self.phase = Phase::Transitioning { elapsed: after };
        self.state.opacity = opacity_at(after);
        false
    }
}

/// Opacity `elapsed` into a transition: eased 1→0, then eased 0→1.
fn opacity_at(elapsed: Duration) -> f32 {
    if elapsed < FADE_DURATION {
        1.0 - fade::progress(elapsed, FADE_DURATION)
    } else {
        fade::progress(elapsed - FADE_DURATION, FADE_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, TimeOfDay};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    const SEED: u64 = 2024;

    fn noon() -> FixedClock {
        FixedClock(TimeOfDay::new(12, 0))
    }

    fn scheduler() -> BurnInScheduler {
        BurnInScheduler::new(&noon(), JitterGenerator::from_seed(SEED))
    }

    fn run_ticks(s: &mut BurnInScheduler, ticks: u32, settings_visible: bool) {
        let clock = noon();
        for _ in 0..ticks {
            s.advance(TICK, &clock, settings_visible);
        }
    }

    /// A clock whose reading can be changed between calls.
    struct SettableClock(Cell<TimeOfDay>);

    impl WallClock for SettableClock {
        fn now(&self) -> TimeOfDay {
            self.0.get()
        }
    }

    #[test]
    fn starts_idle_at_cell_zero_with_nonzero_jitter() {
        let s = scheduler();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.state().cell_index, 0);
        assert_eq!(s.state().opacity, 1.0);
        assert_eq!(s.state().time_text, "12:00");
        assert_ne!(s.state().jitter, Offset::new(0, 0));
        assert_eq!(s.ticks_until_move(), Some(MACRO_INTERVAL_TICKS));
    }

    #[test]
    fn tick_refreshes_time_text_once_per_second() {
        let clock = SettableClock(Cell::new(TimeOfDay::new(9, 4)));
        let mut s = BurnInScheduler::new(&clock, JitterGenerator::from_seed(SEED));
        assert_eq!(s.state().time_text, "09:04");

        clock.0.set(TimeOfDay::new(9, 5));
        s.advance(Duration::from_millis(999), &clock, false);
        assert_eq!(s.state().time_text, "09:04");

        s.advance(Duration::from_millis(1), &clock, false);
        assert_eq!(s.state().time_text, "09:05");
    }

    #[test]
    fn jitter_follows_the_seeded_sequence_every_sixty_ticks() {
        let mut s = scheduler();
        let mut expected = JitterGenerator::from_seed(SEED);
        assert_eq!(s.state().jitter, expected.next_offset());

        for _ in 0..3 {
            let before = s.state().jitter;
            run_ticks(&mut s, JITTER_INTERVAL_TICKS - 1, false);
            assert_eq!(s.state().jitter, before);
            run_ticks(&mut s, 1, false);
            assert_eq!(s.state().jitter, expected.next_offset());
        }
    }

    #[test]
    fn macro_timer_starts_transition_after_three_hundred_ticks() {
        let mut s = scheduler();
        run_ticks(&mut s, MACRO_INTERVAL_TICKS - 1, false);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.ticks_until_move(), Some(1));

        run_ticks(&mut s, 1, false);
        assert!(s.is_transitioning());
        assert_eq!(s.state().cell_index, 0);
    }

    #[test]
    fn transition_takes_three_seconds_and_moves_once_at_the_midpoint() {
        let mut s = scheduler();
        let clock = noon();
        let mut expected = JitterGenerator::from_seed(SEED);
        // Initial draw plus five jitter-timer firings up to tick 300.
        for _ in 0..6 {
            expected.next_offset();
        }

        run_ticks(&mut s, MACRO_INTERVAL_TICKS, false);
        assert!(s.is_transitioning());
        let jitter_before = s.state().jitter;
        let jitter_after = expected.next_offset();

        let step = Duration::from_millis(100);
        let mut elapsed = Duration::ZERO;
        let mut moves = 0;
        let mut last_opacity = s.state().opacity;
        while s.is_transitioning() {
            let cell_before = s.state().cell_index;
            s.advance(step, &clock, false);
            elapsed += step;

            if s.state().cell_index != cell_before {
                moves += 1;
                assert_eq!(elapsed, FADE_DURATION);
                assert_eq!(s.state().opacity, 0.0);
                assert_eq!(s.state().jitter, jitter_after);
            } else if elapsed < FADE_DURATION {
                assert_eq!(s.state().jitter, jitter_before);
            }

            let opacity = s.state().opacity;
            if elapsed <= FADE_DURATION {
                assert!(opacity <= last_opacity, "fade-out rose at {elapsed:?}");
            } else {
                assert!(opacity >= last_opacity, "fade-in dipped at {elapsed:?}");
            }
            last_opacity = opacity;
        }

        assert_eq!(elapsed, TRANSITION_DURATION);
        assert_eq!(moves, 1);
        assert_eq!(s.state().cell_index, 1);
        assert_eq!(s.state().opacity, 1.0);
        assert_eq!(s.completed_moves(), 1);
    }

    #[test]
    fn visits_every_cell_in_order_and_wraps() {
        let mut s = scheduler();
        let clock = noon();
        let mut visited = Vec::new();

        for _ in 0..10_000 {
            let before = s.state().cell_index;
            s.advance(TICK, &clock, false);
            if s.state().cell_index != before {
                visited.push(s.state().cell_index);
            }
            if visited.len() == 9 {
                break;
            }
        }

        assert_eq!(visited, vec![1, 2, 3, 4, 5, 6, 7, 8, 0]);
    }

    #[test]
    fn next_countdown_starts_after_the_fade_in() {
        let mut s = scheduler();
        run_ticks(&mut s, MACRO_INTERVAL_TICKS, false);
        // Fade completes at the third tick after it started.
        run_ticks(&mut s, 3, false);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.ticks_until_move(), Some(MACRO_INTERVAL_TICKS));

        run_ticks(&mut s, MACRO_INTERVAL_TICKS - 1, false);
        assert_eq!(s.phase(), Phase::Idle);
        run_ticks(&mut s, 1, false);
        assert!(s.is_transitioning());
    }

    #[test]
    fn moves_start_every_interval_plus_the_fade() {
        let mut s = scheduler();
        let clock = noon();
        let mut starts = Vec::new();
        for second in 1..=1000 {
            let was_transitioning = s.is_transitioning();
            s.advance(TICK, &clock, false);
            if !was_transitioning && s.is_transitioning() {
                starts.push(second);
            }
        }
        assert_eq!(starts, vec![300, 603, 906]);
    }

    #[test]
    fn manual_move_finishing_mid_tick_keeps_the_next_tick() {
        let mut s = scheduler();
        let clock = noon();
        s.advance(Duration::from_millis(400), &clock, false);
        assert!(s.advance_now());
        // Finishes 400 ms into the fourth tick; that tick then counts.
        s.advance(TRANSITION_DURATION, &clock, false);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.ticks_until_move(), Some(MACRO_INTERVAL_TICKS));
        s.advance(Duration::from_millis(600), &clock, false);
        assert_eq!(s.ticks_until_move(), Some(MACRO_INTERVAL_TICKS - 1));
    }

    #[test]
    fn settings_overlay_pauses_the_macro_timer_without_resetting() {
        let mut s = scheduler();
        run_ticks(&mut s, 100, false);

        run_ticks(&mut s, MACRO_INTERVAL_TICKS, true);
        assert_eq!(s.state().cell_index, 0);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.ticks_until_move(), Some(200));

        run_ticks(&mut s, 200, false);
        assert!(s.is_transitioning());
        s.advance(FADE_DURATION, &noon(), false);
        assert_eq!(s.state().cell_index, 1);

        s.advance(FADE_DURATION, &noon(), false);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.completed_moves(), 1);
    }

    #[test]
    fn settings_overlay_does_not_stop_ticks_or_jitter() {
        let clock = SettableClock(Cell::new(TimeOfDay::new(22, 10)));
        let mut s = BurnInScheduler::new(&clock, JitterGenerator::from_seed(SEED));
        let mut expected = JitterGenerator::from_seed(SEED);
        expected.next_offset();

        clock.0.set(TimeOfDay::new(22, 11));
        for _ in 0..JITTER_INTERVAL_TICKS {
            s.advance(TICK, &clock, true);
        }
        assert_eq!(s.state().time_text, "22:11");
        assert_eq!(s.state().jitter, expected.next_offset());
    }

    #[test]
    fn fully_suspended_run_never_moves() {
        let mut s = scheduler();
        run_ticks(&mut s, MACRO_INTERVAL_TICKS * 3, true);
        assert_eq!(s.state().cell_index, 0);
        assert_eq!(s.completed_moves(), 0);
    }

    #[test]
    fn advance_now_runs_the_same_transition() {
        let mut s = scheduler();
        assert!(s.advance_now());
        assert!(s.is_transitioning());
        assert!(!s.advance_now(), "second trigger must be refused mid-transition");

        s.advance(TRANSITION_DURATION, &noon(), false);
        assert_eq!(s.state().cell_index, 1);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.advance_now());
    }

    #[test]
    fn macro_timer_is_held_while_transitioning() {
        let mut s = scheduler();
        run_ticks(&mut s, MACRO_INTERVAL_TICKS - 1, false);
        assert!(s.advance_now());
        // The tick that would have fired the macro timer lands mid-fade.
        run_ticks(&mut s, 2, false);
        assert!(s.is_transitioning());
        run_ticks(&mut s, 1, false);
        assert_eq!(s.state().cell_index, 1);
        assert_eq!(s.completed_moves(), 1);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn large_steps_fire_every_tick() {
        let mut a = scheduler();
        let mut b = scheduler();
        let clock = noon();
        a.advance(Duration::from_secs(700), &clock, false);
        for _ in 0..700 {
            b.advance(TICK, &clock, false);
        }
        assert_eq!(a.state(), b.state());
        assert_eq!(a.phase(), b.phase());
    }

    #[test]
    fn offset_adds_jitter_to_the_cell_center() {
        let s = scheduler();
        let geometry = Geometry::new(900, 900);
        let expected = grid::cell_offset(0, geometry, 56) + s.state().jitter;
        assert_eq!(s.offset(geometry, 56), expected);
    }

    #[test]
    fn opacity_curve_halves() {
        assert_eq!(opacity_at(Duration::ZERO), 1.0);
        assert_eq!(opacity_at(FADE_DURATION), 0.0);
        assert!(opacity_at(Duration::from_millis(750)) < 0.5);
        assert!(opacity_at(Duration::from_millis(2250)) > 0.5);
    }
}
