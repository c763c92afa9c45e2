//! Playback state machine for the preview player.
//!
//! The controller owns global timeline time only. The host drives a frame
//! loop ("request next frame, compute, draw, repeat"): each iteration calls
//! [`PlaybackController::tick`], renders the returned instant, and
//! reschedules itself only while `tick` keeps returning `Some`. That check is
//! the sole cancellation mechanism: pausing or stopping makes the next tick
//! return `None` and the loop winds down on its own.

use std::time::Instant;

/// Milliseconds source. Injected so the state machine is testable with a
/// manual clock.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by a monotonic [`Instant`].
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What one frame-loop iteration should render, plus the progress readout
/// for the time display and progress bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Elapsed timeline time, wrapped into [0, total).
    pub elapsed_ms: f64,
    pub total_ms: f64,
}

impl FrameTick {
    pub fn progress_fraction(&self) -> f64 {
        if self.total_ms <= 0.0 {
            0.0
        } else {
            self.elapsed_ms / self.total_ms
        }
    }
}

/// Outcome of a [`PlaybackController::seek`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekOutcome {
    /// True when the controller is not playing and the host should render
    /// exactly one frame at the new offset without starting the loop.
    pub render_once: bool,
}

#[derive(Clone, Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    total_ms: f64,
    /// Elapsed offset accumulated before the current play anchor.
    offset_ms: f64,
    /// Clock timestamp of the most recent transition into `Playing`.
    anchor_ms: f64,
}

impl PlaybackController {
    pub fn new(total_ms: f64) -> Self {
        Self {
            state: PlaybackState::Stopped,
            total_ms: total_ms.max(0.0),
            offset_ms: 0.0,
            anchor_ms: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn total_ms(&self) -> f64 {
        self.total_ms
    }

    /// Keep the controller in sync when slides are added, removed, or
    /// re-timed in the builder.
    pub fn set_total_duration(&mut self, total_ms: f64) {
        self.total_ms = total_ms.max(0.0);
    }

    /// Raw elapsed timeline time at `now_ms` (before wrapping).
    fn raw_elapsed(&self, now_ms: f64) -> f64 {
        match self.state {
            PlaybackState::Playing => self.offset_ms + (now_ms - self.anchor_ms),
            PlaybackState::Paused | PlaybackState::Stopped => self.offset_ms,
        }
    }

    /// Elapsed time wrapped into [0, total): what the progress UI shows and
    /// what the timeline mapping consumes.
    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        if self.total_ms <= 0.0 {
            return 0.0;
        }
        self.raw_elapsed(now_ms).rem_euclid(self.total_ms)
    }

    /// Start or resume playback. Resuming continues from the frozen offset,
    /// not from zero.
    pub fn play(&mut self, now_ms: f64) {
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::Stopped | PlaybackState::Paused => {
                self.anchor_ms = now_ms;
                self.state = PlaybackState::Playing;
            }
        }
    }

    /// Freeze elapsed time for an exact resume. The frame loop observes the
    /// state change on its next tick and stops rescheduling.
    pub fn pause(&mut self, now_ms: f64) {
        if self.state == PlaybackState::Playing {
            self.offset_ms = self.raw_elapsed(now_ms);
            self.state = PlaybackState::Paused;
        }
    }

    /// Reset to the beginning.
    pub fn stop(&mut self) {
        self.offset_ms = 0.0;
        self.state = PlaybackState::Stopped;
    }

    /// Jump to `fraction` of the total duration. Valid in any state; when
    /// not playing the host renders one frame at the new offset.
    pub fn seek(&mut self, fraction: f64, now_ms: f64) -> SeekOutcome {
        let fraction = fraction.clamp(0.0, 1.0);
        self.offset_ms = fraction * self.total_ms;
        match self.state {
            PlaybackState::Playing => {
                self.anchor_ms = now_ms;
                SeekOutcome { render_once: false }
            }
            PlaybackState::Paused | PlaybackState::Stopped => SeekOutcome { render_once: true },
        }
    }

    /// One frame-loop iteration. `None` when playback is not running, which
    /// tells the loop to stop rescheduling itself.
    pub fn tick(&self, now_ms: f64) -> Option<FrameTick> {
        if self.state != PlaybackState::Playing || self.total_ms <= 0.0 {
            return None;
        }
        Some(FrameTick {
            elapsed_ms: self.elapsed_ms(now_ms),
            total_ms: self.total_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_stopped_at_zero() {
        let c = PlaybackController::new(5000.0);
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(c.elapsed_ms(99.0), 0.0);
        assert!(c.tick(99.0).is_none());
    }

    #[test]
    fn play_advances_with_the_clock() {
        let mut c = PlaybackController::new(5000.0);
        c.play(1000.0);
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.elapsed_ms(1000.0), 0.0);
        assert_eq!(c.elapsed_ms(2500.0), 1500.0);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut c = PlaybackController::new(5000.0);
        c.play(0.0);
        c.pause(1200.0);
        assert_eq!(c.state(), PlaybackState::Paused);
        // Frozen while paused, no matter how much wall time passes.
        assert_eq!(c.elapsed_ms(9999.0), 1200.0);
        assert!(c.tick(9999.0).is_none());

        c.play(10_000.0);
        assert_eq!(c.elapsed_ms(10_300.0), 1500.0);
    }

    #[test]
    fn stop_resets_to_zero() {
        let mut c = PlaybackController::new(5000.0);
        c.play(0.0);
        c.pause(2000.0);
        c.stop();
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(c.elapsed_ms(5000.0), 0.0);
    }

    #[test]
    fn playback_loops_past_total() {
        let mut c = PlaybackController::new(5000.0);
        c.play(0.0);
        assert_eq!(c.elapsed_ms(8500.0), 3500.0);
        let tick = c.tick(8500.0).unwrap();
        assert_eq!(tick.elapsed_ms, 3500.0);
        assert!((tick.progress_fraction() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn seek_while_paused_requests_single_render() {
        let mut c = PlaybackController::new(4000.0);
        c.play(0.0);
        c.pause(500.0);
        let outcome = c.seek(0.5, 600.0);
        assert!(outcome.render_once);
        assert_eq!(c.elapsed_ms(600.0), 2000.0);
        // Still paused: the loop must not restart.
        assert!(c.tick(600.0).is_none());
    }

    #[test]
    fn seek_while_playing_rebases_the_anchor() {
        let mut c = PlaybackController::new(4000.0);
        c.play(0.0);
        let outcome = c.seek(0.25, 1000.0);
        assert!(!outcome.render_once);
        assert_eq!(c.elapsed_ms(1000.0), 1000.0);
        assert_eq!(c.elapsed_ms(1500.0), 1500.0);
    }

    #[test]
    fn seek_clamps_fraction() {
        let mut c = PlaybackController::new(4000.0);
        c.seek(1.5, 0.0);
        assert_eq!(c.elapsed_ms(0.0), 0.0); // 1.0 * total wraps to 0
        c.seek(-0.5, 0.0);
        assert_eq!(c.elapsed_ms(0.0), 0.0);
    }

    #[test]
    fn zero_duration_never_ticks() {
        let mut c = PlaybackController::new(0.0);
        c.play(0.0);
        assert!(c.tick(100.0).is_none());
        assert_eq!(c.elapsed_ms(100.0), 0.0);
    }

    #[test]
    fn monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
