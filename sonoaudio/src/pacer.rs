//! Real-time pacing: keeps byte emission at audio wall-clock rate.
//!
//! Clients treat the stream as a radio URI with a small buffer, so bytes
//! must neither burst far ahead of real time nor stall. The pacer compares
//! the cumulative audio duration handed to the encoder with the wall clock
//! and sleeps the difference, minus a slack that keeps client buffers warm.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How far `audio_time` may run ahead of the wall clock before sleeping.
const PACING_SLACK_SECS: f64 = 0.2;

/// Lag beyond which the pacer re-anchors instead of catching up; a
/// catch-up burst would stall small-buffer clients.
const MAX_LAG_SECS: f64 = 2.0;

/// Sleep resolution; cancellation is observed at this granularity.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub struct RealTimePacer {
    start: Instant,
    audio_secs: f64,
    lag_warned: bool,
}

impl RealTimePacer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            audio_secs: 0.0,
            lag_warned: false,
        }
    }

    /// Accounts for one chunk of audio and blocks (in ≤ 50 ms slices) until
    /// the wall clock is within slack of the accumulated audio time.
    ///
    /// Returns `false` when the listener was cancelled during the wait.
    pub fn pace(&mut self, chunk_secs: f64, cancel: &CancellationToken) -> bool {
        self.audio_secs += chunk_secs;

        loop {
            if cancel.is_cancelled() {
                return false;
            }

            let wall = self.start.elapsed().as_secs_f64();
            let ahead = self.audio_secs - wall;

            if ahead <= PACING_SLACK_SECS {
                if ahead < -MAX_LAG_SECS {
                    if !self.lag_warned {
                        warn!(
                            lag_secs = -ahead,
                            "Stream fell behind real time; continuing without catch-up"
                        );
                        self.lag_warned = true;
                    }
                    // Re-anchor: a permanently-late stream is acceptable, a
                    // burst is not.
                    self.start = Instant::now() - Duration::from_secs_f64(self.audio_secs);
                }
                return true;
            }

            let wait = Duration::from_secs_f64(ahead - PACING_SLACK_SECS).min(SLEEP_SLICE);
            std::thread::sleep(wait);
        }
    }

    /// Seconds of audio accounted so far.
    pub fn audio_secs(&self) -> f64 {
        self.audio_secs
    }
}

impl Default for RealTimePacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paces_to_wall_clock() {
        let cancel = CancellationToken::new();
        let mut pacer = RealTimePacer::new();

        let start = Instant::now();
        // Feed 0.6 s of audio in 0.1 s steps.
        for _ in 0..6 {
            assert!(pacer.pace(0.1, &cancel));
        }
        let elapsed = start.elapsed().as_secs_f64();

        // Must have slept: 0.6 s of audio minus 0.2 s slack.
        assert!(elapsed >= 0.35, "elapsed only {:.3} s", elapsed);
        assert!(elapsed < 0.8, "elapsed {:.3} s", elapsed);
    }

    #[test]
    fn cancellation_interrupts_the_wait() {
        let cancel = CancellationToken::new();
        let mut pacer = RealTimePacer::new();

        cancel.cancel();
        assert!(!pacer.pace(5.0, &cancel));
    }

    #[test]
    fn no_sleep_while_behind() {
        let cancel = CancellationToken::new();
        let mut pacer = RealTimePacer::new();

        std::thread::sleep(Duration::from_millis(120));
        let start = Instant::now();
        assert!(pacer.pace(0.05, &cancel));
        // Audio is behind the wall clock, pace must return at once.
        assert!(start.elapsed() < Duration::from_millis(20));
    }
}
