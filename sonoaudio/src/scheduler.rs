//! Per-track cadence engine.
//!
//! A `TrackScheduler` is a lazy chunk source over one shared
//! `TrackInstance`. It decides when the file sounds, how long the silence
//! between plays lasts and at what gain samples leave, according to the
//! track's playback mode. Scheduler state (decoder position, rest counters,
//! RNG) belongs to one listener; only the settings are shared.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use sonotheme::{PlaybackMode, TrackInstance, TrackSettings};
use tracing::{debug, warn};

use crate::{chunk::PcmChunk, source::CanonicalSource, CHUNK_SIZE, SAMPLE_RATE};

/// Fixed gap between plays for continuous tracks without seamless looping.
const CONTINUOUS_GAP_SECS: f64 = 0.5;

/// Rest applied after a decode failure before trying the file again.
const DECODE_ERROR_REST_SECS: f64 = 10.0;

/// Theme-level base gap feeding the sparse cadence formula.
const BASE_GAP_SECS: f64 = 30.0;

/// Clamp bounds for the exponential mean.
const MIN_MEAN_GAP_SECS: f64 = 5.0;
const MAX_MEAN_GAP_SECS: f64 = 900.0;

/// Floor for individual gap draws.
const MIN_GAP_SECS: f64 = 1.0;

const PRESENCE_EPSILON: f64 = 1e-3;

/// Playback mode after `auto` resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EffectiveMode {
    Continuous,
    Sparse,
    Presence,
}

/// Mutual-exclusion slot shared by all schedulers of one listener stream.
///
/// Only the holder may sound among exclusive-flagged tracks. The slot is
/// claimed on entering SOUNDING and released on the first tick after
/// leaving it, so a successor can never sound in the tick that carried the
/// holder's final samples. The mixer polls schedulers in track insertion
/// order, so simultaneous claims resolve in insertion order.
pub struct ExclusiveGate {
    holder: AtomicUsize,
}

const GATE_FREE: usize = usize::MAX;

impl ExclusiveGate {
    pub fn new() -> Self {
        Self {
            holder: AtomicUsize::new(GATE_FREE),
        }
    }

    fn try_claim(&self, index: usize) -> bool {
        self.holder
            .compare_exchange(GATE_FREE, index, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            || self.holder.load(Ordering::Acquire) == index
    }

    fn release(&self, index: usize) {
        let _ = self.holder.compare_exchange(
            index,
            GATE_FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl Default for ExclusiveGate {
    fn default() -> Self {
        Self::new()
    }
}

enum SchedulerState {
    Sounding { source: CanonicalSource },
    Resting { remaining_samples: u64 },
    Terminated,
}

pub struct TrackScheduler {
    instance: Arc<TrackInstance>,
    short_file_threshold: f64,
    state: SchedulerState,
    rng: SmallRng,
    gate: Arc<ExclusiveGate>,
    /// Position of this track in the theme's track list; the gate id.
    index: usize,
    holds_gate: bool,
    decode_error_logged: bool,
}

impl TrackScheduler {
    /// `seed` must be derived from (listener, theme, recording) so listeners
    /// get distinct but reproducible cadences.
    pub fn new(
        instance: Arc<TrackInstance>,
        short_file_threshold: f64,
        seed: u64,
        index: usize,
        gate: Arc<ExclusiveGate>,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let settings = instance.settings();
        let duration = instance.recording().duration_secs();

        // Continuous tracks start sounding at frame 0; sparse/presence
        // tracks open with one rest draw so they desynchronize.
        let state = match resolve_mode(settings.playback_mode, duration, short_file_threshold) {
            EffectiveMode::Continuous => SchedulerState::Resting {
                remaining_samples: 0,
            },
            EffectiveMode::Sparse | EffectiveMode::Presence => SchedulerState::Resting {
                remaining_samples: draw_gap_samples(&mut rng, settings.presence),
            },
        };

        Self {
            instance,
            short_file_threshold,
            state,
            rng,
            gate,
            index,
            holds_gate: false,
            decode_error_logged: false,
        }
    }

    pub fn instance(&self) -> &Arc<TrackInstance> {
        &self.instance
    }

    /// Produces exactly one chunk, advancing cadence state.
    ///
    /// Never fails: decode errors are recovered locally by resting 10 s.
    pub fn next_chunk(&mut self) -> PcmChunk {
        // The gate is released one tick after leaving SOUNDING, never within
        // the tick that carried the final samples: releasing mid-tick would
        // let the next exclusive track sound in the same tick and break
        // exclusive disjointness.
        if self.holds_gate && !matches!(self.state, SchedulerState::Sounding { .. }) {
            self.gate.release(self.index);
            self.holds_gate = false;
        }

        // One settings snapshot per tick; no torn reads inside a chunk.
        let settings = self.instance.settings();
        let mode = resolve_mode(
            settings.playback_mode,
            self.instance.recording().duration_secs(),
            self.short_file_threshold,
        );

        match &mut self.state {
            SchedulerState::Terminated => PcmChunk::silence(),

            SchedulerState::Resting { remaining_samples } => {
                if *remaining_samples > 0 {
                    *remaining_samples = remaining_samples.saturating_sub(CHUNK_SIZE as u64);
                    return PcmChunk::silence();
                }

                // Rest over: claim the gate (exclusive tracks only), open
                // the decoder and start sounding.
                if settings.exclusive {
                    if !self.gate.try_claim(self.index) {
                        // Another exclusive track is sounding; idle one chunk.
                        return PcmChunk::silence();
                    }
                    // Held from the claim on, so a failed open below still
                    // releases on the next tick.
                    self.holds_gate = true;
                }

                match CanonicalSource::open(self.instance.recording()) {
                    Ok(source) => {
                        self.decode_error_logged = false;
                        self.state = SchedulerState::Sounding { source };
                        self.fill_sounding_chunk(&settings, mode)
                    }
                    Err(err) => {
                        self.on_decode_error(&err);
                        PcmChunk::silence()
                    }
                }
            }

            SchedulerState::Sounding { .. } => self.fill_sounding_chunk(&settings, mode),
        }
    }

    /// Fills one chunk from the active decoder, handling EOF (loop or rest)
    /// and applying the per-chunk amplitude.
    fn fill_sounding_chunk(&mut self, settings: &TrackSettings, mode: EffectiveMode) -> PcmChunk {
        let mut buf = vec![0i16; CHUNK_SIZE];
        let mut filled = 0usize;
        let mut samples_since_open = usize::MAX;

        while filled < CHUNK_SIZE {
            let source = match &mut self.state {
                SchedulerState::Sounding { source } => source,
                // A decode error mid-fill moved us to RESTING; ship what we
                // have, zero-padded.
                _ => break,
            };

            match source.read_into(&mut buf[filled..]) {
                Ok(0) => {
                    // Natural EOF.
                    if mode == EffectiveMode::Continuous && settings.seamless_loop {
                        // A reopened file that yields nothing would loop here
                        // forever; treat it like a decode failure.
                        if samples_since_open == 0 {
                            self.on_decode_error(&sonocodec::CodecError::Decode(
                                "file produced no samples".into(),
                            ));
                            break;
                        }
                        // Gapless: reopen and keep filling this very chunk.
                        match CanonicalSource::open(self.instance.recording()) {
                            Ok(next) => {
                                self.state = SchedulerState::Sounding { source: next };
                                samples_since_open = 0;
                            }
                            Err(err) => {
                                self.on_decode_error(&err);
                                break;
                            }
                        }
                    } else {
                        // The silent pad of this final chunk counts toward
                        // the rest that follows.
                        let padding = (CHUNK_SIZE - filled) as u64;
                        let gap = self.draw_rest(settings, mode);
                        self.enter_rest(gap.saturating_sub(padding));
                        break;
                    }
                }
                Ok(n) => {
                    filled += n;
                    samples_since_open = samples_since_open.saturating_add(n);
                }
                Err(err) => {
                    self.on_decode_error(&err);
                    break;
                }
            }
        }

        // Muted tracks advance cadence but emit zeros, which is what makes
        // unmuting phase-preserving and instantaneous.
        if settings.muted {
            return PcmChunk::silence();
        }

        let gain = match mode {
            EffectiveMode::Presence => settings.volume * settings.presence,
            _ => settings.volume,
        };
        crate::dsp::apply_gain(&mut buf[..filled], gain);
        PcmChunk::from_samples(buf)
    }

    fn draw_rest(&mut self, settings: &TrackSettings, mode: EffectiveMode) -> u64 {
        match mode {
            EffectiveMode::Continuous => (CONTINUOUS_GAP_SECS * SAMPLE_RATE as f64) as u64,
            EffectiveMode::Sparse | EffectiveMode::Presence => {
                draw_gap_samples(&mut self.rng, settings.presence)
            }
        }
    }

    fn enter_rest(&mut self, remaining_samples: u64) {
        // holds_gate is intentionally kept; next_chunk releases it on the
        // following tick.
        self.state = SchedulerState::Resting { remaining_samples };
    }

    fn on_decode_error(&mut self, err: &sonocodec::CodecError) {
        if !self.decode_error_logged {
            warn!(
                file = %self.instance.recording().path().display(),
                error = %err,
                "Decode failure, resting {} s",
                DECODE_ERROR_REST_SECS
            );
            self.decode_error_logged = true;
        } else {
            debug!(
                file = %self.instance.recording().path().display(),
                error = %err,
                "Decode failure (repeat)"
            );
        }
        self.enter_rest((DECODE_ERROR_REST_SECS * SAMPLE_RATE as f64) as u64);
    }

    /// Permanently silences this scheduler. Reached only when the owning
    /// instance is disabled or removed; the decoder is dropped, the
    /// exclusive slot freed, and the caller replaces the scheduler if the
    /// instance ever comes back.
    pub fn terminate(&mut self) {
        if self.holds_gate {
            self.gate.release(self.index);
            self.holds_gate = false;
        }
        self.state = SchedulerState::Terminated;
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SchedulerState::Terminated)
    }
}

fn resolve_mode(mode: PlaybackMode, duration_secs: f64, threshold: f64) -> EffectiveMode {
    match mode {
        PlaybackMode::Continuous => EffectiveMode::Continuous,
        PlaybackMode::Sparse => EffectiveMode::Sparse,
        PlaybackMode::Presence => EffectiveMode::Presence,
        PlaybackMode::Auto => {
            if duration_secs < threshold {
                EffectiveMode::Sparse
            } else {
                EffectiveMode::Continuous
            }
        }
    }
}

/// Draws one exponential rest, in samples.
///
/// The mean scales inversely with presence:
/// `base_gap * (1 - presence) / max(presence, eps)`, clamped to
/// [5 s, 15 min]. Individual draws are floored at 1 s.
fn draw_gap_samples(rng: &mut SmallRng, presence: f64) -> u64 {
    let presence = presence.clamp(0.0, 1.0);
    let mean = BASE_GAP_SECS * (1.0 - presence) / presence.max(PRESENCE_EPSILON);
    let mean = mean.clamp(MIN_MEAN_GAP_SECS, MAX_MEAN_GAP_SECS);

    let u: f64 = rng.random();
    let gap_secs = (-mean * (1.0 - u).ln()).max(MIN_GAP_SECS);
    (gap_secs * SAMPLE_RATE as f64) as u64
}

/// Deterministic seed from (listener, theme, recording path).
pub fn cadence_seed(listener_id: u64, theme_id: &str, recording_path: &std::path::Path) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    listener_id.hash(&mut hasher);
    theme_id.hash(&mut hasher);
    recording_path.hash(&mut hasher);
    hasher.finish()
}
