//! Mixdown engine: sums the schedulers of one listener into a single
//! canonical chunk per tick.

use std::sync::Arc;

use sonotheme::ThemeDefinition;

use crate::{
    chunk::PcmChunk,
    scheduler::{cadence_seed, ExclusiveGate, TrackScheduler},
    CHUNK_SIZE,
};

/// Per-listener mixdown over one pinned theme definition.
///
/// Normalization rule: sum in floating point, divide by `sqrt(N)` with `N`
/// the number of enabled schedulers, multiply by the theme's master gain,
/// clamp to i16. `1/sqrt(N)` lets perceived loudness grow sub-linearly in
/// track count while bounding peaks; the master gain (default 6.0) restores
/// headroom and is the user-visible volume knob.
pub struct Mixer {
    theme: Arc<ThemeDefinition>,
    listener_id: u64,
    gate: Arc<ExclusiveGate>,
    schedulers: Vec<TrackScheduler>,
    acc: Vec<f32>,
}

impl Mixer {
    pub fn new(theme: Arc<ThemeDefinition>, listener_id: u64) -> Self {
        let gate = Arc::new(ExclusiveGate::new());
        let schedulers = (0..theme.tracks().len())
            .map(|index| make_scheduler(&theme, listener_id, index, &gate))
            .collect();

        Self {
            theme,
            listener_id,
            gate,
            schedulers,
            acc: vec![0.0; CHUNK_SIZE],
        }
    }

    pub fn theme(&self) -> &Arc<ThemeDefinition> {
        &self.theme
    }

    /// The per-track schedulers, in track insertion order.
    pub fn schedulers(&self) -> &[TrackScheduler] {
        &self.schedulers
    }

    /// One mixdown tick: pulls a chunk from every enabled scheduler and
    /// produces exactly one output chunk.
    ///
    /// A disabled instance terminates its scheduler (decoder dropped,
    /// exclusive slot freed); on re-enable the dead scheduler is replaced
    /// by a fresh one over the same instance and seed.
    pub fn next_chunk(&mut self) -> PcmChunk {
        self.acc.fill(0.0);
        let mut enabled = 0usize;

        for (index, scheduler) in self.schedulers.iter_mut().enumerate() {
            if !scheduler.instance().is_enabled() {
                scheduler.terminate();
                continue;
            }
            if scheduler.is_terminated() {
                *scheduler = make_scheduler(&self.theme, self.listener_id, index, &self.gate);
            }
            enabled += 1;
            let chunk = scheduler.next_chunk();
            for (acc, &s) in self.acc.iter_mut().zip(chunk.samples()) {
                *acc += s as f32;
            }
        }

        if enabled == 0 {
            return PcmChunk::silence();
        }

        let scale = (1.0 / (enabled as f32).sqrt()) * self.theme.master_gain() as f32;
        let samples = self
            .acc
            .iter()
            .map(|&a| (a * scale).round().clamp(-32768.0, 32767.0) as i16)
            .collect();
        PcmChunk::from_samples(samples)
    }
}

fn make_scheduler(
    theme: &Arc<ThemeDefinition>,
    listener_id: u64,
    index: usize,
    gate: &Arc<ExclusiveGate>,
) -> TrackScheduler {
    let track = &theme.tracks()[index];
    let seed = cadence_seed(listener_id, theme.id(), track.recording().path());
    TrackScheduler::new(
        track.clone(),
        theme.short_file_threshold(),
        seed,
        index,
        gate.clone(),
    )
}
