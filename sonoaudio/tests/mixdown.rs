//! Mixdown engine invariants: normalization, clipping bound, gain
//! monotonicity, hot control-plane edits.

mod common;

use std::sync::Arc;

use sonoaudio::{Mixer, CHUNK_SIZE};
use sonotheme::{PlaybackMode, ThemeRegistry, TrackPatch};

/// Builds a theme folder on disk and opens a registry over it.
fn registry_with_theme(
    dir: &std::path::Path,
    theme: &str,
    files: &[(&str, Vec<i16>)],
) -> Arc<ThemeRegistry> {
    let folder = dir.join(theme);
    std::fs::create_dir_all(&folder).unwrap();
    for (name, samples) in files {
        common::write_wav(&folder.join(name), 44_100, 1, samples);
    }
    Arc::new(ThemeRegistry::open(dir.to_path_buf()).unwrap())
}

fn set_all_continuous(theme: &sonotheme::ThemeDefinition) {
    for track in theme.tracks() {
        track.apply_patch(&TrackPatch {
            playback_mode: Some(PlaybackMode::Continuous),
            seamless_loop: Some(true),
            ..Default::default()
        });
    }
}

#[test]
fn mixer_output_is_always_chunk_sized_and_clamped() {
    let dir = tempfile::tempdir().unwrap();
    // Two full-scale tracks: sum 65534, /sqrt(2) ≈ 46340 → clipped.
    let registry = registry_with_theme(
        dir.path(),
        "Loud",
        &[
            ("a.wav", common::constant(1.0, 32_767)),
            ("b.wav", common::constant(1.0, 32_767)),
        ],
    );
    let theme = registry.get("loud").unwrap();
    set_all_continuous(&theme);
    theme.set_master_gain(1.0).unwrap();

    let mut mixer = Mixer::new(theme, 1);
    for _ in 0..20 {
        let chunk = mixer.next_chunk();
        assert_eq!(chunk.samples().len(), CHUNK_SIZE);
        for &s in chunk.samples() {
            assert!((-32_768..=32_767).contains(&(s as i32)));
        }
        // The clip actually engages: peaks sit at the rail.
        assert_eq!(*chunk.samples().iter().max().unwrap(), 32_767);
    }
}

#[test]
fn single_track_rms_survives_the_mix() {
    let dir = tempfile::tempdir().unwrap();
    let sine = common::sine_440(2.0, 16_000.0);
    let input_rms = common::rms(&sine);
    let registry = registry_with_theme(dir.path(), "Sine", &[("tone.wav", sine)]);
    let theme = registry.get("sine").unwrap();
    set_all_continuous(&theme);
    theme.set_master_gain(1.0).unwrap();

    let mut mixer = Mixer::new(theme, 1);
    let mut output = Vec::new();
    for _ in 0..50 {
        output.extend_from_slice(mixer.next_chunk().samples());
    }
    let output_rms = common::rms(&output);

    // N = 1, master gain 1.0: the pipeline must be transparent to ±1 dB.
    let ratio_db = 20.0 * (output_rms / input_rms).log10();
    assert!(
        ratio_db.abs() < 1.0,
        "RMS drifted by {:.2} dB (in {:.0}, out {:.0})",
        ratio_db,
        input_rms,
        output_rms
    );
}

#[test]
fn master_gain_doubles_peak_below_clipping() {
    let dir = tempfile::tempdir().unwrap();
    let registry =
        registry_with_theme(dir.path(), "Quiet", &[("tone.wav", common::constant(1.0, 1000))]);
    let theme = registry.get("quiet").unwrap();
    set_all_continuous(&theme);

    theme.set_master_gain(1.0).unwrap();
    let mut mixer = Mixer::new(theme.clone(), 1);
    let peak_1 = *mixer.next_chunk().samples().iter().max().unwrap();

    theme.set_master_gain(2.0).unwrap();
    let peak_2 = *mixer.next_chunk().samples().iter().max().unwrap();

    assert_eq!(peak_1, 1000);
    assert_eq!(peak_2, 2000);
}

#[test]
fn disabling_a_track_terminates_its_scheduler() {
    let dir = tempfile::tempdir().unwrap();
    let registry =
        registry_with_theme(dir.path(), "Mix", &[("tone.wav", common::constant(1.0, 5000))]);
    let theme = registry.get("mix").unwrap();
    set_all_continuous(&theme);

    let mut mixer = Mixer::new(theme.clone(), 1);
    assert!(!mixer.next_chunk().is_silent());
    assert!(!mixer.schedulers()[0].is_terminated());

    // A real disable event, as posted through the control plane.
    theme.tracks()[0].set_enabled(false);
    assert!(mixer.next_chunk().is_silent());
    assert!(
        mixer.schedulers()[0].is_terminated(),
        "disable must drive the scheduler to TERMINATED"
    );
    // Terminated stays terminated while disabled.
    assert!(mixer.next_chunk().is_silent());
    assert!(mixer.schedulers()[0].is_terminated());

    // Re-enable: the dead scheduler is replaced and audio resumes on the
    // next tick.
    theme.tracks()[0].set_enabled(true);
    assert!(!mixer.next_chunk().is_silent());
    assert!(!mixer.schedulers()[0].is_terminated());
}

#[test]
fn no_enabled_tracks_means_silence() {
    let dir = tempfile::tempdir().unwrap();
    let registry =
        registry_with_theme(dir.path(), "Mix", &[("tone.wav", common::constant(1.0, 5000))]);
    let theme = registry.get("mix").unwrap();
    set_all_continuous(&theme);

    let mut mixer = Mixer::new(theme.clone(), 1);
    assert!(!mixer.next_chunk().is_silent());

    theme.tracks()[0].set_enabled(false);
    let chunk = mixer.next_chunk();
    assert_eq!(chunk.samples().len(), CHUNK_SIZE);
    assert!(chunk.is_silent());
}

#[test]
fn hot_volume_change_lands_on_the_next_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let registry =
        registry_with_theme(dir.path(), "Mix", &[("tone.wav", common::constant(2.0, 8000))]);
    let theme = registry.get("mix").unwrap();
    set_all_continuous(&theme);
    theme.set_master_gain(1.0).unwrap();

    let mut mixer = Mixer::new(theme.clone(), 1);
    assert!(!mixer.next_chunk().is_silent());

    // The edit a listener would POST mid-stream.
    registry
        .update_track(
            "mix",
            "tone.wav",
            &TrackPatch {
                volume: Some(0.0),
                ..Default::default()
            },
        )
        .unwrap();

    // Very next chunk is already silent: chunk-granularity latency.
    assert!(mixer.next_chunk().is_silent());
}

#[test]
fn listeners_do_not_share_mixer_state() {
    let dir = tempfile::tempdir().unwrap();
    let registry =
        registry_with_theme(dir.path(), "Mix", &[("tone.wav", common::constant(1.0, 4000))]);
    let theme = registry.get("mix").unwrap();
    set_all_continuous(&theme);
    theme.set_master_gain(1.0).unwrap();

    let mut mixer_a = Mixer::new(theme.clone(), 1);
    let mut mixer_b = Mixer::new(theme, 2);

    // Drain most of a's 1 s file; if decoders were shared, b's first chunk
    // would start near EOF and come back padded or silent.
    for _ in 0..10 {
        let _ = mixer_a.next_chunk();
    }
    let first_b = mixer_b.next_chunk();
    assert!(first_b.samples().iter().all(|&s| s == 4000));
}
