use rhythm_core::time::clock::{ClockReading, PlaybackClock, SharedPlaybackClock};
use rhythm_core::time::conductor::Conductor;
use std::thread;

#[test]
fn test_conductor_follows_audio_position() {
    let mut conductor = Conductor::new(0.1);

    // Before any tick, song time sits one offset before zero
    assert!((conductor.song_time() + 0.1).abs() < 1e-9);

    // Audio at 1.0s -> song time 0.9s, wall delta is ignored
    let t = conductor.advance(&ClockReading::playing(1.0), 0.5);
    assert!((t - 0.9).abs() < 1e-9);

    // Audio jumps backwards (seek); song time follows it
    let t = conductor.advance(&ClockReading::playing(0.4), 0.016);
    assert!((t - 0.3).abs() < 1e-9);
}

#[test]
fn test_conductor_falls_back_to_wall_clock() {
    let mut conductor = Conductor::new(0.0);

    conductor.advance(&ClockReading::silent(), 0.25);
    conductor.advance(&ClockReading::silent(), 0.25);
    assert!((conductor.song_time() - 0.5).abs() < 1e-9);

    // Negative deltas never move time backwards
    conductor.advance(&ClockReading::silent(), -1.0);
    assert!((conductor.song_time() - 0.5).abs() < 1e-9);

    // Audio picks up again and takes over
    conductor.advance(&ClockReading::playing(2.0), 0.016);
    assert!((conductor.song_time() - 2.0).abs() < 1e-9);

    conductor.reset();
    assert_eq!(conductor.song_time(), 0.0);
    assert_eq!(conductor.audio_offset(), 0.0);
}

#[test]
fn test_shared_clock_reports_only_while_playing() {
    let clock = SharedPlaybackClock::new();
    assert_eq!(clock.read(), ClockReading::silent());

    clock.set_position(1.25);
    assert_eq!(clock.read().audio_position, None);

    clock.set_playing(true);
    assert_eq!(clock.read(), ClockReading::playing(1.25));

    clock.mark_finished();
    assert_eq!(clock.read(), ClockReading::finished());

    clock.reset();
    assert_eq!(clock.read(), ClockReading::silent());
}

#[test]
fn test_shared_clock_across_threads() {
    let clock = SharedPlaybackClock::default();
    let audio_side = clock.clone();

    // Simulate the audio callback publishing its position
    let handle = thread::spawn(move || {
        audio_side.set_playing(true);
        for frame in 1..=10 {
            audio_side.set_position(f64::from(frame) * 0.01);
        }
    });
    handle.join().unwrap();

    let mut conductor = Conductor::new(0.02);
    let t = conductor.advance(&clock.read(), 0.016);
    assert!((t - 0.08).abs() < 1e-9);
}
