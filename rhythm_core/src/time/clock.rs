use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF64;

/// What the audio side reports at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClockReading {
    /// Playback position in seconds, `None` while audio is not playing.
    pub audio_position: Option<f64>,
    pub audio_finished: bool,
}

impl ClockReading {
    pub fn playing(position: f64) -> Self {
        Self {
            audio_position: Some(position),
            audio_finished: false,
        }
    }

    /// No audio available; song time falls back to wall-clock deltas.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn finished() -> Self {
        Self {
            audio_position: None,
            audio_finished: true,
        }
    }
}

/// Non-blocking source of the playback position.
pub trait PlaybackClock {
    fn read(&self) -> ClockReading;
}

impl PlaybackClock for ClockReading {
    fn read(&self) -> ClockReading {
        *self
    }
}

/// Playback state published by an audio thread and read by the tick loop.
#[derive(Clone)]
pub struct SharedPlaybackClock {
    position: Arc<AtomicF64>,
    playing: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl SharedPlaybackClock {
    pub fn new() -> Self {
        Self {
            position: Arc::new(AtomicF64::new(0.0)),
            playing: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_position(&self, seconds: f64) {
        self.position.store(seconds, Ordering::Release);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    /// Marks the track as played to the end; playback stops.
    pub fn mark_finished(&self) {
        self.playing.store(false, Ordering::Release);
        self.finished.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.position.store(0.0, Ordering::Release);
        self.playing.store(false, Ordering::Release);
        self.finished.store(false, Ordering::Release);
    }
}

impl Default for SharedPlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for SharedPlaybackClock {
    fn read(&self) -> ClockReading {
        let playing = self.playing.load(Ordering::Acquire);
        ClockReading {
            audio_position: playing.then(|| self.position.load(Ordering::Acquire)),
            audio_finished: self.finished.load(Ordering::Acquire),
        }
    }
}
