use super::clock::ClockReading;

/// Turns clock readings into song time.
///
/// While audio plays, song time is the playback position minus the output
/// latency offset. Otherwise it advances by the wall-clock delta of each tick.
pub struct Conductor {
    audio_offset: f64,
    song_time: f64,
}

impl Conductor {
    pub fn new(audio_offset: f64) -> Self {
        Self {
            audio_offset,
            song_time: -audio_offset,
        }
    }

    pub fn reset(&mut self) {
        self.song_time = -self.audio_offset;
    }

    pub fn advance(&mut self, reading: &ClockReading, wall_delta: f64) -> f64 {
        match reading.audio_position {
            Some(position) => self.song_time = position - self.audio_offset,
            None => self.song_time += wall_delta.max(0.0),
        }
        self.song_time
    }

    pub fn song_time(&self) -> f64 {
        self.song_time
    }

    pub fn audio_offset(&self) -> f64 {
        self.audio_offset
    }
}
