use serde::{Deserialize, Serialize};
use std::fmt;

pub type Milliseconds = i32;

/// Horizontal extent of the playfield that hit object `x` values are laid out on.
pub const PLAYFIELD_WIDTH: f64 = 512.0;
pub const DEFAULT_KEY_COUNT: usize = 4;

pub const SIMPLE_NOTE_FLAG: i32 = 1;
pub const LONG_NOTE_FLAG: i32 = 128;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct General {
    pub audio_filename: String,
    pub audio_lead_in: Milliseconds,
    pub preview_time: Milliseconds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub creator: String,
    /// Difficulty name (Easy, Normal, Hard, ...).
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub hp_drain_rate: f64,
    pub circle_size: f64,
    pub overall_difficulty: f64,
    pub approach_rate: f64,
    pub slider_multiplier: f64,
    pub slider_tick_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    pub time: Milliseconds,
    /// Milliseconds per beat.
    pub beat_length: f64,
    pub meter: i32,
    pub sample_set: i32,
    pub sample_index: i32,
    pub volume: i32,
    /// `true` starts a new tempo, `false` only changes scroll speed.
    pub uninherited: bool,
    pub effects: i32,
}

impl TimingPoint {
    pub fn bpm(&self) -> f64 {
        60_000.0 / self.beat_length
    }
}

/// Hit object fields exactly as they appear in a source row, before the lane
/// is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHitObject {
    pub x: i32,
    pub y: i32,
    pub time: Milliseconds,
    pub kind: i32,
    pub hit_sound: i32,
    pub end_time: Option<Milliseconds>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitObject {
    x: i32,
    y: i32,
    time: Milliseconds,
    #[serde(rename = "type")]
    kind: i32,
    hit_sound: i32,
    end_time: Milliseconds,
    lane: usize,
    long_note: bool,
}

impl HitObject {
    pub fn new(raw: RawHitObject, key_count: usize) -> Self {
        let long_note = raw.kind & LONG_NOTE_FLAG != 0;
        Self {
            x: raw.x,
            y: raw.y,
            time: raw.time,
            kind: raw.kind,
            hit_sound: raw.hit_sound,
            // Only long notes carry an end time.
            end_time: if long_note { raw.end_time.unwrap_or(0) } else { 0 },
            lane: lane_for_x(raw.x, key_count),
            long_note,
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// Moment the note must be hit.
    pub fn time(&self) -> Milliseconds {
        self.time
    }

    pub fn kind(&self) -> i32 {
        self.kind
    }

    pub fn hit_sound(&self) -> i32 {
        self.hit_sound
    }

    /// End of a long note; 0 for simple notes.
    pub fn end_time(&self) -> Milliseconds {
        self.end_time
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    pub fn is_long_note(&self) -> bool {
        self.long_note
    }

    pub fn time_secs(&self) -> f64 {
        self.time as f64 / 1000.0
    }
}

impl fmt::Display for HitObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.long_note {
            write!(f, "LN: lane {}, time {}-{}ms", self.lane, self.time, self.end_time)
        } else {
            write!(f, "Note: lane {}, time {}ms", self.lane, self.time)
        }
    }
}

/// Maps a raw `x` position onto one of `key_count` equally wide columns.
///
/// Values past either edge are clamped into the outermost lanes.
pub fn lane_for_x(x: i32, key_count: usize) -> usize {
    let key_count = key_count.max(1);
    let column_width = PLAYFIELD_WIDTH / key_count as f64;
    let lane = (x as f64 / column_width).floor();
    if lane < 0.0 {
        0
    } else {
        (lane as usize).min(key_count - 1)
    }
}

/// A loaded chart. Read-only once built; use [`BeatmapBuilder`] to assemble one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beatmap {
    general: General,
    metadata: Metadata,
    difficulty: Difficulty,
    key_count: usize,
    timing_points: Vec<TimingPoint>,
    hit_objects: Vec<HitObject>,
}

impl Beatmap {
    pub fn builder() -> BeatmapBuilder {
        BeatmapBuilder::new()
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Timing points in source order.
    pub fn timing_points(&self) -> &[TimingPoint] {
        &self.timing_points
    }

    /// Hit objects sorted ascending by time; equal times keep source order.
    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects
    }

    pub fn note_count(&self) -> usize {
        self.hit_objects.len()
    }

    pub fn long_note_count(&self) -> usize {
        self.hit_objects.iter().filter(|h| h.is_long_note()).count()
    }

    /// Latest moment any note needs attention, counting long note tails.
    pub fn last_note_time(&self) -> Option<Milliseconds> {
        self.hit_objects
            .iter()
            .map(|h| h.time().max(h.end_time()))
            .max()
    }

    /// Slowest and fastest tempo among uninherited timing points.
    pub fn bpm_range(&self) -> Option<(f64, f64)> {
        self.timing_points
            .iter()
            .filter(|tp| tp.uninherited && tp.beat_length > 0.0)
            .map(TimingPoint::bpm)
            .fold(None, |range, bpm| match range {
                None => Some((bpm, bpm)),
                Some((lo, hi)) => Some((lo.min(bpm), hi.max(bpm))),
            })
    }
}

impl fmt::Display for Beatmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} [{}]",
            self.metadata.title, self.metadata.artist, self.metadata.version
        )
    }
}

/// Mutable staging area for a [`Beatmap`].
///
/// Lanes are derived in [`BeatmapBuilder::build`], so the key count may be set
/// after hit objects have been added.
#[derive(Debug, Clone)]
pub struct BeatmapBuilder {
    pub general: General,
    pub metadata: Metadata,
    pub difficulty: Difficulty,
    pub key_count: usize,
    timing_points: Vec<TimingPoint>,
    hit_objects: Vec<RawHitObject>,
}

impl Default for BeatmapBuilder {
    fn default() -> Self {
        Self {
            general: General::default(),
            metadata: Metadata::default(),
            difficulty: Difficulty::default(),
            key_count: DEFAULT_KEY_COUNT,
            timing_points: Vec::new(),
            hit_objects: Vec::new(),
        }
    }
}

impl BeatmapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_timing_point(&mut self, timing_point: TimingPoint) {
        self.timing_points.push(timing_point);
    }

    pub fn add_hit_object(&mut self, hit_object: RawHitObject) {
        self.hit_objects.push(hit_object);
    }

    pub fn hit_object_count(&self) -> usize {
        self.hit_objects.len()
    }

    /// Seals the beatmap: derives lanes and stable-sorts hit objects by time.
    pub fn build(self) -> Beatmap {
        let key_count = self.key_count.max(1);
        let mut hit_objects: Vec<HitObject> = self
            .hit_objects
            .into_iter()
            .map(|raw| HitObject::new(raw, key_count))
            .collect();
        hit_objects.sort_by_key(HitObject::time);

        Beatmap {
            general: self.general,
            metadata: self.metadata,
            difficulty: self.difficulty,
            key_count,
            timing_points: self.timing_points,
            hit_objects,
        }
    }
}
