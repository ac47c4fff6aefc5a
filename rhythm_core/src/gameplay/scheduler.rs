use std::sync::Arc;

use beatmap_schema::Beatmap;
use serde::{Deserialize, Serialize};

use super::judge::{JudgeMachine, Judgment, JudgmentResult};

/// Index of a hit object in [`Beatmap::hit_objects`].
pub type NoteId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub lane_count: usize,
    /// Seconds a note is live before its hit time.
    pub approach_time: f64,
    pub spawn_distance: f64,
    pub hit_position: f64,
    /// How far (position units) a note may travel past the hit position before it expires.
    pub miss_overshoot: f64,
    /// Search radius (position units) around the hit position used for lane presses.
    pub input_search_distance: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lane_count: 4,
            approach_time: 2.0,
            spawn_distance: 40.0,
            hit_position: 0.0,
            miss_overshoot: 2.0,
            input_search_distance: 10.0,
        }
    }
}

impl SchedulerConfig {
    /// Position units travelled per second of song time.
    pub fn note_speed(&self) -> f64 {
        (self.spawn_distance - self.hit_position) / self.approach_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved by player input.
    Judged(Judgment),
    /// Travelled past the hit position unhit.
    Expired,
    /// Dropped by [`NoteScheduler::clear_all`] without a judgment.
    Discarded,
    /// Never spawned because its lane is outside the configured lane count.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Pending,
    Live,
    Resolved(Resolution),
}

/// Runtime view of a spawned note.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveNote {
    id: NoteId,
    lane: usize,
    hit_time: f64,
    end_time: Option<f64>,
    spawn_time: f64,
    hit_position: f64,
    speed: f64,
}

impl LiveNote {
    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Hit time in seconds.
    pub fn hit_time(&self) -> f64 {
        self.hit_time
    }

    /// Song time at which the note was spawned.
    pub fn spawn_time(&self) -> f64 {
        self.spawn_time
    }

    pub fn position_at(&self, song_time: f64) -> f64 {
        self.hit_position + (self.hit_time - song_time) * self.speed
    }

    pub fn timing_difference(&self, song_time: f64) -> f64 {
        song_time - self.hit_time
    }

    /// Length of a long note's tail in position units; 0 for simple notes.
    pub fn tail_length(&self) -> f64 {
        self.end_time
            .map(|end| (end - self.hit_time).max(0.0) * self.speed)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissedNote {
    pub id: NoteId,
    pub lane: usize,
    pub result: JudgmentResult,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerTick {
    pub spawned: Vec<NoteId>,
    pub missed: Vec<MissedNote>,
}

pub struct NoteScheduler {
    beatmap: Arc<Beatmap>,
    config: SchedulerConfig,
    states: Vec<NoteState>,
    lanes: Vec<Vec<LiveNote>>,
    spawn_cursor: usize,
    song_time: f64,
}

impl NoteScheduler {
    pub fn new(beatmap: Arc<Beatmap>, config: SchedulerConfig) -> Self {
        let note_count = beatmap.note_count();
        Self {
            beatmap,
            config,
            states: vec![NoteState::Pending; note_count],
            lanes: vec![Vec::new(); config.lane_count],
            spawn_cursor: 0,
            song_time: 0.0,
        }
    }

    pub fn beatmap(&self) -> &Arc<Beatmap> {
        &self.beatmap
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Index of the next hit object waiting to spawn.
    pub fn spawn_cursor(&self) -> usize {
        self.spawn_cursor
    }

    /// Song time of the last spawn/expiry pass.
    pub fn song_time(&self) -> f64 {
        self.song_time
    }

    pub fn state(&self, id: NoteId) -> Option<NoteState> {
        self.states.get(id).copied()
    }

    pub fn live_count(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    /// Live notes of one lane in spawn order.
    pub fn live_notes(&self, lane: usize) -> &[LiveNote] {
        self.lanes.get(lane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &LiveNote> {
        self.lanes.iter().flatten()
    }

    /// True once nothing is left to spawn and nothing is live.
    pub fn is_exhausted(&self) -> bool {
        self.spawn_cursor >= self.states.len() && self.live_count() == 0
    }

    pub fn tick(&mut self, song_time: f64, judge: &mut JudgeMachine) -> SchedulerTick {
        let spawned = self.spawn_due(song_time);
        let mut missed = Vec::new();
        while let Some(miss) = self.expire_next(song_time, judge) {
            missed.push(miss);
        }
        SchedulerTick { spawned, missed }
    }

    /// Spawns every note whose approach has begun by `song_time`.
    ///
    /// The cursor only moves forward, so hit objects must be sorted by time.
    pub fn spawn_due(&mut self, song_time: f64) -> Vec<NoteId> {
        self.song_time = song_time;
        let speed = self.config.note_speed();
        let mut spawned = Vec::new();

        while let Some(hit_object) = self.beatmap.hit_objects().get(self.spawn_cursor) {
            let hit_time = hit_object.time_secs();
            if song_time < hit_time - self.config.approach_time {
                break;
            }

            let id = self.spawn_cursor;
            self.spawn_cursor += 1;

            let lane = hit_object.lane();
            let Some(live) = self.lanes.get_mut(lane) else {
                log::warn!(
                    "invalid lane {lane} for note at {}ms; {} lanes configured",
                    hit_object.time(),
                    self.config.lane_count
                );
                self.states[id] = NoteState::Resolved(Resolution::Rejected);
                continue;
            };

            live.push(LiveNote {
                id,
                lane,
                hit_time,
                end_time: hit_object
                    .is_long_note()
                    .then(|| f64::from(hit_object.end_time()) / 1000.0),
                spawn_time: song_time,
                hit_position: self.config.hit_position,
                speed,
            });
            self.states[id] = NoteState::Live;
            spawned.push(id);
            log::debug!("spawned {hit_object} at song time {song_time:.3}");
        }

        spawned
    }

    /// Expires the earliest live note that has passed the hit position by more
    /// than the overshoot margin, judging it as a Miss.
    pub fn expire_next(
        &mut self,
        song_time: f64,
        judge: &mut JudgeMachine,
    ) -> Option<MissedNote> {
        self.song_time = song_time;
        let limit = self.config.hit_position - self.config.miss_overshoot;

        let mut oldest: Option<(usize, usize, f64)> = None;
        for (lane, notes) in self.lanes.iter().enumerate() {
            for (slot, note) in notes.iter().enumerate() {
                if note.position_at(song_time) >= limit {
                    continue;
                }
                if oldest.map_or(true, |(_, _, t)| note.hit_time < t) {
                    oldest = Some((lane, slot, note.hit_time));
                }
            }
        }

        let (lane, slot, _) = oldest?;
        let note = self.lanes[lane].remove(slot);
        self.states[note.id] = NoteState::Resolved(Resolution::Expired);
        log::debug!("note {} in lane {lane} expired unhit", note.id);

        Some(MissedNote {
            id: note.id,
            lane,
            result: judge.judge_miss(),
        })
    }

    /// Live note in `lane` whose current position is nearest `reference_position`,
    /// within `max_distance`. Equal distances keep the first note in spawn order.
    pub fn closest_live_note_in_lane(
        &self,
        lane: usize,
        reference_position: f64,
        max_distance: f64,
    ) -> Option<&LiveNote> {
        let mut best: Option<(&LiveNote, f64)> = None;
        for note in self.live_notes(lane) {
            let distance = (note.position_at(self.song_time) - reference_position).abs();
            if distance > max_distance {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((note, distance));
            }
        }
        best.map(|(note, _)| note)
    }

    /// Resolves a live note from player input. Returns `false` (and changes
    /// nothing) if the note is not live.
    pub fn resolve_hit(&mut self, id: NoteId, result: &JudgmentResult) -> bool {
        if self.state(id) != Some(NoteState::Live) {
            return false;
        }
        let lane = self.beatmap.hit_objects()[id].lane();
        let Some(notes) = self.lanes.get_mut(lane) else {
            return false;
        };
        let Some(slot) = notes.iter().position(|n| n.id == id) else {
            return false;
        };
        notes.remove(slot);
        self.states[id] = NoteState::Resolved(Resolution::Judged(result.judgment));
        true
    }

    /// Drops every live note without judging it. Returns how many were dropped.
    pub fn clear_all(&mut self) -> usize {
        let mut cleared = 0;
        for notes in &mut self.lanes {
            for note in notes.drain(..) {
                self.states[note.id] = NoteState::Resolved(Resolution::Discarded);
                cleared += 1;
            }
        }
        log::debug!("cleared {cleared} live notes");
        cleared
    }

    /// Moves the spawn cursor to the end; pending notes never spawn.
    pub fn stop_spawning(&mut self) {
        self.spawn_cursor = self.states.len();
        log::debug!("spawning stopped");
    }

    pub fn reset(&mut self) {
        for notes in &mut self.lanes {
            notes.clear();
        }
        self.states.fill(NoteState::Pending);
        self.spawn_cursor = 0;
        self.song_time = 0.0;
    }
}
