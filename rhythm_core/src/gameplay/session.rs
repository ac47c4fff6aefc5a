use std::sync::Arc;

use beatmap_schema::Beatmap;
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::health::HealthBar;
use super::judge::{JudgeMachine, JudgmentResult};
use super::scheduler::{NoteId, NoteScheduler};
use super::stats::SessionStats;
use crate::config::{SessionSettings, SettingsError};
use crate::input::events::LaneInput;
use crate::input::InputQueue;
use crate::time::clock::PlaybackClock;
use crate::time::conductor::Conductor;

/// Everything a run needs, passed in by the caller at start.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub beatmap: Arc<Beatmap>,
    pub settings: SessionSettings,
}

impl SessionConfig {
    pub fn new(beatmap: Arc<Beatmap>) -> Self {
        Self {
            beatmap,
            settings: SessionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
    Paused,
    Ended(EndReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Judgment {
        note: NoteId,
        lane: usize,
        result: JudgmentResult,
    },
    ComboChanged(u32),
    /// Health normalized to `0..=1`.
    HealthChanged(f64),
    EmptyPress {
        lane: usize,
    },
    SessionEnded {
        reason: EndReason,
        stats: SessionStats,
    },
}

/// Receives session events synchronously, in emission order, within the tick
/// that produced them.
pub trait SessionObserver {
    /// Returns `false` once the observer is gone; it is then dropped.
    fn on_event(&mut self, event: &SessionEvent) -> bool {
        match event {
            SessionEvent::Judgment { result, .. } => self.on_judgment(result),
            SessionEvent::ComboChanged(combo) => self.on_combo_change(*combo),
            SessionEvent::HealthChanged(health) => self.on_health_change(*health),
            SessionEvent::SessionEnded { reason, stats } => {
                self.on_session_ended(*reason, stats)
            }
            SessionEvent::StateChanged(_) | SessionEvent::EmptyPress { .. } => {}
        }
        true
    }

    fn on_judgment(&mut self, _result: &JudgmentResult) {}

    fn on_combo_change(&mut self, _combo: u32) {}

    fn on_health_change(&mut self, _normalized: f64) {}

    fn on_session_ended(&mut self, _reason: EndReason, _stats: &SessionStats) {}
}

impl SessionObserver for Sender<SessionEvent> {
    fn on_event(&mut self, event: &SessionEvent) -> bool {
        if self.send(event.clone()).is_err() {
            log::debug!("event receiver dropped, unsubscribing");
            return false;
        }
        true
    }
}

struct Run {
    settings: SessionSettings,
    judge: JudgeMachine,
    scheduler: NoteScheduler,
    conductor: Conductor,
    health: HealthBar,
    /// Seconds the audio has been reporting finished.
    finished_for: f64,
    audio_seen: bool,
}

pub struct SessionController {
    state: SessionState,
    run: Option<Run>,
    stats: SessionStats,
    inputs: InputQueue,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            run: None,
            stats: SessionStats::default(),
            inputs: InputQueue::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Registers a channel observer and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.add_observer(Box::new(tx));
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn song_time(&self) -> f64 {
        self.stats.song_time
    }

    pub fn scheduler(&self) -> Option<&NoteScheduler> {
        self.run.as_ref().map(|run| &run.scheduler)
    }

    pub fn judge(&self) -> Option<&JudgeMachine> {
        self.run.as_ref().map(|run| &run.judge)
    }

    /// Sender for lane presses coming from another thread. Presses are judged
    /// on the next tick while playing and discarded otherwise.
    pub fn input_sender(&self) -> Sender<LaneInput> {
        self.inputs.sender()
    }

    /// Starts (or restarts) a run from the top of the chart.
    ///
    /// The scheduler gets one lane per beatmap key. Invalid settings leave the
    /// controller untouched.
    pub fn start(&mut self, config: SessionConfig) -> Result<(), SettingsError> {
        let SessionConfig {
            beatmap,
            mut settings,
        } = config;
        settings.validate()?;

        let key_count = beatmap.key_count();
        if settings.scheduler.lane_count != key_count {
            log::info!(
                "{key_count} key chart, using {key_count} lanes instead of {}",
                settings.scheduler.lane_count
            );
            settings.scheduler.lane_count = key_count;
        }
        log::info!("song started: {beatmap} ({} notes)", beatmap.note_count());

        let mut judge = JudgeMachine::new(settings.judgment);
        judge.reset_stats();
        let mut scheduler = NoteScheduler::new(beatmap, settings.scheduler);
        scheduler.reset();
        let mut conductor = Conductor::new(settings.audio_offset);
        conductor.reset();
        let health = HealthBar::full(settings.health.max_health);

        self.inputs.clear();
        self.stats = SessionStats::new(health.max());
        self.stats.song_time = conductor.song_time();
        self.run = Some(Run {
            settings,
            judge,
            scheduler,
            conductor,
            health,
            finished_for: 0.0,
            audio_seen: false,
        });

        self.set_state(SessionState::Playing);
        self.emit(SessionEvent::HealthChanged(health.normalized()));
        Ok(())
    }

    /// Aborts the current run and returns to idle without a final result.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            log::debug!("stop ignored: already idle");
            return;
        }
        if let Some(mut run) = self.run.take() {
            run.scheduler.clear_all();
        }
        self.inputs.clear();
        log::info!(
            "song stopped at {:.3}s, score {}, health {:.1}",
            self.stats.song_time,
            self.stats.totals.total_score,
            self.stats.health
        );
        self.set_state(SessionState::Idle);
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            SessionState::Playing => self.set_state(SessionState::Paused),
            SessionState::Paused => {
                // Presses made while paused are never judged.
                self.inputs.clear();
                self.set_state(SessionState::Playing);
            }
            other => log::debug!("pause toggle ignored in {other:?}"),
        }
    }

    /// Queues a press for the next tick, after that tick has advanced song time.
    pub fn lane_input_down(&mut self, lane: usize) {
        if self.state != SessionState::Playing {
            log::debug!("lane {lane} press ignored in {:?}", self.state);
            return;
        }
        self.inputs.push(LaneInput { lane });
    }

    /// One frame: advance song time, spawn and expire notes, judge queued
    /// presses, then check for the end of the song.
    pub fn tick(&mut self, clock: &impl PlaybackClock, wall_delta: f64) {
        if self.state != SessionState::Playing {
            return;
        }
        let Some(mut run) = self.run.take() else {
            return;
        };

        let reading = clock.read();
        run.audio_seen |= reading.audio_position.is_some();
        let song_time = run.conductor.advance(&reading, wall_delta);
        self.stats.song_time = song_time;

        run.scheduler.spawn_due(song_time);
        while self.state == SessionState::Playing {
            let Some(missed) = run.scheduler.expire_next(song_time, &mut run.judge) else {
                break;
            };
            self.apply_judgment(&mut run, missed.id, missed.lane, missed.result);
        }

        for input in self.inputs.drain() {
            if self.state != SessionState::Playing {
                break;
            }
            self.resolve_press(&mut run, input.lane);
        }

        if self.state == SessionState::Playing
            && self.song_is_over(&mut run, reading.audio_finished, wall_delta)
        {
            self.end(&mut run, EndReason::Completed);
        }

        self.run = Some(run);
    }

    fn song_is_over(&self, run: &mut Run, audio_finished: bool, wall_delta: f64) -> bool {
        let settle = run.settings.end_settle_delay;
        if audio_finished {
            run.finished_for += wall_delta.max(0.0);
            return run.finished_for >= settle;
        }
        if run.audio_seen {
            return false;
        }

        // No audio at all: finish once the chart has played out.
        let last_note = run
            .scheduler
            .beatmap()
            .last_note_time()
            .map_or(0.0, |ms| f64::from(ms) / 1000.0);
        run.scheduler.is_exhausted() && self.stats.song_time >= last_note + settle
    }

    fn resolve_press(&mut self, run: &mut Run, lane: usize) {
        let song_time = run.conductor.song_time();
        let sched = run.settings.scheduler;
        let candidate = run
            .scheduler
            .closest_live_note_in_lane(lane, sched.hit_position, sched.input_search_distance)
            .map(|note| (note.id(), note.timing_difference(song_time)));

        match candidate {
            Some((id, diff)) if diff.abs() <= run.settings.hit_window => {
                let result = run.judge.judge(diff);
                run.scheduler.resolve_hit(id, &result);
                self.apply_judgment(run, id, lane, result);
            }
            Some((_, diff)) => {
                log::debug!("lane {lane}: note too far ({:.1}ms), empty press", diff * 1000.0);
                self.empty_press(run, lane);
            }
            None => {
                log::debug!("lane {lane}: no note in range, empty press");
                self.empty_press(run, lane);
            }
        }
    }

    fn apply_judgment(&mut self, run: &mut Run, note: NoteId, lane: usize, result: JudgmentResult) {
        self.stats.totals = run.judge.totals().clone();
        let combo = self.stats.totals.combo;
        self.emit(SessionEvent::Judgment { note, lane, result });
        self.emit(SessionEvent::ComboChanged(combo));

        let delta = run.settings.health.delta_for(result.judgment);
        self.change_health(run, delta);
    }

    fn empty_press(&mut self, run: &mut Run, lane: usize) {
        self.stats.empty_presses += 1;
        self.emit(SessionEvent::EmptyPress { lane });
        let penalty = run.settings.health.loss_per_empty_press;
        self.change_health(run, -penalty);
    }

    fn change_health(&mut self, run: &mut Run, delta: f64) {
        self.stats.health = run.health.apply(delta);
        self.emit(SessionEvent::HealthChanged(run.health.normalized()));

        if run.health.is_depleted() {
            log::warn!(
                "health depleted at {:.3}s, game over (score {})",
                self.stats.song_time,
                self.stats.totals.total_score
            );
            self.end(run, EndReason::GameOver);
        }
    }

    fn end(&mut self, run: &mut Run, reason: EndReason) {
        if reason == EndReason::GameOver {
            run.scheduler.stop_spawning();
            run.scheduler.clear_all();
        }
        self.inputs.clear();
        self.set_state(SessionState::Ended(reason));
        log::info!("run ended ({reason:?})\n{}", self.stats);
        self.emit(SessionEvent::SessionEnded {
            reason,
            stats: self.stats.clone(),
        });
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }
        log::info!("session {:?} -> {:?}", self.state, state);
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&mut self, event: SessionEvent) {
        self.observers.retain_mut(|observer| observer.on_event(&event));
    }
}
