use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use beatmap_schema::{Beatmap, RawHitObject, SIMPLE_NOTE_FLAG};
use rhythm_core::gameplay::judge::{Judgment, JudgmentResult};
use rhythm_core::gameplay::scheduler::{NoteState, Resolution};
use rhythm_core::gameplay::stats::SessionStats;
use rhythm_core::input::events::LaneInput;
use rhythm_core::time::clock::ClockReading;
use rhythm_core::{
    EndReason, SessionConfig, SessionController, SessionEvent, SessionObserver, SessionSettings,
    SessionState, SettingsError,
};

const SILENT: ClockReading = ClockReading {
    audio_position: None,
    audio_finished: false,
};

/// Notes as (lane, time in ms) on a 4 key chart.
fn beatmap(notes: &[(i32, i32)]) -> Arc<Beatmap> {
    let mut builder = Beatmap::builder();
    for &(lane, time) in notes {
        builder.add_hit_object(RawHitObject {
            x: lane * 128 + 64,
            y: 192,
            time,
            kind: SIMPLE_NOTE_FLAG,
            hit_sound: 0,
            end_time: None,
        });
    }
    Arc::new(builder.build())
}

fn settings() -> SessionSettings {
    SessionSettings {
        audio_offset: 0.0,
        ..SessionSettings::default()
    }
}

fn started(notes: &[(i32, i32)], settings: SessionSettings) -> SessionController {
    let mut session = SessionController::new();
    session
        .start(SessionConfig::new(beatmap(notes)).with_settings(settings))
        .unwrap();
    session
}

#[test]
fn test_start_emits_playing_and_full_health() {
    let mut session = SessionController::new();
    let events = session.subscribe();
    assert_eq!(session.state(), SessionState::Idle);

    session.start(SessionConfig::new(beatmap(&[(0, 1000)]))).unwrap();

    assert_eq!(session.state(), SessionState::Playing);
    assert!((session.song_time() + 0.1).abs() < 1e-9);
    let received: Vec<SessionEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            SessionEvent::StateChanged(SessionState::Playing),
            SessionEvent::HealthChanged(1.0),
        ]
    );
}

#[test]
fn test_hit_emits_judgment_combo_health_in_order() {
    let mut session = started(&[(0, 2000)], settings());
    let events = session.subscribe();

    session.lane_input_down(0);
    session.tick(&SILENT, 2.01);

    let received: Vec<SessionEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 3);
    match &received[0] {
        SessionEvent::Judgment { note, lane, result } => {
            assert_eq!((*note, *lane), (0, 0));
            assert_eq!(result.judgment, Judgment::Perfect);
            assert!((result.timing_difference - 0.01).abs() < 1e-9);
        }
        other => panic!("expected judgment, got {other:?}"),
    }
    assert_eq!(received[1], SessionEvent::ComboChanged(1));
    assert_eq!(received[2], SessionEvent::HealthChanged(1.0));

    let stats = session.stats();
    assert_eq!(stats.totals.perfect_count, 1);
    assert_eq!(stats.totals.total_score, 300);
    let scheduler = session.scheduler().unwrap();
    assert_eq!(
        scheduler.state(0),
        Some(NoteState::Resolved(Resolution::Judged(Judgment::Perfect)))
    );
}

#[test]
fn test_empty_press_only_costs_health() {
    let mut session = started(&[(0, 2000)], settings());
    let events = session.subscribe();

    session.tick(&SILENT, 0.5);
    // Lane 1 has no notes; the lane 0 note is still 30 units away.
    session.lane_input_down(1);
    session.lane_input_down(0);
    session.tick(&SILENT, 0.0);

    let stats = session.stats();
    assert_eq!(stats.empty_presses, 2);
    assert_eq!(stats.health, 96.0);
    assert_eq!(stats.totals.judged_notes, 0);
    assert_eq!(stats.totals.miss_count, 0);
    assert_eq!(stats.totals.combo, 0);
    assert_eq!(stats.totals.total_score, 0);

    let received: Vec<SessionEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            SessionEvent::EmptyPress { lane: 1 },
            SessionEvent::HealthChanged(0.98),
            SessionEvent::EmptyPress { lane: 0 },
            SessionEvent::HealthChanged(0.96),
        ]
    );
    assert_eq!(session.scheduler().unwrap().state(0), Some(NoteState::Live));
}

#[test]
fn test_press_outside_hit_window_leaves_note_live() {
    let mut session = started(&[(2, 2000)], settings());

    // 5 units away (inside the search radius) but 250ms early.
    session.tick(&SILENT, 1.75);
    session.lane_input_down(2);
    session.tick(&SILENT, 0.0);

    assert_eq!(session.stats().empty_presses, 1);
    assert_eq!(session.stats().totals.judged_notes, 0);
    assert_eq!(session.scheduler().unwrap().state(0), Some(NoteState::Live));
}

#[test]
fn test_second_press_on_same_note_is_empty() {
    let mut session = started(&[(3, 2000)], settings());

    session.lane_input_down(3);
    session.lane_input_down(3);
    session.tick(&SILENT, 2.0);

    let stats = session.stats();
    assert_eq!(stats.totals.perfect_count, 1);
    assert_eq!(stats.totals.judged_notes, 1);
    assert_eq!(stats.empty_presses, 1);
}

#[test]
fn test_presses_from_input_thread() {
    let mut session = started(&[(1, 1000)], settings());
    let sender = session.input_sender();

    std::thread::spawn(move || {
        sender.send(LaneInput { lane: 1 }).unwrap();
    })
    .join()
    .unwrap();

    session.tick(&SILENT, 1.03);
    assert_eq!(session.stats().totals.perfect_count, 1);
    assert_eq!(session.stats().totals.early_count, 0);
    assert_eq!(session.stats().totals.late_count, 1);
}

#[test]
fn test_game_over_stops_judging_and_clears_notes() {
    let mut settings = settings();
    settings.health.max_health = 10.0;
    settings.health.loss_per_miss = 5.0;
    let mut session = started(&[(0, 1000), (1, 1100), (2, 1200), (3, 5000)], settings);
    let events = session.subscribe();

    // All three early notes are past the miss line at 1.5s.
    session.tick(&SILENT, 1.5);

    assert_eq!(session.state(), SessionState::Ended(EndReason::GameOver));
    assert_eq!(session.stats().totals.miss_count, 2);
    assert_eq!(session.stats().health, 0.0);

    let scheduler = session.scheduler().unwrap();
    assert_eq!(scheduler.state(2), Some(NoteState::Resolved(Resolution::Discarded)));
    assert_eq!(scheduler.state(3), Some(NoteState::Pending));
    assert_eq!(scheduler.live_count(), 0);

    let received: Vec<SessionEvent> = events.try_iter().collect();
    let tail = &received[received.len() - 3..];
    assert_eq!(tail[0], SessionEvent::HealthChanged(0.0));
    assert_eq!(
        tail[1],
        SessionEvent::StateChanged(SessionState::Ended(EndReason::GameOver))
    );
    match &tail[2] {
        SessionEvent::SessionEnded { reason, stats } => {
            assert_eq!(*reason, EndReason::GameOver);
            assert_eq!(stats.totals.miss_count, 2);
        }
        other => panic!("expected session end, got {other:?}"),
    }

    // Nothing moves after the run ends.
    session.lane_input_down(3);
    session.tick(&SILENT, 10.0);
    assert!((session.song_time() - 1.5).abs() < 1e-9);
    assert!(events.try_iter().next().is_none());
}

#[test]
fn test_pause_freezes_time_and_drops_presses() {
    let mut session = started(&[(0, 3000)], settings());
    let sender = session.input_sender();
    session.tick(&SILENT, 0.5);

    session.toggle_pause();
    assert_eq!(session.state(), SessionState::Paused);
    session.lane_input_down(0);
    sender.send(LaneInput { lane: 0 }).unwrap();
    session.tick(&SILENT, 5.0);
    assert!((session.song_time() - 0.5).abs() < 1e-9);

    session.toggle_pause();
    assert_eq!(session.state(), SessionState::Playing);
    session.tick(&SILENT, 0.1);

    assert!((session.song_time() - 0.6).abs() < 1e-9);
    assert_eq!(session.stats().empty_presses, 0);
    assert_eq!(session.stats().health, 100.0);
}

#[test]
fn test_completes_without_audio_after_last_note() {
    let mut session = started(&[(0, 1000)], settings());
    let events = session.subscribe();

    session.lane_input_down(0);
    session.tick(&SILENT, 1.0);
    assert_eq!(session.state(), SessionState::Playing);

    // Settles for one second past the last note.
    session.tick(&SILENT, 0.5);
    assert_eq!(session.state(), SessionState::Playing);
    session.tick(&SILENT, 0.5);
    assert_eq!(session.state(), SessionState::Ended(EndReason::Completed));

    let ended = events.try_iter().find_map(|event| match event {
        SessionEvent::SessionEnded { reason, stats } => Some((reason, stats)),
        _ => None,
    });
    let (reason, stats) = ended.expect("session ended event");
    assert_eq!(reason, EndReason::Completed);
    assert_eq!(stats.totals.perfect_count, 1);
}

#[test]
fn test_completes_after_audio_finishes() {
    let mut session = started(&[(0, 1000)], SessionSettings::default());

    session.tick(&ClockReading::playing(1.1), 0.016);
    assert!((session.song_time() - 1.0).abs() < 1e-9);

    session.tick(&ClockReading::finished(), 0.5);
    assert_eq!(session.state(), SessionState::Playing);
    session.tick(&ClockReading::finished(), 0.5);

    assert_eq!(session.state(), SessionState::Ended(EndReason::Completed));
    assert_eq!(session.stats().totals.miss_count, 1);
}

#[test]
fn test_audio_that_stops_early_does_not_complete() {
    let mut session = started(&[(0, 1000)], SessionSettings::default());

    session.tick(&ClockReading::playing(0.5), 0.016);
    for _ in 0..10 {
        session.tick(&SILENT, 1.0);
    }

    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn test_stop_returns_to_idle_without_result() {
    let mut session = started(&[(0, 1000)], settings());
    let events = session.subscribe();
    session.tick(&SILENT, 0.5);

    session.stop();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.scheduler().is_none());
    let received: Vec<SessionEvent> = events.try_iter().collect();
    assert_eq!(received, vec![SessionEvent::StateChanged(SessionState::Idle)]);

    session.lane_input_down(0);
    session.tick(&SILENT, 1.0);
    assert!((session.song_time() - 0.5).abs() < 1e-9);
}

#[test]
fn test_restart_resets_stats() {
    let mut session = started(&[(0, 1000)], settings());
    session.lane_input_down(2);
    session.tick(&SILENT, 0.1);
    assert_eq!(session.stats().empty_presses, 1);

    session
        .start(SessionConfig::new(beatmap(&[(0, 1000)])).with_settings(settings()))
        .unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(session.stats().empty_presses, 0);
    assert_eq!(session.stats().health, 100.0);
    assert_eq!(session.song_time(), 0.0);
}

#[derive(Default)]
struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl SessionObserver for Recorder {
    fn on_judgment(&mut self, result: &JudgmentResult) {
        self.log.borrow_mut().push(result.judgment.to_string());
    }

    fn on_combo_change(&mut self, combo: u32) {
        self.log.borrow_mut().push(format!("combo {combo}"));
    }

    fn on_session_ended(&mut self, reason: EndReason, stats: &SessionStats) {
        self.log
            .borrow_mut()
            .push(format!("{reason:?} {}", stats.totals.total_score));
    }
}

#[test]
fn test_custom_observer_callbacks() {
    let recorder = Recorder::default();
    let log = Rc::clone(&recorder.log);

    let mut session = SessionController::new();
    session.add_observer(Box::new(recorder));
    let notes = beatmap(&[(0, 1000), (1, 1500)]);
    session
        .start(SessionConfig::new(notes).with_settings(settings()))
        .unwrap();

    session.lane_input_down(0);
    session.tick(&SILENT, 1.06);
    session.tick(&SILENT, 0.6);
    session.tick(&SILENT, 1.0);

    assert_eq!(
        *log.borrow(),
        vec!["Great", "combo 1", "Miss", "combo 0", "Completed 200"]
    );
}

#[test]
fn test_seven_key_chart_uses_every_lane() {
    let mut builder = Beatmap::builder();
    builder.key_count = 7;
    for lane in 0..7 {
        builder.add_hit_object(RawHitObject {
            x: (lane * 512 + 256) / 7,
            y: 192,
            time: 1000 + lane * 500,
            kind: SIMPLE_NOTE_FLAG,
            hit_sound: 0,
            end_time: None,
        });
    }
    let chart = Arc::new(builder.build());
    let lanes: Vec<usize> = chart.hit_objects().iter().map(|n| n.lane()).collect();
    assert_eq!(lanes, vec![0, 1, 2, 3, 4, 5, 6]);

    // Default settings still say four lanes.
    let mut session = SessionController::new();
    session
        .start(SessionConfig::new(chart).with_settings(settings()))
        .unwrap();

    session.lane_input_down(0);
    session.tick(&SILENT, 1.0);
    for lane in 1..7 {
        session.lane_input_down(lane);
        session.tick(&SILENT, 0.5);
    }
    session.tick(&SILENT, 1.0);

    assert_eq!(session.state(), SessionState::Ended(EndReason::Completed));
    let stats = session.stats();
    assert_eq!(stats.totals.perfect_count, 7);
    assert_eq!(stats.totals.judged_notes, 7);
    assert_eq!(stats.empty_presses, 0);
}

#[test]
fn test_start_rejects_invalid_settings() {
    let mut bad = settings();
    bad.scheduler.approach_time = 0.0;

    let mut session = SessionController::new();
    let events = session.subscribe();
    let err = session
        .start(SessionConfig::new(beatmap(&[(0, 1000)])).with_settings(bad))
        .unwrap_err();

    assert!(matches!(err, SettingsError::Invalid(_)));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.scheduler().is_none());
    assert!(events.try_iter().next().is_none());

    session.tick(&SILENT, 1.0);
    assert_eq!(session.song_time(), 0.0);
}

#[test]
fn test_late_press_after_expiry_is_empty() {
    // 90ms late is still on the field and judged Good.
    let mut session = started(&[(0, 2000)], settings());
    session.lane_input_down(0);
    session.tick(&SILENT, 2.09);
    assert_eq!(session.stats().totals.good_count, 1);
    assert_eq!(session.stats().empty_presses, 0);

    // 110ms late the note has already expired as a Miss before the press.
    let mut session = started(&[(0, 2000)], settings());
    session.lane_input_down(0);
    session.tick(&SILENT, 2.11);

    let stats = session.stats();
    assert_eq!(stats.totals.miss_count, 1);
    assert_eq!(stats.totals.good_count, 0);
    assert_eq!(stats.empty_presses, 1);
    assert_eq!(
        session.scheduler().unwrap().state(0),
        Some(NoteState::Resolved(Resolution::Expired))
    );
}

#[test]
fn test_dropped_subscriber_is_unsubscribed() {
    let mut session = SessionController::new();
    let kept = session.subscribe();
    drop(session.subscribe());
    assert_eq!(session.observer_count(), 2);

    session
        .start(SessionConfig::new(beatmap(&[(0, 1000)])).with_settings(settings()))
        .unwrap();

    assert_eq!(session.observer_count(), 1);
    let received: Vec<SessionEvent> = kept.try_iter().collect();
    assert_eq!(received.len(), 2);
}
