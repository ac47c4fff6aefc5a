use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use beatmap_schema::Beatmap;
use rhythm_core::input::events::KeyBindings;
use rhythm_core::time::clock::ClockReading;
use rhythm_core::{SessionConfig, SessionController, SessionEvent, SessionSettings, SessionState};

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub settings: Option<PathBuf>,
    pub inputs: Option<PathBuf>,
    pub autoplay: bool,
    pub offset_ms: i32,
    pub fps: u32,
}

/// A scripted press, in song time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Press {
    pub time: f64,
    pub lane: usize,
}

pub fn run_simulation(path: &Path, options: &Options) -> anyhow::Result<()> {
    let beatmap = beatmap_parser::load_beatmap(path)
        .with_context(|| format!("simulate failed: {}", path.display()))?;
    let settings = match &options.settings {
        Some(file) => SessionSettings::load(file)
            .with_context(|| format!("bad settings file: {}", file.display()))?,
        None => SessionSettings::default(),
    };

    let presses = if options.autoplay {
        autoplay_presses(&beatmap, options.offset_ms)
    } else if let Some(file) = &options.inputs {
        let src = fs::read_to_string(file)
            .with_context(|| format!("failed to read inputs: {}", file.display()))?;
        parse_inputs(&src, &settings.keys)
            .with_context(|| format!("bad inputs file: {}", file.display()))?
    } else {
        Vec::new()
    };

    println!("{beatmap}");
    let beatmap = Arc::new(beatmap);
    let mut session = SessionController::new();
    let events = session.subscribe();
    session
        .start(SessionConfig::new(beatmap).with_settings(settings))
        .context("invalid session settings")?;

    let frame = 1.0 / f64::from(options.fps.max(1));
    let mut pending = presses.into_iter().peekable();

    while session.state() == SessionState::Playing {
        let frame_end = session.song_time() + frame;

        // Queued presses are judged after the tick advances time, so each
        // press lands on its exact time instead of the frame boundary.
        while let Some(press) = pending.next_if(|p| p.time <= frame_end) {
            let delta = (press.time - session.song_time()).max(0.0);
            session.lane_input_down(press.lane);
            session.tick(&ClockReading::silent(), delta);
        }
        if session.state() != SessionState::Playing {
            break;
        }
        session.tick(&ClockReading::silent(), frame_end - session.song_time());
    }

    let ended = events.try_iter().find_map(|event| match event {
        SessionEvent::SessionEnded { reason, stats } => Some((reason, stats)),
        _ => None,
    });
    let Some((reason, stats)) = ended else {
        bail!("session stopped without a result");
    };

    println!("Result: {reason:?}");
    println!("{stats}");
    println!("Empty presses: {}", stats.empty_presses);
    println!("Health: {:.1}/{:.1}", stats.health, stats.max_health);
    println!("Grade: {}", stats.grade());

    Ok(())
}

/// One press per note at its hit time shifted by `offset_ms`.
pub fn autoplay_presses(beatmap: &Beatmap, offset_ms: i32) -> Vec<Press> {
    beatmap
        .hit_objects()
        .iter()
        .map(|note| Press {
            time: (f64::from(note.time()) + f64::from(offset_ms)) / 1000.0,
            lane: note.lane(),
        })
        .collect()
}

/// Parses `<time_ms>,<lane>` lines. The lane is either an index or a bound key.
/// Blank lines and `#` comments are skipped. Presses come back sorted by time.
pub fn parse_inputs(src: &str, keys: &KeyBindings) -> anyhow::Result<Vec<Press>> {
    let mut presses = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = idx + 1;

        let Some((time, lane)) = line.split_once(',') else {
            bail!("expected `<time_ms>,<lane>` (line {line_no})");
        };
        let time: f64 = time
            .trim()
            .parse()
            .with_context(|| format!("bad press time {time:?} (line {line_no})"))?;
        let lane = lane.trim();
        let lane = match lane.parse::<usize>() {
            Ok(index) => index,
            Err(_) => {
                let mut chars = lane.chars();
                match (chars.next(), chars.next()) {
                    (Some(key), None) => match keys.lane_for_key(key) {
                        Some(index) => index,
                        None => bail!("key {key:?} is not bound to a lane (line {line_no})"),
                    },
                    _ => bail!("bad lane {lane:?} (line {line_no})"),
                }
            }
        };

        presses.push(Press {
            time: time / 1000.0,
            lane,
        });
    }

    presses.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(presses)
}
