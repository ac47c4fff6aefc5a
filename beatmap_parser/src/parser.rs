use std::str::FromStr;

use beatmap_schema::{BeatmapBuilder, RawHitObject, TimingPoint, LONG_NOTE_FLAG};

use crate::{ParseReport, ParseWarning};

pub(crate) const TIMING_POINT_FIELDS: usize = 8;
pub(crate) const HIT_OBJECT_FIELDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    /// Lines before the first header (e.g. the format version line).
    Preamble,
    General,
    Metadata,
    Difficulty,
    TimingPoints,
    HitObjects,
    Unknown,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "General" => Self::General,
            "Metadata" => Self::Metadata,
            "Difficulty" => Self::Difficulty,
            "TimingPoints" => Self::TimingPoints,
            "HitObjects" => Self::HitObjects,
            _ => Self::Unknown,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Preamble => "",
            Self::General => "General",
            Self::Metadata => "Metadata",
            Self::Difficulty => "Difficulty",
            Self::TimingPoints => "TimingPoints",
            Self::HitObjects => "HitObjects",
            Self::Unknown => "Unknown",
        }
    }
}

struct DocumentParser {
    builder: BeatmapBuilder,
    warnings: Vec<ParseWarning>,
    section: Section,
}

pub(crate) fn parse_document(src: &str) -> ParseReport {
    let mut doc = DocumentParser {
        builder: BeatmapBuilder::new(),
        warnings: Vec::new(),
        section: Section::Preamble,
    };

    for (i, raw_line) in src.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw_line.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        if let Some(name) = section_header(trimmed) {
            doc.section = Section::from_header(name);
            if doc.section == Section::Unknown {
                log::debug!("ignoring unknown section [{name}] (line {line_no})");
            }
            continue;
        }

        match doc.section {
            Section::General => doc.general(trimmed, line_no),
            Section::Metadata => doc.metadata(trimmed),
            Section::Difficulty => doc.difficulty(trimmed, line_no),
            Section::TimingPoints => doc.timing_point(trimmed, line_no),
            Section::HitObjects => doc.hit_object(trimmed, line_no),
            Section::Preamble | Section::Unknown => {}
        }
    }

    let beatmap = doc.builder.build();
    log::info!(
        "beatmap parsed: {beatmap} ({} keys, {} notes, {} timing points, {} warnings)",
        beatmap.key_count(),
        beatmap.note_count(),
        beatmap.timing_points().len(),
        doc.warnings.len()
    );

    ParseReport {
        beatmap,
        warnings: doc.warnings,
    }
}

fn section_header(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
}

/// Splits on the first colon only; the value keeps any further colons.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    line.split_once(':')
        .map(|(key, value)| (key.trim(), value.trim()))
}

impl DocumentParser {
    fn warn(&mut self, warning: ParseWarning) {
        let warning = warning.with_section(self.section.name());
        log::warn!("[{}] {warning}", self.section.name());
        self.warnings.push(warning);
    }

    /// Parses a scalar value, recording a warning (and returning `None`) when
    /// it is not readable so the field keeps its default.
    fn scalar<T: FromStr>(&mut self, key: &str, value: &str, line_no: usize) -> Option<T> {
        match value.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                let message = format!("invalid value for {key}: {value:?}");
                self.warn(
                    ParseWarning::new("W1001", message, line_no)
                        .with_context(format!("{key}: {value}")),
                );
                None
            }
        }
    }

    fn general(&mut self, line: &str, line_no: usize) {
        let Some((key, value)) = split_key_value(line) else {
            return;
        };
        match key {
            "AudioFilename" => self.builder.general.audio_filename = value.to_string(),
            "AudioLeadIn" => {
                if let Some(v) = self.scalar(key, value, line_no) {
                    self.builder.general.audio_lead_in = v;
                }
            }
            "PreviewTime" => {
                if let Some(v) = self.scalar(key, value, line_no) {
                    self.builder.general.preview_time = v;
                }
            }
            _ => {}
        }
    }

    fn metadata(&mut self, line: &str) {
        let Some((key, value)) = split_key_value(line) else {
            return;
        };
        let meta = &mut self.builder.metadata;
        match key {
            "Title" => meta.title = value.to_string(),
            "Artist" => meta.artist = value.to_string(),
            "Creator" => meta.creator = value.to_string(),
            "Version" => meta.version = value.to_string(),
            _ => {}
        }
    }

    fn difficulty(&mut self, line: &str, line_no: usize) {
        let Some((key, value)) = split_key_value(line) else {
            return;
        };
        let known = matches!(
            key,
            "HPDrainRate"
                | "CircleSize"
                | "OverallDifficulty"
                | "ApproachRate"
                | "SliderMultiplier"
                | "SliderTickRate"
        );
        if !known {
            return;
        }
        let Some(v) = self.scalar::<f64>(key, value, line_no) else {
            return;
        };

        let diff = &mut self.builder.difficulty;
        match key {
            "HPDrainRate" => diff.hp_drain_rate = v,
            "OverallDifficulty" => diff.overall_difficulty = v,
            "ApproachRate" => diff.approach_rate = v,
            "SliderMultiplier" => diff.slider_multiplier = v,
            "SliderTickRate" => diff.slider_tick_rate = v,
            "CircleSize" => {
                diff.circle_size = v;
                if v >= 1.0 {
                    self.builder.key_count = v as usize;
                } else {
                    let keep = self.builder.key_count;
                    self.warn(
                        ParseWarning::new(
                            "W1004",
                            format!("CircleSize {v} gives no lanes; keeping {keep} keys"),
                            line_no,
                        )
                        .with_context(line.to_string()),
                    );
                }
            }
            _ => {}
        }
    }

    fn timing_point(&mut self, line: &str, line_no: usize) {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < TIMING_POINT_FIELDS {
            self.warn(
                ParseWarning::new(
                    "W1002",
                    format!(
                        "timing point has {} fields, expected {TIMING_POINT_FIELDS}",
                        parts.len()
                    ),
                    line_no,
                )
                .with_context(line.to_string()),
            );
            return;
        }

        match read_timing_point(&parts) {
            Ok(tp) => self.builder.add_timing_point(tp),
            Err(message) => self.warn(
                ParseWarning::new("W1003", format!("timing point dropped: {message}"), line_no)
                    .with_context(line.to_string()),
            ),
        }
    }

    fn hit_object(&mut self, line: &str, line_no: usize) {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < HIT_OBJECT_FIELDS {
            self.warn(
                ParseWarning::new(
                    "W1002",
                    format!(
                        "hit object has {} fields, expected {HIT_OBJECT_FIELDS}",
                        parts.len()
                    ),
                    line_no,
                )
                .with_context(line.to_string()),
            );
            return;
        }

        match read_hit_object(&parts) {
            Ok(raw) => self.builder.add_hit_object(raw),
            Err(message) => self.warn(
                ParseWarning::new("W1003", format!("hit object dropped: {message}"), line_no)
                    .with_context(line.to_string()),
            ),
        }
    }
}

fn field<T: FromStr>(parts: &[&str], index: usize, name: &str) -> Result<T, String> {
    let raw = parts.get(index).copied().unwrap_or("");
    raw.parse()
        .map_err(|_| format!("{name} is not a number: {raw:?}"))
}

fn read_timing_point(parts: &[&str]) -> Result<TimingPoint, String> {
    Ok(TimingPoint {
        time: field(parts, 0, "time")?,
        beat_length: field(parts, 1, "beatLength")?,
        meter: field(parts, 2, "meter")?,
        sample_set: field(parts, 3, "sampleSet")?,
        sample_index: field(parts, 4, "sampleIndex")?,
        volume: field(parts, 5, "volume")?,
        uninherited: parts[6] == "1",
        effects: field(parts, 7, "effects")?,
    })
}

fn read_hit_object(parts: &[&str]) -> Result<RawHitObject, String> {
    let kind: i32 = field(parts, 3, "type")?;
    let mut raw = RawHitObject {
        x: field(parts, 0, "x")?,
        y: field(parts, 1, "y")?,
        time: field(parts, 2, "time")?,
        kind,
        hit_sound: field(parts, 4, "hitSound")?,
        end_time: None,
    };

    // `<endTime>:<extras...>` is only meaningful for long notes.
    if kind & LONG_NOTE_FLAG != 0 {
        if let Some(extra) = parts.get(5) {
            let end = extra.split(':').next().unwrap_or("");
            let end_time = end
                .trim()
                .parse()
                .map_err(|_| format!("endTime is not a number: {end:?}"))?;
            raw.end_time = Some(end_time);
        }
    }

    Ok(raw)
}
