use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgment {
    Perfect,
    Great,
    Good,
    Miss,
}

impl Judgment {
    pub fn is_hit(self) -> bool {
        !matches!(self, Judgment::Miss)
    }

    pub fn name(self) -> &'static str {
        match self {
            Judgment::Perfect => "Perfect",
            Judgment::Great => "Great",
            Judgment::Good => "Good",
            Judgment::Miss => "Miss",
        }
    }
}

impl fmt::Display for Judgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JudgmentResult {
    pub judgment: Judgment,
    /// Input time minus note time, in seconds. Negative is early.
    pub timing_difference: f64,
    pub score: u32,
    pub is_hit: bool,
}

/// Half-widths of each judgment window, in seconds. Boundaries are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentWindows {
    pub perfect: f64,
    pub great: f64,
    pub good: f64,
    pub miss: f64,
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self {
            perfect: 0.040,
            great: 0.080,
            good: 0.120,
            miss: 0.180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            perfect: 300,
            great: 200,
            good: 100,
            miss: 0,
        }
    }
}

impl ScoreTable {
    pub fn points(&self, judgment: Judgment) -> u32 {
        match judgment {
            Judgment::Perfect => self.perfect,
            Judgment::Great => self.great,
            Judgment::Good => self.good,
            Judgment::Miss => self.miss,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentConfig {
    pub windows: JudgmentWindows,
    pub scores: ScoreTable,
    /// Hits closer than this (seconds) count as neither early nor late.
    pub dead_center: f64,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            windows: JudgmentWindows::default(),
            scores: ScoreTable::default(),
            dead_center: 0.005,
        }
    }
}

/// Running totals kept by the [`JudgeMachine`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTotals {
    pub total_score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_count: u32,
    pub great_count: u32,
    pub good_count: u32,
    pub miss_count: u32,
    pub early_count: u32,
    pub late_count: u32,
    pub judged_notes: u32,
    /// Percentage of the best score reachable for the notes judged so far.
    pub accuracy: f64,
}

impl Default for ScoreTotals {
    fn default() -> Self {
        Self {
            total_score: 0,
            combo: 0,
            max_combo: 0,
            perfect_count: 0,
            great_count: 0,
            good_count: 0,
            miss_count: 0,
            early_count: 0,
            late_count: 0,
            judged_notes: 0,
            accuracy: 100.0,
        }
    }
}

impl ScoreTotals {
    pub fn count(&self, judgment: Judgment) -> u32 {
        match judgment {
            Judgment::Perfect => self.perfect_count,
            Judgment::Great => self.great_count,
            Judgment::Good => self.good_count,
            Judgment::Miss => self.miss_count,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JudgeMachine {
    config: JudgmentConfig,
    totals: ScoreTotals,
}

impl JudgeMachine {
    pub fn new(config: JudgmentConfig) -> Self {
        Self {
            config,
            totals: ScoreTotals::default(),
        }
    }

    pub fn config(&self) -> &JudgmentConfig {
        &self.config
    }

    pub fn totals(&self) -> &ScoreTotals {
        &self.totals
    }

    /// Maps a signed timing difference onto a category without touching totals.
    pub fn classify(&self, timing_difference: f64) -> Judgment {
        let w = &self.config.windows;
        let abs_diff = timing_difference.abs();

        if abs_diff <= w.perfect {
            Judgment::Perfect
        } else if abs_diff <= w.great {
            Judgment::Great
        } else if abs_diff <= w.good {
            Judgment::Good
        } else {
            // Past the good window: inside the miss window or beyond it, still a Miss.
            Judgment::Miss
        }
    }

    pub fn judge(&mut self, timing_difference: f64) -> JudgmentResult {
        let judgment = self.classify(timing_difference);
        let score = self.config.scores.points(judgment);
        let is_hit = judgment.is_hit();
        let t = &mut self.totals;

        match judgment {
            Judgment::Perfect => t.perfect_count += 1,
            Judgment::Great => t.great_count += 1,
            Judgment::Good => t.good_count += 1,
            Judgment::Miss => t.miss_count += 1,
        }

        if is_hit {
            t.combo += 1;
            if timing_difference.abs() > self.config.dead_center {
                if timing_difference < 0.0 {
                    t.early_count += 1;
                } else {
                    t.late_count += 1;
                }
            }
        } else {
            t.combo = 0;
        }
        t.max_combo = t.max_combo.max(t.combo);

        t.total_score += u64::from(score);
        t.judged_notes += 1;
        let possible = u64::from(t.judged_notes) * u64::from(self.config.scores.perfect);
        if possible > 0 {
            t.accuracy = t.total_score as f64 / possible as f64 * 100.0;
        }

        log::debug!(
            "{judgment} ({:+.1}ms), combo {}, acc {:.2}%",
            timing_difference * 1000.0,
            t.combo,
            t.accuracy
        );

        JudgmentResult {
            judgment,
            timing_difference,
            score,
            is_hit,
        }
    }

    /// Judges a note that aged out without input.
    pub fn judge_miss(&mut self) -> JudgmentResult {
        self.judge(self.config.windows.miss + 0.1)
    }

    pub fn reset_stats(&mut self) {
        self.totals = ScoreTotals::default();
    }
}
