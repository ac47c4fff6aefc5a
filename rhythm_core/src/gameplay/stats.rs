use std::fmt;

use serde::Serialize;

use super::judge::ScoreTotals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    SS,
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if a >= 95.0 => Grade::SS,
            a if a >= 90.0 => Grade::S,
            a if a >= 80.0 => Grade::A,
            a if a >= 70.0 => Grade::B,
            a if a >= 60.0 => Grade::C,
            _ => Grade::D,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::SS => "SS",
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(s)
    }
}

/// Aggregate for one run, owned by the session and handed out as snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    #[serde(flatten)]
    pub totals: ScoreTotals,
    pub health: f64,
    pub max_health: f64,
    pub empty_presses: u32,
    pub song_time: f64,
}

impl SessionStats {
    pub fn new(max_health: f64) -> Self {
        Self {
            totals: ScoreTotals::default(),
            health: max_health,
            max_health,
            empty_presses: 0,
            song_time: 0.0,
        }
    }

    pub fn grade(&self) -> Grade {
        Grade::from_accuracy(self.totals.accuracy)
    }

    pub fn normalized_health(&self) -> f64 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.totals;
        writeln!(f, "Score: {}", t.total_score)?;
        writeln!(f, "Accuracy: {:.2}%", t.accuracy)?;
        writeln!(f, "Max Combo: {}", t.max_combo)?;
        writeln!(
            f,
            "Perfect: {}, Great: {}, Good: {}, Miss: {}",
            t.perfect_count, t.great_count, t.good_count, t.miss_count
        )?;
        write!(f, "Early: {}, Late: {}", t.early_count, t.late_count)
    }
}
