use serde::{Deserialize, Serialize};

use super::judge::Judgment;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub max_health: f64,
    /// Base gain; Perfect earns twice this, Good half.
    pub gain_per_hit: f64,
    pub loss_per_miss: f64,
    pub loss_per_empty_press: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            gain_per_hit: 1.0,
            loss_per_miss: 5.0,
            loss_per_empty_press: 2.0,
        }
    }
}

impl HealthConfig {
    pub fn delta_for(&self, judgment: Judgment) -> f64 {
        match judgment {
            Judgment::Perfect => self.gain_per_hit * 2.0,
            Judgment::Great => self.gain_per_hit,
            Judgment::Good => self.gain_per_hit * 0.5,
            Judgment::Miss => -self.loss_per_miss,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthBar {
    current: f64,
    max: f64,
}

impl HealthBar {
    pub fn full(max: f64) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn normalized(&self) -> f64 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Applies a change and clamps to `[0, max]`. Returns the new value.
    pub fn apply(&mut self, delta: f64) -> f64 {
        self.current = (self.current + delta).clamp(0.0, self.max.max(0.0));
        self.current
    }
}
