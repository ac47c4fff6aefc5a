use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneInput {
    pub lane: usize,
}

/// Keyboard key for each lane, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub lanes: Vec<char>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            lanes: vec!['d', 'f', 'j', 'k'],
        }
    }
}

impl KeyBindings {
    pub fn lane_for_key(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_lowercase();
        self.lanes
            .iter()
            .position(|bound| bound.to_ascii_lowercase() == key)
    }

    pub fn key_for_lane(&self, lane: usize) -> Option<char> {
        self.lanes.get(lane).copied()
    }
}
