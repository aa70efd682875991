use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::tower::LOBBY_FLOOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Fail => "fail",
        }
    }
}

/// One finished run. Written once when the run ends and never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: String,
    pub floor_reached: u32,
    pub memo: String,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

/// Everything that survives between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_floor: u32,
    pub current_player: Option<String>,
    pub attempts_left: u32,
    #[serde(default)]
    pub cleared_floors: BTreeMap<String, BTreeSet<u32>>,
    #[serde(default)]
    pub player_history: Vec<PlayerRecord>,
    #[serde(default)]
    pub all_players: BTreeSet<String>,
    /// Set once the active run can no longer continue; cleared when its record is written.
    #[serde(default)]
    pub run_over: Option<Outcome>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_floor: LOBBY_FLOOR,
            current_player: None,
            attempts_left: 0,
            cleared_floors: BTreeMap::new(),
            player_history: Vec::new(),
            all_players: BTreeSet::new(),
            run_over: None,
        }
    }
}

impl SessionState {
    pub fn is_floor_cleared(&self, player_id: &str, floor: u32) -> bool {
        self.cleared_floors
            .get(player_id)
            .is_some_and(|floors| floors.contains(&floor))
    }

    pub fn mark_cleared(&mut self, player_id: &str, floor: u32) {
        self.cleared_floors
            .entry(player_id.to_string())
            .or_default()
            .insert(floor);
    }

    pub fn cleared_count(&self, player_id: &str) -> usize {
        self.cleared_floors.get(player_id).map_or(0, BTreeSet::len)
    }
}
