use serde::Deserialize;

pub const LOBBY_FLOOR: u32 = 1;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Riddle {
    pub prompt: String,
    pub answer: String,
    #[serde(default)]
    pub flavor: String,
}

impl Riddle {
    /// Case-insensitive comparison that ignores surrounding whitespace.
    pub fn accepts(&self, submission: &str) -> bool {
        submission.trim().to_lowercase() == self.answer.trim().to_lowercase()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Floor {
    pub number: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rest_stop: bool,
    #[serde(default)]
    pub riddle: Option<Riddle>,
}

impl Floor {
    /// Floors where nothing can be answered: the lobby and rest stops.
    pub fn is_quiet(&self) -> bool {
        self.rest_stop || self.riddle.is_none()
    }

    pub fn heading(&self) -> String {
        match &self.title {
            Some(title) => format!("Floor {}: {}", self.number, title),
            None => format!("Floor {}", self.number),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TowerSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_starting_attempts")]
    pub starting_attempts: u32,
    #[serde(default)]
    pub defeat_floor: Option<u32>,
    #[serde(default = "default_delay_ms")]
    pub defeat_delay_ms: u64,
    #[serde(default = "default_delay_ms")]
    pub exhausted_delay_ms: u64,
}

impl Default for TowerSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            starting_attempts: default_starting_attempts(),
            defeat_floor: None,
            defeat_delay_ms: default_delay_ms(),
            exhausted_delay_ms: default_delay_ms(),
        }
    }
}

fn default_name() -> String {
    "The Riddle Tower".to_string()
}

fn default_starting_attempts() -> u32 {
    2
}

fn default_delay_ms() -> u64 {
    3000
}

/// The ordered floors of one tower plus its tuning knobs.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub settings: TowerSettings,
    pub floors: Vec<Floor>,
}

impl Catalog {
    pub fn total_floors(&self) -> u32 {
        self.floors.len() as u32
    }

    pub fn final_floor(&self) -> u32 {
        self.floors.last().map(|f| f.number).unwrap_or(LOBBY_FLOOR)
    }

    pub fn contains(&self, number: u32) -> bool {
        (LOBBY_FLOOR..=self.total_floors()).contains(&number)
    }

    pub fn floor(&self, number: u32) -> Option<&Floor> {
        if !self.contains(number) {
            return None;
        }
        // Floors are validated to be numbered 1..=N in order
        self.floors.get((number - 1) as usize)
    }

    pub fn is_defeat_floor(&self, number: u32) -> bool {
        self.settings.defeat_floor == Some(number)
    }
}
