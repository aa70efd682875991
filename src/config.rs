use std::path::PathBuf;

const SAVE_ENV_VAR: &str = "RIDDLE_TOWER_SAVE";
const CATALOG_ENV_VAR: &str = "RIDDLE_TOWER_CATALOG";
const LOG_ENV_VAR: &str = "RIDDLE_TOWER_LOG";

const DEFAULT_SAVE_PATH: &str = "saves/game_state.json";
const DEFAULT_LOG_PATH: &str = "riddle-tower.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub save_path: PathBuf,
    /// `None` plays the tower embedded in the binary.
    pub catalog_path: Option<PathBuf>,
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            catalog_path: None,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };

        let defaults = Self::default();
        Self {
            save_path: read(SAVE_ENV_VAR).unwrap_or(defaults.save_path),
            catalog_path: read(CATALOG_ENV_VAR),
            log_path: read(LOG_ENV_VAR).unwrap_or(defaults.log_path),
        }
    }
}
