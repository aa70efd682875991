use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::state::SessionState;

/// Whole-file JSON save slot. Every save replaces the file in one rename.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the save file, falling back to a fresh state if it is missing or unreadable.
    pub fn load(&self) -> SessionState {
        match self.try_load() {
            Ok(Some(state)) => {
                info!(
                    path = %self.path.display(),
                    players = state.all_players.len(),
                    records = state.player_history.len(),
                    "loaded save"
                );
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no save found, starting fresh");
                SessionState::default()
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "save unreadable, starting fresh"
                );
                SessionState::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<SessionState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context("failed to read save file"),
        };
        let state = serde_json::from_str(&content).context("failed to parse save file")?;
        Ok(Some(state))
    }

    pub fn save(&self, state: &SessionState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create save directory {}", dir.display()))?;

        let tmp = NamedTempFile::new_in(&dir).context("failed to create temporary save file")?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, state).context("failed to encode save")?;
            writer.flush().context("failed to write save")?;
        }
        tmp.persist(&self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "saved");
        Ok(())
    }
}
