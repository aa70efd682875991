use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::types::{Catalog, Floor, TowerSettings, LOBBY_FLOOR};

const EMBEDDED_CATALOG: &str = include_str!("../../tower/tower.toml");

#[derive(Debug, Deserialize)]
struct TowerFile {
    #[serde(default)]
    tower: TowerSettings,
    #[serde(default, rename = "floor")]
    floors: Vec<Floor>,
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    parse_catalog(&content).with_context(|| format!("invalid catalog {}", path.display()))
}

/// The 30-floor tower that ships with the game.
pub fn default_catalog() -> Result<Catalog> {
    parse_catalog(EMBEDDED_CATALOG).context("embedded catalog is invalid")
}

pub fn parse_catalog(content: &str) -> Result<Catalog> {
    let file: TowerFile = toml::from_str(content)?;
    let catalog = Catalog {
        settings: file.tower,
        floors: file.floors,
    };
    validate(&catalog)?;
    Ok(catalog)
}

fn validate(catalog: &Catalog) -> Result<()> {
    if catalog.floors.is_empty() {
        bail!("catalog has no floors");
    }

    for (index, floor) in catalog.floors.iter().enumerate() {
        let expected = index as u32 + 1;
        if floor.number != expected {
            bail!(
                "floors must be numbered 1..N in order: found floor {} where {} was expected",
                floor.number,
                expected
            );
        }
    }

    if !catalog.floors[0].rest_stop {
        bail!("floor {} is the lobby and must be a rest stop", LOBBY_FLOOR);
    }

    let final_floor = catalog.final_floor();
    let settings = &catalog.settings;

    if settings.starting_attempts == 0 {
        bail!("starting_attempts must be at least 1");
    }

    if let Some(defeat) = settings.defeat_floor {
        if defeat <= LOBBY_FLOOR || defeat >= final_floor {
            bail!(
                "defeat_floor {} must lie between the lobby and the final floor {}",
                defeat,
                final_floor
            );
        }
    }

    for floor in &catalog.floors {
        if floor.rest_stop || catalog.is_defeat_floor(floor.number) {
            continue;
        }
        match &floor.riddle {
            None => bail!("floor {} has no riddle and is not a rest stop", floor.number),
            Some(riddle) if riddle.answer.trim().is_empty() => {
                bail!("floor {} has a riddle with a blank answer", floor.number)
            }
            Some(_) => {}
        }
    }

    let last = &catalog.floors[catalog.floors.len() - 1];
    if last.rest_stop || last.riddle.is_none() {
        bail!("the final floor {} must hold a riddle", final_floor);
    }

    Ok(())
}
