//! JSON world snapshot

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::aggregates::{AggregateError, WorldState};
use crate::domain::entities::{Character, Location, PlayerProfile, StoryEvent, World};

#[derive(Debug, thiserror::Error)]
pub enum WorldLoadError {
    #[error("Failed to read world file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse world file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid world: {0}")]
    Invalid(#[from] AggregateError),
}

/// On-disk layout of a world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldFile {
    #[serde(default)]
    pub world: World,
    #[serde(default)]
    pub player: PlayerProfile,
    /// Where the player begins; defaults to the first location
    #[serde(default)]
    pub starting_location: Option<String>,
    pub locations: Vec<Location>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub events: Vec<StoryEvent>,
}

/// A validated world ready to play
#[derive(Debug, Clone)]
pub struct LoadedWorld {
    pub state: WorldState,
    pub starting_location: Option<String>,
}

impl WorldFile {
    pub fn from_json(raw: &str) -> Result<Self, WorldLoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Build the aggregate, checking names and references
    pub fn into_world(self) -> Result<LoadedWorld, WorldLoadError> {
        let starting_location = self
            .starting_location
            .or_else(|| self.locations.first().map(|l| l.name.clone()));

        let mut state = WorldState::new(self.world, self.player);
        for location in self.locations {
            state.add_location(location)?;
        }
        for character in self.characters {
            state.add_character(character)?;
        }
        for event in self.events {
            state.add_event(event)?;
        }
        state.validate_references()?;

        if let Some(name) = starting_location.as_deref() {
            if state.find_location(name).is_none() {
                return Err(AggregateError::NotFound(format!("starting location '{}'", name)).into());
            }
        }

        Ok(LoadedWorld {
            state,
            starting_location,
        })
    }
}

/// Read and validate a world file
pub fn load_world(path: &Path) -> Result<LoadedWorld, WorldLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| WorldLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = WorldFile::from_json(&raw)?.into_world()?;
    info!(
        path = %path.display(),
        world = %loaded.state.world().name,
        locations = loaded.state.locations().len(),
        characters = loaded.state.characters().len(),
        events = loaded.state.events().len(),
        "Loaded world"
    );
    Ok(loaded)
}
