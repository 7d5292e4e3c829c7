//! Character memories stored on the in-memory world state

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::ports::outbound::{CharacterMemoryPort, MemoryError};
use crate::domain::aggregates::WorldState;

/// Writes memories straight onto the characters of the running world
#[derive(Clone)]
pub struct WorldMemoryStore {
    world: Arc<RwLock<WorldState>>,
}

impl WorldMemoryStore {
    pub fn new(world: Arc<RwLock<WorldState>>) -> Self {
        Self { world }
    }
}

#[async_trait]
impl CharacterMemoryPort for WorldMemoryStore {
    async fn add_memory(
        &self,
        character_name: &str,
        text: &str,
        timestamp_label: &str,
    ) -> Result<(), MemoryError> {
        self.world
            .write()
            .await
            .add_memory(character_name, text, timestamp_label)
            .map_err(|_| MemoryError::UnknownCharacter(character_name.to_string()))?;
        debug!(character = %character_name, "Memory stored");
        Ok(())
    }
}
