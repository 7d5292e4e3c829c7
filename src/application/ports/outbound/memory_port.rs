//! Character memory persistence port

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterMemoryPort: Send + Sync {
    /// Store a memory on a character, stamped with an in-game time label
    async fn add_memory(
        &self,
        character_name: &str,
        text: &str,
        timestamp_label: &str,
    ) -> Result<(), MemoryError>;
}
