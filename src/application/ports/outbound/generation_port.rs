//! Text-generation backend port

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The backend was unreachable or answered with an error
    #[error("Generation request failed: {0}")]
    RequestFailed(String),
    /// The backend answered but the reply carried no usable text
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Port for the remote text-generation service
///
/// Implementations own transport details such as timeouts. A call resolves
/// exactly once: with the raw, unprocessed generated text or with an error.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a continuation of `prompt` spoken by `role_label`
    async fn generate(&self, prompt: &str, role_label: &str) -> Result<String, GenerationError>;
}
