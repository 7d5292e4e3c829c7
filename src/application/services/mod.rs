//! Application services - Use case implementations
//!
//! The services turn scene state and player input into generated dialogue.
//! They depend only on the outbound ports, never on concrete adapters.

pub mod conversation_session;
pub mod prompt_renderer;
pub mod scene_service;
pub mod scene_transition;
pub mod text_normalizer;

pub use conversation_session::{ConversationSession, SessionError, SYSTEM_SPEAKER};
pub use prompt_renderer::{
    PromptRenderer, PromptSettings, CHARACTER_PLACEHOLDER, DEFAULT_SYSTEM_INSTRUCTIONS,
    PLAYER_PLACEHOLDER,
};
pub use scene_service::{Arrival, SceneError, SceneService, NOTHING_HAPPENING_MESSAGE};
pub use scene_transition::{
    MoveOutcome, SceneTransitionController, TransitionError, TransitionInput, TransitionState,
};
pub use text_normalizer::{NormalizerSettings, TextNormalizer, DEFAULT_EARLY_BREAK_THRESHOLD};
