//! Scene Transition Controller - Saying goodbye before leaving a scene
//!
//! Leaving a location where characters are present takes a short farewell:
//!
//! ```text
//! Idle --request_move (characters present)--> AwaitingFarewell
//! Idle --request_move (nobody present)------> Idle (moved)
//! AwaitingFarewell --farewell text----------> FarewellSent
//! FarewellSent --empty input----------------> Idle (memory stored, moved)
//! FarewellSent --more text------------------> AwaitingFarewell (keeps talking)
//! any --cancel_transition-------------------> Idle
//! ```
//!
//! A failed generation leaves the state where it was so the player can retry.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::conversation_session::SessionError;
use super::scene_service::{Arrival, SceneError, SceneService};
use crate::application::ports::outbound::{CharacterMemoryPort, MemoryError};
use crate::domain::value_objects::SystemRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),
    #[error("No location change in progress")]
    NotTransitioning,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl From<SceneError> for TransitionError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::UnknownLocation(name) => TransitionError::UnknownLocation(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    /// Waiting for the player to say goodbye to `character`
    AwaitingFarewell { destination: String, character: String },
    /// `character` has answered the farewell
    FarewellSent { destination: String, character: String },
}

impl TransitionState {
    pub fn pending_location(&self) -> Option<&str> {
        match self {
            TransitionState::Idle => None,
            TransitionState::AwaitingFarewell { destination, .. }
            | TransitionState::FarewellSent { destination, .. } => Some(destination),
        }
    }

    pub fn has_farewell_been_said(&self) -> bool {
        matches!(self, TransitionState::FarewellSent { .. })
    }
}

/// Result of asking to move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nobody to say goodbye to; the player already arrived
    Arrived(Arrival),
    /// `character` is present and expects a farewell first
    FarewellNeeded { character: String },
}

/// Result of player input during a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionInput {
    /// Empty input before any farewell was said
    Ignored,
    /// The character answered the farewell
    FarewellReply(String),
    /// The player left; the character's memory of the scene was stored
    Departed { memory: String, arrival: Arrival },
    /// The player kept talking instead of leaving
    ConversationResumed(String),
}

pub struct SceneTransitionController {
    scene: Arc<SceneService>,
    memories: Arc<dyn CharacterMemoryPort>,
    state: Mutex<TransitionState>,
}

impl SceneTransitionController {
    pub fn new(scene: Arc<SceneService>, memories: Arc<dyn CharacterMemoryPort>) -> Self {
        Self {
            scene,
            memories,
            state: Mutex::new(TransitionState::Idle),
        }
    }

    pub async fn state(&self) -> TransitionState {
        self.state.lock().await.clone()
    }

    pub async fn is_transitioning(&self) -> bool {
        self.state.lock().await.pending_location().is_some()
    }

    /// Ask to travel to `destination`
    #[instrument(skip(self))]
    pub async fn request_move(&self, destination: &str) -> Result<MoveOutcome, TransitionError> {
        if !self.scene.location_exists(destination).await {
            return Err(TransitionError::UnknownLocation(destination.to_string()));
        }

        let mut state = self.state.lock().await;
        match self.scene.current_character().await {
            Some(character) => {
                info!(destination = %destination, character = %character, "Awaiting farewell");
                *state = TransitionState::AwaitingFarewell {
                    destination: destination.to_string(),
                    character: character.clone(),
                };
                Ok(MoveOutcome::FarewellNeeded { character })
            }
            None => {
                let arrival = self.scene.complete_move(destination).await?;
                *state = TransitionState::Idle;
                Ok(MoveOutcome::Arrived(arrival))
            }
        }
    }

    /// Feed player input to a transition in progress
    #[instrument(skip(self))]
    pub async fn submit_input(&self, text: &str) -> Result<TransitionInput, TransitionError> {
        let mut state = self.state.lock().await;
        let text = text.trim();

        match state.clone() {
            TransitionState::Idle => Err(TransitionError::NotTransitioning),

            TransitionState::AwaitingFarewell { .. } if text.is_empty() => {
                Ok(TransitionInput::Ignored)
            }

            TransitionState::AwaitingFarewell { destination, character } => {
                let reply = self.player_turn(text, &character).await?;
                *state = TransitionState::FarewellSent { destination, character };
                Ok(TransitionInput::FarewellReply(reply))
            }

            TransitionState::FarewellSent { destination, character } if text.is_empty() => {
                let memory = self
                    .scene
                    .session()
                    .send_system_message(&SystemRequest::memory_summary(character.as_str()))
                    .await?;
                let timestamp = self.scene.clock().formatted_time();
                self.memories
                    .add_memory(&character, &memory, &timestamp)
                    .await?;
                info!(character = %character, "Stored farewell memory");

                let arrival = self.scene.complete_move(&destination).await?;
                *state = TransitionState::Idle;
                Ok(TransitionInput::Departed { memory, arrival })
            }

            TransitionState::FarewellSent { destination, character } => {
                let reply = self.player_turn(text, &character).await?;
                info!(character = %character, "Player kept talking, farewell reset");
                *state = TransitionState::AwaitingFarewell { destination, character };
                Ok(TransitionInput::ConversationResumed(reply))
            }
        }
    }

    /// Abandon any pending move
    pub async fn cancel_transition(&self) {
        let mut state = self.state.lock().await;
        if let Some(destination) = state.pending_location() {
            info!(destination = %destination, "Transition cancelled");
        }
        *state = TransitionState::Idle;
    }

    /// Add the player's line and get the character's reply. The line is
    /// taken back out of the history if the reply fails.
    async fn player_turn(&self, text: &str, character: &str) -> Result<String, TransitionError> {
        let player = self.scene.player_name().await;
        let session = self.scene.session();
        let id = session.add_message(&player, text).await;

        self.scene.refresh_context().await;
        match session.request_response(character).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(error = %e, "Reply failed, retracting player line");
                session.retract_message(id).await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::testing::ScriptedBackend;
    use crate::application::ports::outbound::MockCharacterMemoryPort;
    use crate::application::services::conversation_session::ConversationSession;
    use crate::application::services::prompt_renderer::{PromptRenderer, PromptSettings};
    use crate::application::services::text_normalizer::TextNormalizer;
    use crate::domain::aggregates::WorldState;
    use crate::domain::entities::{Character, Gender, Location, PlayerProfile, World};
    use crate::domain::value_objects::GameClock;
    use mockall::predicate::eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::sync::RwLock;

    fn scene(backend: Arc<ScriptedBackend>) -> Arc<SceneService> {
        let mut world = WorldState::new(World::default(), PlayerProfile::default());
        world
            .add_location(Location::new("Inn").with_connection("Road"))
            .unwrap();
        world.add_location(Location::new("Road")).unwrap();
        world
            .add_character(Character::new("Ola", Gender::Female).at_location("Inn"))
            .unwrap();

        let renderer = Arc::new(RwLock::new(PromptRenderer::new(
            PromptSettings {
                include_timestamp: false,
                ..Default::default()
            },
            &PlayerProfile::default(),
        )));
        let session = Arc::new(ConversationSession::new(
            backend,
            renderer,
            TextNormalizer::default(),
            20,
        ));
        Arc::new(SceneService::with_rng(
            Arc::new(RwLock::new(world)),
            session,
            GameClock::frozen_at(20.0),
            StdRng::seed_from_u64(5),
        ))
    }

    fn no_memories() -> Arc<MockCharacterMemoryPort> {
        let mut memories = MockCharacterMemoryPort::new();
        memories.expect_add_memory().never();
        Arc::new(memories)
    }

    #[tokio::test]
    async fn test_move_without_characters_completes_immediately() {
        let scene = scene(Arc::new(ScriptedBackend::new()));
        let controller = SceneTransitionController::new(scene.clone(), no_memories());
        scene.complete_move("Road").await.unwrap();

        let outcome = controller.request_move("Inn").await.unwrap();

        assert!(matches!(outcome, MoveOutcome::Arrived(ref a) if a.location == "Inn"));
        assert_eq!(controller.state().await, TransitionState::Idle);
        assert_eq!(scene.current_location_name().await.as_deref(), Some("Inn"));
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let scene = scene(Arc::new(ScriptedBackend::new()));
        let controller = SceneTransitionController::new(scene, no_memories());

        assert_eq!(
            controller.request_move("Moon").await,
            Err(TransitionError::UnknownLocation("Moon".into()))
        );
        assert_eq!(controller.state().await, TransitionState::Idle);
    }

    #[tokio::test]
    async fn test_input_while_idle_is_rejected() {
        let scene = scene(Arc::new(ScriptedBackend::new()));
        let controller = SceneTransitionController::new(scene, no_memories());

        assert_eq!(
            controller.submit_input("bye").await,
            Err(TransitionError::NotTransitioning)
        );
    }

    #[tokio::test]
    async fn test_full_farewell_flow() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("Safe travels!")
                .with_reply("I said goodbye to Jeff at the inn."),
        );
        let scene = scene(backend.clone());

        let mut memories = MockCharacterMemoryPort::new();
        memories
            .expect_add_memory()
            .with(
                eq("Ola"),
                eq("I said goodbye to Jeff at the inn."),
                eq("8:00 PM"),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));
        let controller = SceneTransitionController::new(scene.clone(), Arc::new(memories));
        scene.complete_move("Inn").await.unwrap();

        let outcome = controller.request_move("Road").await.unwrap();
        assert_eq!(outcome, MoveOutcome::FarewellNeeded { character: "Ola".into() });
        let state = controller.state().await;
        assert_eq!(state.pending_location(), Some("Road"));
        assert!(!state.has_farewell_been_said());

        // Empty input before a farewell does nothing
        assert_eq!(controller.submit_input("  ").await, Ok(TransitionInput::Ignored));
        assert!(matches!(controller.state().await, TransitionState::AwaitingFarewell { .. }));

        let reply = controller.submit_input("Goodbye, Ola.").await.unwrap();
        assert_eq!(reply, TransitionInput::FarewellReply("Safe travels!".into()));
        assert!(controller.state().await.has_farewell_been_said());

        let departed = controller.submit_input("").await.unwrap();
        match departed {
            TransitionInput::Departed { memory, arrival } => {
                assert_eq!(memory, "I said goodbye to Jeff at the inn.");
                assert_eq!(arrival.location, "Road");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(controller.state().await, TransitionState::Idle);
        assert_eq!(scene.current_location_name().await.as_deref(), Some("Road"));

        let (memory_prompt, role) = backend.calls()[1].clone();
        assert_eq!(role, "SYSTEM");
        assert!(memory_prompt.contains("from Ola's perspective"));
    }

    #[tokio::test]
    async fn test_failed_farewell_reply_keeps_state() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_failure("timeout")
                .with_reply("Bye then."),
        );
        let scene = scene(backend);
        let controller = SceneTransitionController::new(scene.clone(), no_memories());
        scene.complete_move("Inn").await.unwrap();
        controller.request_move("Road").await.unwrap();

        let err = controller.submit_input("Farewell!").await.unwrap_err();
        assert!(matches!(err, TransitionError::Session(SessionError::Backend(_))));
        assert!(matches!(controller.state().await, TransitionState::AwaitingFarewell { .. }));
        // Only the arrival message remains
        assert_eq!(scene.session().get_history().await.len(), 1);

        let retry = controller.submit_input("Farewell!").await.unwrap();
        assert_eq!(retry, TransitionInput::FarewellReply("Bye then.".into()));
    }

    #[tokio::test]
    async fn test_failed_memory_summary_keeps_state() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("Take care.")
                .with_failure("server error"),
        );
        let scene = scene(backend);
        let controller = SceneTransitionController::new(scene.clone(), no_memories());
        scene.complete_move("Inn").await.unwrap();
        controller.request_move("Road").await.unwrap();
        controller.submit_input("Bye.").await.unwrap();

        assert!(controller.submit_input("").await.is_err());
        assert!(controller.state().await.has_farewell_been_said());
        assert_eq!(scene.current_location_name().await.as_deref(), Some("Inn"));
    }

    #[tokio::test]
    async fn test_talking_after_farewell_resets_it() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("Goodbye!")
                .with_reply("Oh, one more thing then?"),
        );
        let scene = scene(backend);
        let controller = SceneTransitionController::new(scene.clone(), no_memories());
        scene.complete_move("Inn").await.unwrap();
        controller.request_move("Road").await.unwrap();
        controller.submit_input("See you.").await.unwrap();

        let resumed = controller.submit_input("Actually, wait.").await.unwrap();

        assert_eq!(
            resumed,
            TransitionInput::ConversationResumed("Oh, one more thing then?".into())
        );
        let state = controller.state().await;
        assert_eq!(state.pending_location(), Some("Road"));
        assert!(!state.has_farewell_been_said());
    }

    #[tokio::test]
    async fn test_cancel_from_any_state() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("Bye."));
        let scene = scene(backend);
        let controller = SceneTransitionController::new(scene.clone(), no_memories());
        scene.complete_move("Inn").await.unwrap();

        controller.request_move("Road").await.unwrap();
        controller.cancel_transition().await;
        assert_eq!(controller.state().await, TransitionState::Idle);

        controller.request_move("Road").await.unwrap();
        controller.submit_input("Bye.").await.unwrap();
        controller.cancel_transition().await;
        assert!(!controller.is_transitioning().await);
        assert_eq!(scene.current_location_name().await.as_deref(), Some("Inn"));
    }
}
