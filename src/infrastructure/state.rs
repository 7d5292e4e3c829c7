//! Shared application state

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::info;

use crate::application::ports::outbound::{
    CharacterMemoryPort, GenerationBackend, PresentationPort,
};
use crate::application::services::{
    Arrival, ConversationSession, PromptRenderer, SceneService, SceneTransitionController,
    TextNormalizer,
};
use crate::domain::value_objects::GameClock;
use crate::infrastructure::chat_completions::ChatCompletionsClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::console::ConsolePresenter;
use crate::infrastructure::memory_store::WorldMemoryStore;
use crate::infrastructure::world_file::{load_world, LoadedWorld};

/// Everything a front end needs to drive a story
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<ConversationSession>,
    pub scene: Arc<SceneService>,
    pub transitions: SceneTransitionController,
    starting_location: Option<String>,
}

impl AppState {
    /// Load the configured world and wire the HTTP backend and console output
    pub fn new(config: AppConfig) -> Result<Self> {
        let world = load_world(&config.world_file)?;
        let backend = Arc::new(ChatCompletionsClient::new(&config.llm));
        Ok(Self::with_adapters(
            config,
            world,
            backend,
            Arc::new(ConsolePresenter),
            GameClock::default(),
        ))
    }

    /// Wire the services around explicit adapters
    pub fn with_adapters(
        config: AppConfig,
        world: LoadedWorld,
        backend: Arc<dyn GenerationBackend>,
        presenter: Arc<dyn PresentationPort>,
        clock: GameClock,
    ) -> Self {
        let renderer = PromptRenderer::new(config.prompt.clone(), world.state.player());
        let world_state = Arc::new(RwLock::new(world.state));

        let session = Arc::new(
            ConversationSession::new(
                backend,
                Arc::new(RwLock::new(renderer)),
                TextNormalizer::new(config.normalizer.clone()),
                config.max_history_length,
            )
            .with_presenter(presenter),
        );

        let scene = Arc::new(SceneService::new(world_state.clone(), session.clone(), clock));
        let memories: Arc<dyn CharacterMemoryPort> = Arc::new(WorldMemoryStore::new(world_state));
        let transitions = SceneTransitionController::new(scene.clone(), memories);

        Self {
            config,
            session,
            scene,
            transitions,
            starting_location: world.starting_location,
        }
    }

    /// Place wandering characters and put the player at the starting location
    pub async fn start(&self) -> Result<Option<Arrival>> {
        self.scene.spawn_characters().await;
        let Some(location) = self.starting_location.as_deref() else {
            self.scene.refresh_context().await;
            return Ok(None);
        };
        let arrival = self.scene.complete_move(location).await?;
        info!(location = %arrival.location, "Story started");
        Ok(Some(arrival))
    }
}
