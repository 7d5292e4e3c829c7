//! Scene Service - Keeps the prompt context in step with the world
//!
//! The world state lives in the [`WorldState`] aggregate. This service mirrors
//! the parts relevant to the player's current scene into the prompt renderer,
//! completes moves between locations (starting arrival events along the way)
//! and advances the world by game hours.
//!
//! Locks are always taken world first, renderer second.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use super::conversation_session::{ConversationSession, SYSTEM_SPEAKER};
use crate::domain::aggregates::WorldState;
use crate::domain::value_objects::{Describe, DescriptionProvider, GameClock};

/// Seeded into the history when an arrival starts no event
pub const NOTHING_HAPPENING_MESSAGE: &str = "Nothing happening at this location, keep exploring!";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),
}

/// What the player sees after arriving somewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub location: String,
    /// Event started on arrival, if any
    pub event: Option<String>,
    /// System message seeded into the fresh conversation
    pub message: String,
}

pub struct SceneService {
    world: Arc<RwLock<WorldState>>,
    session: Arc<ConversationSession>,
    clock: GameClock,
    rng: Mutex<StdRng>,
    hours_applied: AtomicU64,
}

impl SceneService {
    pub fn new(
        world: Arc<RwLock<WorldState>>,
        session: Arc<ConversationSession>,
        clock: GameClock,
    ) -> Self {
        Self::with_rng(world, session, clock, StdRng::from_entropy())
    }

    /// Use a fixed random source, e.g. a seeded one in tests
    pub fn with_rng(
        world: Arc<RwLock<WorldState>>,
        session: Arc<ConversationSession>,
        clock: GameClock,
        rng: StdRng,
    ) -> Self {
        Self {
            world,
            session,
            clock,
            rng: Mutex::new(rng),
            hours_applied: AtomicU64::new(0),
        }
    }

    pub fn world(&self) -> &Arc<RwLock<WorldState>> {
        &self.world
    }

    pub fn session(&self) -> &Arc<ConversationSession> {
        &self.session
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub async fn player_name(&self) -> String {
        self.world.read().await.player().name.clone()
    }

    pub async fn location_exists(&self, name: &str) -> bool {
        self.world.read().await.find_location(name).is_some()
    }

    pub async fn current_location_name(&self) -> Option<String> {
        self.world
            .read()
            .await
            .player_location()
            .map(|l| l.name.clone())
    }

    pub async fn present_character_names(&self) -> Vec<String> {
        self.world
            .read()
            .await
            .present_characters()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Character expected to speak next: the one carrying the current event,
    /// otherwise the first character present
    pub async fn current_character(&self) -> Option<String> {
        let world = self.world.read().await;
        if let Some(name) = world.current_event().and_then(|e| e.chosen_character()) {
            return Some(name.to_string());
        }
        world.present_characters().first().map(|c| c.name.clone())
    }

    /// Place characters that start without a location
    pub async fn spawn_characters(&self) {
        let mut world = self.world.write().await;
        let mut rng = self.rng.lock().await;
        for name in world.spawn_unplaced_characters(&mut *rng) {
            let location = world
                .find_character(&name)
                .and_then(|c| c.location.clone())
                .unwrap_or_default();
            info!(character = %name, location = %location, "Character spawned");
        }
    }

    /// Mirror the player's scene into the prompt renderer
    ///
    /// The character set is rebuilt from scratch: the player first, then the
    /// characters at the player's location.
    pub async fn refresh_context(&self) {
        let world = self.world.read().await;
        let mut renderer = self.session.renderer().write().await;

        renderer.set_world_state("World", world.world().describe());
        renderer.set_world_state("Time", self.clock.describe());

        if let Some(location) = world.player_location() {
            renderer.set_location(location.name.clone(), Some(provider(location.clone())));
        }

        renderer.clear_characters();
        let player = world.player();
        renderer.add_character(player.name.clone(), Some(provider(player.clone())));
        for character in world.present_characters() {
            renderer.add_character(character.name.clone(), Some(provider(character.clone())));
        }

        for event in world.active_events() {
            renderer.add_event(event.name.clone(), Some(provider(event.clone())));
        }
    }

    /// Move the player and start a fresh scene there
    ///
    /// The conversation is cleared, previous events end and one eligible
    /// event may start. The new conversation opens with a system message.
    #[instrument(skip(self))]
    pub async fn complete_move(&self, destination: &str) -> Result<Arrival, SceneError> {
        let (ended, started) = {
            let mut world = self.world.write().await;
            world
                .move_player(destination)
                .map_err(|_| SceneError::UnknownLocation(destination.to_string()))?;

            let ended = world.end_active_events();
            let mut rng = self.rng.lock().await;
            let started = world.start_arrival_event(&mut *rng).map(|event| {
                (
                    event.name.clone(),
                    event.start_message.clone(),
                    event.chosen_character().unwrap_or_default().to_string(),
                )
            });
            (ended, started)
        };

        self.session.clear().await;

        let message = {
            let mut renderer = self.session.renderer().write().await;
            for name in &ended {
                renderer.remove_event(name);
            }
            match &started {
                Some((_, start_message, character)) => {
                    renderer.replace_keywords(start_message, character)
                }
                None => NOTHING_HAPPENING_MESSAGE.to_string(),
            }
        };

        let event = started.map(|(name, _, _)| name);
        match &event {
            Some(name) => info!(location = %destination, event = %name, "Event started"),
            None => debug!(location = %destination, "No event on arrival"),
        }

        self.session.add_message(SYSTEM_SPEAKER, &message).await;
        self.refresh_context().await;

        Ok(Arrival {
            location: destination.to_string(),
            event,
            message,
        })
    }

    /// Advance the world by one game hour
    pub async fn tick_hour(&self) {
        self.world.write().await.tick_hour();
        self.hours_applied.fetch_add(1, Ordering::AcqRel);
        self.refresh_context().await;
    }

    /// Apply every game hour that passed on the clock since the last call.
    /// Returns how many hours were applied.
    pub async fn advance_clock(&self) -> u64 {
        let elapsed = self.clock.hours_elapsed();
        let applied = self.hours_applied.load(Ordering::Acquire);
        let due = elapsed.saturating_sub(applied);
        for _ in 0..due {
            self.tick_hour().await;
        }
        if due > 0 {
            debug!(hours = due, "Advanced game clock");
        }
        due
    }
}

fn provider<T: Describe + 'static>(value: T) -> DescriptionProvider {
    Arc::new(value)
}
