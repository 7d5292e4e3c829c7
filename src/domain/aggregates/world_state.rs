//! World State Aggregate - The root aggregate for a running story world
//!
//! Holds every location, character and story event along with the player's
//! whereabouts. Entities refer to each other by name, so names must be unique
//! within their kind. All modifications to world data should go through this
//! aggregate root to keep those references consistent.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::domain::entities::{Character, Location, PlayerProfile, StoryEvent, World};

/// The World State Aggregate Root
#[derive(Debug, Clone)]
pub struct WorldState {
    world: World,
    player: PlayerProfile,
    locations: Vec<Location>,
    characters: Vec<Character>,
    events: Vec<StoryEvent>,
    player_location: Option<String>,
    /// Index of the most recently started event
    current_event: Option<usize>,
}

impl WorldState {
    pub fn new(world: World, player: PlayerProfile) -> Self {
        Self {
            world,
            player,
            locations: Vec::new(),
            characters: Vec::new(),
            events: Vec::new(),
            player_location: None,
            current_event: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player(&self) -> &PlayerProfile {
        &self.player
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn events(&self) -> &[StoryEvent] {
        &self.events
    }

    pub fn player_location(&self) -> Option<&Location> {
        self.player_location
            .as_deref()
            .and_then(|name| self.find_location(name))
    }

    // ========================================================================
    // Finders
    // ========================================================================

    pub fn find_location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn find_character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Characters at a location, in world order
    pub fn characters_at(&self, location_name: &str) -> Vec<&Character> {
        self.characters
            .iter()
            .filter(|c| c.is_at(location_name))
            .collect()
    }

    /// Characters sharing the player's location
    pub fn present_characters(&self) -> Vec<&Character> {
        match self.player_location.as_deref() {
            Some(name) => self.characters_at(name),
            None => Vec::new(),
        }
    }

    pub fn active_events(&self) -> impl Iterator<Item = &StoryEvent> {
        self.events.iter().filter(|e| e.is_active())
    }

    /// The most recently started event, while it is still active
    pub fn current_event(&self) -> Option<&StoryEvent> {
        self.current_event
            .and_then(|idx| self.events.get(idx))
            .filter(|e| e.is_active())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// # Invariants
    /// - Location name must not be empty or already taken
    pub fn add_location(&mut self, location: Location) -> Result<(), AggregateError> {
        if location.name.trim().is_empty() {
            return Err(AggregateError::ValidationError(
                "Location name cannot be empty".to_string(),
            ));
        }
        if self.find_location(&location.name).is_some() {
            return Err(AggregateError::Duplicate(location.name));
        }
        self.locations.push(location);
        Ok(())
    }

    /// # Invariants
    /// - Character name must not be empty or already taken
    pub fn add_character(&mut self, character: Character) -> Result<(), AggregateError> {
        if character.name.trim().is_empty() {
            return Err(AggregateError::ValidationError(
                "Character name cannot be empty".to_string(),
            ));
        }
        if self.find_character(&character.name).is_some() {
            return Err(AggregateError::Duplicate(character.name));
        }
        self.characters.push(character);
        Ok(())
    }

    pub fn add_event(&mut self, event: StoryEvent) -> Result<(), AggregateError> {
        if event.name.trim().is_empty() {
            return Err(AggregateError::ValidationError(
                "Event name cannot be empty".to_string(),
            ));
        }
        self.events.push(event);
        Ok(())
    }

    /// Check that every location name mentioned by connections, characters and
    /// event conditions exists, and that event conditions name known characters
    pub fn validate_references(&self) -> Result<(), AggregateError> {
        let known_location = |name: &str| self.find_location(name).is_some();

        for location in &self.locations {
            if let Some(missing) = location.connections.iter().find(|c| !known_location(c)) {
                return Err(AggregateError::NotFound(format!(
                    "location '{}' connected from '{}'",
                    missing, location.name
                )));
            }
        }

        for character in &self.characters {
            if let Some(name) = character.location.as_deref() {
                if !known_location(name) {
                    return Err(AggregateError::NotFound(format!(
                        "location '{}' of character '{}'",
                        name, character.name
                    )));
                }
            }
        }

        for event in &self.events {
            for condition in &event.conditions {
                if let Some(missing) = condition.locations.iter().find(|l| !known_location(l)) {
                    return Err(AggregateError::NotFound(format!(
                        "location '{}' in event '{}'",
                        missing, event.name
                    )));
                }
                if let Some(missing) = condition
                    .characters
                    .iter()
                    .find(|c| self.find_character(c).is_none())
                {
                    return Err(AggregateError::NotFound(format!(
                        "character '{}' in event '{}'",
                        missing, event.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Place the player at a location
    pub fn move_player(&mut self, location_name: &str) -> Result<&Location, AggregateError> {
        let idx = self
            .locations
            .iter()
            .position(|l| l.name == location_name)
            .ok_or_else(|| AggregateError::NotFound(format!("location '{}'", location_name)))?;

        self.player_location = Some(location_name.to_string());
        Ok(&self.locations[idx])
    }

    /// Put every character without a location at a random public location.
    /// Returns the names of the characters that were placed.
    pub fn spawn_unplaced_characters<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<String> {
        let public: Vec<&str> = self
            .locations
            .iter()
            .filter(|l| l.is_public)
            .map(|l| l.name.as_str())
            .collect();

        let mut placed = Vec::new();
        for character in self.characters.iter_mut().filter(|c| c.location.is_none()) {
            if let Some(location) = public.choose(rng) {
                character.location = Some(location.to_string());
                placed.push(character.name.clone());
            }
        }
        placed
    }

    /// Roll every event against the player's location and start one of the
    /// eligible ones at random
    pub fn start_arrival_event<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&StoryEvent> {
        let location_name = self.player_location.as_deref()?;
        let location = self.locations.iter().find(|l| l.name == location_name)?;
        let present: Vec<&Character> = self
            .characters
            .iter()
            .filter(|c| c.is_at(location_name))
            .collect();

        let eligible: Vec<usize> = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.can_occur(location, &present, rng))
            .map(|(idx, _)| idx)
            .collect();

        let idx = *eligible.choose(rng)?;
        self.events[idx].start(&present, rng);
        self.current_event = Some(idx);
        Some(&self.events[idx])
    }

    /// End every active event. Returns the names of the events that ended.
    pub fn end_active_events(&mut self) -> Vec<String> {
        let mut ended = Vec::new();
        for event in self.events.iter_mut().filter(|e| e.is_active()) {
            event.end();
            ended.push(event.name.clone());
        }
        self.current_event = None;
        ended
    }

    /// Record a memory on a character
    pub fn add_memory(
        &mut self,
        character_name: &str,
        text: &str,
        timestamp_label: &str,
    ) -> Result<(), AggregateError> {
        let character = self
            .characters
            .iter_mut()
            .find(|c| c.name == character_name)
            .ok_or_else(|| AggregateError::NotFound(format!("character '{}'", character_name)))?;
        character.add_memory(text, timestamp_label);
        Ok(())
    }

    /// Advance every character by one game hour
    pub fn tick_hour(&mut self) {
        for character in &mut self.characters {
            character.tick_hour();
        }
    }
}

/// Errors that can occur when modifying the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// A validation rule was violated
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Name already used by another entity of the same kind
    #[error("Duplicate name: {0}")]
    Duplicate(String),
}
