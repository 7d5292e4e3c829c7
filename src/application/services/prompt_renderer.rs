//! Prompt Renderer - Assembles the scene context and history into one prompt
//!
//! The renderer holds the "current scene": world state facts, world
//! descriptions, the current location, the characters present and the active
//! events. Every entry is keyed by name and keeps its insertion position when
//! updated. Entries are described lazily, at render time.
//!
//! Sections are rendered in a fixed order and omitted entirely when empty:
//!
//! ```text
//! **System:**
//! ...
//!
//! **Current Time:**
//! ...
//!
//! **World State:** / **World Information:** / **Current Location:** /
//! **Characters Present:** / **Active Events:** / **Conversation:**
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ports::outbound::{ClockPort, SystemClock};
use crate::domain::entities::PlayerProfile;
use crate::domain::value_objects::{DescriptionProvider, DialogueMessage};

/// Placeholder replaced with the speaking character's name
pub const CHARACTER_PLACEHOLDER: &str = "{{char}}";
/// Placeholder replaced with the player's name
pub const PLAYER_PLACEHOLDER: &str = "{{user}}";

pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str =
    "You are a creative writing AI that responds in character. Keep responses concise and natural.";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Body of the System section; empty disables the section
    pub system_instructions: String,
    pub include_timestamp: bool,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            include_timestamp: true,
        }
    }
}

/// Name-keyed entries in insertion order. Updating a key keeps its position.
#[derive(Clone)]
struct Entries<V> {
    items: Vec<(String, V)>,
}

impl<V> Entries<V> {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn upsert(&mut self, key: String, value: V) {
        match self.items.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.items.push((key, value)),
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|(k, _)| k != key);
        self.items.len() != before
    }

    fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(k, _)| k.as_str())
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One `key: value` line per entry
    fn render_lines(&self, describe: impl Fn(&V) -> String) -> String {
        self.items
            .iter()
            .map(|(k, v)| format!("{}: {}", k, describe(v)))
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string()
    }
}

pub struct PromptRenderer {
    settings: PromptSettings,
    player_name: String,
    clock: Arc<dyn ClockPort>,
    world_state: Entries<String>,
    world_descriptions: Entries<DescriptionProvider>,
    location: Option<(String, DescriptionProvider)>,
    characters: Entries<DescriptionProvider>,
    events: Entries<DescriptionProvider>,
}

impl PromptRenderer {
    pub fn new(settings: PromptSettings, player: &PlayerProfile) -> Self {
        Self::with_clock(settings, player, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: PromptSettings,
        player: &PlayerProfile,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            settings,
            player_name: player.name.clone(),
            clock,
            world_state: Entries::new(),
            world_descriptions: Entries::new(),
            location: None,
            characters: Entries::new(),
            events: Entries::new(),
        }
    }

    pub fn settings(&self) -> &PromptSettings {
        &self.settings
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = name.into();
    }

    // ========================================================================
    // Scene context
    // ========================================================================

    pub fn set_world_state(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        debug!(key = %key, "Updating world state");
        self.world_state.upsert(key, value.into());
    }

    pub fn add_world_description(&mut self, key: impl Into<String>, provider: Option<DescriptionProvider>) {
        if let Some(provider) = provider {
            let key = key.into();
            debug!(key = %key, "Adding world description");
            self.world_descriptions.upsert(key, provider);
        }
    }

    /// Replace the current location. The previous location is dropped even
    /// when `provider` is absent, which leaves no location at all.
    pub fn set_location(&mut self, name: impl Into<String>, provider: Option<DescriptionProvider>) {
        let name = name.into();
        debug!(location = %name, "Setting location");
        self.location = provider.map(|provider| (name, provider));
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn add_character(&mut self, name: impl Into<String>, provider: Option<DescriptionProvider>) {
        if let Some(provider) = provider {
            let name = name.into();
            debug!(character = %name, "Adding character to prompt context");
            self.characters.upsert(name, provider);
        }
    }

    pub fn remove_character(&mut self, name: &str) {
        debug!(character = %name, "Removing character from prompt context");
        self.characters.remove(name);
    }

    pub fn clear_characters(&mut self) {
        self.characters.clear();
    }

    pub fn has_character(&self, name: &str) -> bool {
        self.characters.contains(name)
    }

    pub fn character_names(&self) -> Vec<String> {
        self.characters.keys().map(str::to_string).collect()
    }

    pub fn add_event(&mut self, name: impl Into<String>, provider: Option<DescriptionProvider>) {
        if let Some(provider) = provider {
            let name = name.into();
            debug!(event = %name, "Adding event to prompt context");
            self.events.upsert(name, provider);
        }
    }

    pub fn remove_event(&mut self, name: &str) {
        debug!(event = %name, "Removing event from prompt context");
        self.events.remove(name);
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains(name)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the scene context followed by the conversation
    pub fn render(&self, history: &[DialogueMessage]) -> String {
        let mut sections: Vec<(&str, String)> = Vec::new();

        sections.push(("System", self.settings.system_instructions.clone()));

        if self.settings.include_timestamp {
            sections.push((
                "Current Time",
                self.clock.now().format(TIMESTAMP_FORMAT).to_string(),
            ));
        }

        if !self.world_state.is_empty() {
            sections.push(("World State", self.world_state.render_lines(String::clone)));
        }

        if !self.world_descriptions.is_empty() {
            sections.push((
                "World Information",
                self.world_descriptions.render_lines(|p| p.describe()),
            ));
        }

        if let Some((name, provider)) = &self.location {
            sections.push(("Current Location", format!("{}: {}", name, provider.describe())));
        }

        if !self.characters.is_empty() {
            sections.push((
                "Characters Present",
                self.characters.render_lines(|p| p.describe()),
            ));
        }

        if !self.events.is_empty() {
            sections.push(("Active Events", self.events.render_lines(|p| p.describe())));
        }

        if !history.is_empty() {
            let conversation = history
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(("Conversation", conversation.trim_end().to_string()));
        }

        sections
            .into_iter()
            .filter(|(_, body)| !body.is_empty())
            .map(|(header, body)| format!("**{}:**\n{}\n", header, body))
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string()
    }

    /// Substitute the character and player placeholders in one left-to-right
    /// pass. Inserted names are never scanned again.
    pub fn replace_keywords(&self, text: &str, speaker: &str) -> String {
        let substitutions = [
            (CHARACTER_PLACEHOLDER, speaker),
            (PLAYER_PLACEHOLDER, self.player_name.as_str()),
        ];

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match substitutions
                .iter()
                .find(|(placeholder, _)| tail.starts_with(placeholder))
            {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
