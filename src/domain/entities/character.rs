//! Character entity - NPCs the player can talk to

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{hundred_scale_to_text, Describe, Memory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// A character (NPC) in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub description: String,
    /// Used when the character is referred to by events
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    hunger: i32,
    /// Name of the location the character is currently at
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    memories: Vec<Memory>,
}

impl Character {
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            age: 0,
            gender,
            description: String::new(),
            short_description: String::new(),
            hunger: 0,
            location: None,
            memories: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_short_description(mut self, description: impl Into<String>) -> Self {
        self.short_description = description.into();
        self
    }

    pub fn at_location(mut self, location_name: impl Into<String>) -> Self {
        self.location = Some(location_name.into());
        self
    }

    pub fn hunger(&self) -> i32 {
        self.hunger
    }

    /// Set hunger, clamped to 0-100
    pub fn set_hunger(&mut self, hunger: i32) {
        self.hunger = hunger.clamp(0, 100);
    }

    pub fn is_at(&self, location_name: &str) -> bool {
        self.location.as_deref() == Some(location_name)
    }

    pub fn add_memory(&mut self, text: impl Into<String>, timestamp_label: impl Into<String>) {
        self.memories.push(Memory::new(text, timestamp_label));
    }

    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    /// Advance the character's needs by one game hour
    pub fn tick_hour(&mut self) {
        self.set_hunger(self.hunger + 1);
    }
}

impl Describe for Character {
    fn describe(&self) -> String {
        format!(
            "{} = {}\nAge: {}\n\nHunger: {}",
            self.name,
            self.description,
            self.age,
            hundred_scale_to_text(self.hunger)
        )
    }
}
