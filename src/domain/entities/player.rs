//! The player's own character

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Describe;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub name: String,
    pub description: String,
}

impl PlayerProfile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self::new("Jeff", "An average male in his 20s.")
    }
}

impl Describe for PlayerProfile {
    fn describe(&self) -> String {
        format!("{} = {}", self.name, self.description)
    }
}
