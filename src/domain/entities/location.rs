//! Location entity - Places the player can stand in

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Describe;

/// A location in the world
///
/// Connections are stored by location name and are one-directional; two-way
/// travel needs a connection on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Public places (not somebody's home) accept wandering characters and
    /// unrestricted events
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub connections: Vec<String>,
}

fn default_public() -> bool {
    true
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_public: true,
            connections: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub fn with_connection(mut self, location_name: impl Into<String>) -> Self {
        self.add_connection(location_name);
        self
    }

    /// Add a connection unless it already exists
    pub fn add_connection(&mut self, location_name: impl Into<String>) {
        let location_name = location_name.into();
        if !self.connections.contains(&location_name) {
            self.connections.push(location_name);
        }
    }

    pub fn is_connected_to(&self, location_name: &str) -> bool {
        self.connections.iter().any(|c| c == location_name)
    }

    /// Connected location names in alphabetical order
    pub fn sorted_connections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connections.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Describe for Location {
    fn describe(&self) -> String {
        format!(
            "{}\n{}\nConnected locations: {}\nPublic: {}",
            self.name,
            self.description,
            self.connections.join(", "),
            self.is_public
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_description() {
        let tavern = Location::new("Rusty Anchor")
            .with_description("A smoky dockside tavern.")
            .with_connection("Harbour")
            .with_connection("Market");

        assert_eq!(
            tavern.describe(),
            "Rusty Anchor\nA smoky dockside tavern.\nConnected locations: Harbour, Market\nPublic: true"
        );
    }

    #[test]
    fn test_connections_are_unique_and_sortable() {
        let mut square = Location::new("Square").with_connection("Temple");
        square.add_connection("Bakery");
        square.add_connection("Temple");

        assert_eq!(square.connections.len(), 2);
        assert_eq!(square.sorted_connections(), vec!["Bakery", "Temple"]);
        assert!(square.is_connected_to("Bakery"));
        assert!(!square.is_connected_to("Harbour"));
    }
}
