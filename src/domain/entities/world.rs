//! World entity - The setting every scene takes place in

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Describe;

/// The game world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub stats: WorldStats,
}

impl World {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            stats: WorldStats::default(),
        }
    }

    pub fn with_stats(mut self, stats: WorldStats) -> Self {
        self.stats = stats;
        self
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(
            "Generic World",
            "A generic modern world with a bustling city and surrounding countryside.",
        )
    }
}

/// Broad statistics of the world, each rated 0-10 except population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldStats {
    pub population: u64,
    pub crime_rate: i32,
    pub pollution_rate: i32,
    pub happiness_rate: i32,
    pub economic_richness: i32,
    pub education: i32,
    pub health: i32,
    pub beauty: i32,
    pub political_corruption: i32,
    pub religiosity: i32,
}

impl Default for WorldStats {
    fn default() -> Self {
        Self {
            population: 1_000_000,
            crime_rate: 5,
            pollution_rate: 3,
            happiness_rate: 7,
            economic_richness: 5,
            education: 5,
            health: 5,
            beauty: 5,
            political_corruption: 5,
            religiosity: 5,
        }
    }
}

impl Describe for World {
    fn describe(&self) -> String {
        let s = &self.stats;
        let stats = [
            format!("Population: {}", s.population),
            format!("Crime Rate: {}", s.crime_rate),
            format!("Pollution Rate: {}", s.pollution_rate),
            format!("Happiness Rate: {}", s.happiness_rate),
            format!("Economic Richness: {}", s.economic_richness),
            format!("Education: {}", s.education),
            format!("Health: {}", s.health),
            format!("Beauty: {}", s.beauty),
            format!("Political Corruption: {}", s.political_corruption),
            format!("Religiosity: {}", s.religiosity),
        ];
        format!(
            "{} = {}\nWorld Stats = {}",
            self.name,
            self.description,
            stats.join(", ")
        )
    }
}
