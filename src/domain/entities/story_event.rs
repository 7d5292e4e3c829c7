//! StoryEvent entity - Situations that can start when the player arrives somewhere
//!
//! An event is eligible when any one of its conditions holds for the arrival
//! location and the characters present there. Once started it picks one of
//! the matching characters to carry the scene and stays active until the
//! player leaves.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Character, Gender, Location};
use crate::domain::value_objects::Describe;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryEvent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// First message of the scene; may contain `{{char}}` and `{{user}}`
    #[serde(default)]
    pub start_message: String,
    #[serde(default)]
    pub conditions: Vec<EventCondition>,
    #[serde(skip)]
    active: bool,
    #[serde(skip)]
    chosen_character: Option<String>,
}

impl StoryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start_message: String::new(),
            conditions: Vec::new(),
            active: false,
            chosen_character: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_start_message(mut self, message: impl Into<String>) -> Self {
        self.start_message = message.into();
        self
    }

    pub fn with_condition(mut self, condition: EventCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Name of the character carrying the event, if any
    pub fn chosen_character(&self) -> Option<&str> {
        self.chosen_character.as_deref()
    }

    /// Whether any condition holds. Each condition rolls its own chance.
    pub fn can_occur<R: Rng + ?Sized>(
        &self,
        location: &Location,
        present: &[&Character],
        rng: &mut R,
    ) -> bool {
        self.conditions
            .iter()
            .any(|condition| condition.check(location, present, rng))
    }

    /// Activate the event and pick its character among the eligible ones
    pub fn start<R: Rng + ?Sized>(&mut self, present: &[&Character], rng: &mut R) {
        self.chosen_character = self.pick_character(present, rng);
        self.active = true;
    }

    pub fn end(&mut self) {
        self.active = false;
        self.chosen_character = None;
    }

    /// Characters named by any condition (or everyone present when a
    /// condition names nobody), deduplicated in arrival order
    fn pick_character<R: Rng + ?Sized>(
        &self,
        present: &[&Character],
        rng: &mut R,
    ) -> Option<String> {
        let mut seen = HashSet::new();
        let mut candidates: Vec<&str> = Vec::new();

        for condition in &self.conditions {
            for character in present {
                let eligible = condition.characters.is_empty()
                    || condition.characters.contains(&character.name);
                if eligible && seen.insert(character.name.as_str()) {
                    candidates.push(character.name.as_str());
                }
            }
        }

        candidates.choose(rng).map(|name| name.to_string())
    }
}

impl Describe for StoryEvent {
    fn describe(&self) -> String {
        format!("{} = {}", self.name, self.description)
    }
}

/// Requirement for a story event to start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCondition {
    /// Allowed locations; empty means any public location
    #[serde(default)]
    pub locations: Vec<String>,
    /// Allowed characters; empty means anyone
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default = "default_needs_character")]
    pub needs_character_on_location: bool,
    /// Percent chance the condition passes its roll
    #[serde(default = "default_chance")]
    pub chance: f32,
    /// Only characters of this gender count as present
    #[serde(default)]
    pub required_gender: Option<Gender>,
}

fn default_needs_character() -> bool {
    true
}

fn default_chance() -> f32 {
    100.0
}

impl Default for EventCondition {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            characters: Vec::new(),
            needs_character_on_location: true,
            chance: 100.0,
            required_gender: None,
        }
    }
}

impl EventCondition {
    pub fn check<R: Rng + ?Sized>(
        &self,
        location: &Location,
        present: &[&Character],
        rng: &mut R,
    ) -> bool {
        if rng.gen_range(0.0..100.0) > self.chance {
            return false;
        }
        self.check_location(location) && self.check_characters(present)
    }

    fn check_location(&self, location: &Location) -> bool {
        if self.locations.is_empty() {
            return location.is_public;
        }
        self.locations.contains(&location.name)
    }

    fn check_characters(&self, present: &[&Character]) -> bool {
        let present: Vec<&Character> = present
            .iter()
            .copied()
            .filter(|c| self.required_gender.map_or(true, |g| c.gender == g))
            .collect();

        if self.characters.is_empty() {
            return !(self.needs_character_on_location && present.is_empty());
        }

        present.iter().all(|c| self.characters.contains(&c.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_empty_location_list_accepts_public_only() {
        let condition = EventCondition::default();
        let anna = Character::new("Anna", Gender::Female);
        let present = [&anna];

        assert!(condition.check(&Location::new("Park"), &present, &mut rng()));
        assert!(!condition.check(&Location::new("Home").private(), &present, &mut rng()));
    }

    #[test]
    fn test_listed_location_accepts_private() {
        let condition = EventCondition {
            locations: vec!["Home".into()],
            ..Default::default()
        };
        let anna = Character::new("Anna", Gender::Female);

        assert!(condition.check(&Location::new("Home").private(), &[&anna], &mut rng()));
        assert!(!condition.check(&Location::new("Park"), &[&anna], &mut rng()));
    }

    #[test]
    fn test_needs_character_on_location() {
        let park = Location::new("Park");
        let strict = EventCondition::default();
        let relaxed = EventCondition {
            needs_character_on_location: false,
            ..Default::default()
        };

        assert!(!strict.check(&park, &[], &mut rng()));
        assert!(relaxed.check(&park, &[], &mut rng()));
    }

    #[test]
    fn test_every_present_character_must_be_listed() {
        let park = Location::new("Park");
        let anna = Character::new("Anna", Gender::Female);
        let bob = Character::new("Bob", Gender::Male);
        let condition = EventCondition {
            characters: vec!["Anna".into()],
            ..Default::default()
        };

        assert!(condition.check(&park, &[&anna], &mut rng()));
        assert!(!condition.check(&park, &[&anna, &bob], &mut rng()));
    }

    #[test]
    fn test_required_gender_filters_present_characters() {
        let park = Location::new("Park");
        let bob = Character::new("Bob", Gender::Male);
        let condition = EventCondition {
            required_gender: Some(Gender::Female),
            ..Default::default()
        };

        // Bob is filtered out, leaving nobody present
        assert!(!condition.check(&park, &[&bob], &mut rng()));
    }

    #[test]
    fn test_zero_chance_never_passes() {
        let condition = EventCondition {
            chance: 0.0,
            needs_character_on_location: false,
            ..Default::default()
        };
        let mut rng = rng();
        let park = Location::new("Park");

        assert!((0..50).all(|_| !condition.check(&park, &[], &mut rng)));
    }

    #[test]
    fn test_start_picks_eligible_character() {
        let anna = Character::new("Anna", Gender::Female);
        let bob = Character::new("Bob", Gender::Male);
        let mut event = StoryEvent::new("Lost Cat")
            .with_description("Someone lost their cat.")
            .with_condition(EventCondition {
                characters: vec!["Bob".into()],
                ..Default::default()
            });

        event.start(&[&anna, &bob], &mut rng());
        assert!(event.is_active());
        assert_eq!(event.chosen_character(), Some("Bob"));

        event.end();
        assert!(!event.is_active());
        assert_eq!(event.chosen_character(), None);
    }

    #[test]
    fn test_start_without_eligible_character() {
        let mut event = StoryEvent::new("Quiet Night").with_condition(EventCondition {
            needs_character_on_location: false,
            ..Default::default()
        });

        event.start(&[], &mut rng());
        assert!(event.is_active());
        assert_eq!(event.chosen_character(), None);
        assert_eq!(event.describe(), "Quiet Night = ");
    }
}
