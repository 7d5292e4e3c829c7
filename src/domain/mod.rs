//! Domain layer - Core story model with no I/O
//!
//! This layer contains:
//! - Entities: World, Location, Character, StoryEvent, PlayerProfile
//! - Value Objects: dialogue history, system requests, the game clock
//! - Aggregates: World state aggregate root

pub mod aggregates;
pub mod entities;
pub mod value_objects;
