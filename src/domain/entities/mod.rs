//! Domain entities - Core business objects of the story world

mod character;
mod location;
mod player;
mod story_event;
mod world;

pub use character::{Character, Gender};
pub use location::Location;
pub use player::PlayerProfile;
pub use story_event::{EventCondition, StoryEvent};
pub use world::{World, WorldStats};
