//! Value objects - Immutable objects defined by their attributes

mod description;
mod dialogue;
mod game_clock;
mod ids;
mod memory;
mod system_request;

pub use description::{hundred_scale_to_text, ten_scale_to_text, Describe, DescriptionProvider};
pub use dialogue::{ConversationHistory, DialogueMessage, DEFAULT_MAX_HISTORY_LENGTH};
pub use game_clock::{GameClock, TimePeriod};
pub use ids::*;
pub use memory::Memory;
pub use system_request::{SystemRequest, SystemRequestKind};
