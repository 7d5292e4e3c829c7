//! Taleweaver Engine - Narrative orchestration for LLM-driven interactive fiction
//!
//! The engine:
//! - Renders the player's scene (world, location, characters, events) and the
//!   conversation into prompts
//! - Sends prompts to a text-generation backend and cleans up the replies
//! - Keeps a bounded conversation history with regeneration and system requests
//! - Runs the farewell exchange when the player leaves a scene

pub mod application;
pub mod domain;
pub mod infrastructure;
