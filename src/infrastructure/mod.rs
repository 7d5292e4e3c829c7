//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Chat completions: HTTP generation backend
//! - Console: terminal presentation
//! - Memory store: character memories on the running world
//! - World file: JSON world loading
//! - Config: Application configuration
//! - State: Shared application state

pub mod chat_completions;
pub mod config;
pub mod console;
pub mod memory_store;
pub mod state;
pub mod world_file;
