//! World file loading
//!
//! The pre-authored world (locations, characters, events) is stored as a
//! single JSON document. Loading validates names and cross references before
//! the aggregate is handed to the application.

mod snapshot;

pub use snapshot::{load_world, LoadedWorld, WorldFile, WorldLoadError};
