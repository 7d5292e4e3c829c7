//! Aggregates - Cluster of domain objects treated as a single unit

pub mod world_state;

pub use world_state::{AggregateError, WorldState};
