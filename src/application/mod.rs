//! Application layer - Use cases and orchestration
//!
//! This layer contains:
//! - Services: prompt rendering, conversation, scene and transition control
//! - Ports: interfaces for the generation backend, presentation and memory storage

pub mod ports;
pub mod services;
