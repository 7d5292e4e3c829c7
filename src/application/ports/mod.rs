//! Ports - Boundaries between the application core and its collaborators

pub mod outbound;
