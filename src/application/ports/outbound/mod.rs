//! Outbound ports - Interfaces that the application requires from external systems

mod clock_port;
mod generation_port;
mod memory_port;
mod presentation_port;

#[cfg(test)]
pub(crate) mod testing;

pub use clock_port::{ClockPort, SystemClock};
pub use generation_port::{GenerationBackend, GenerationError};
pub use memory_port::{CharacterMemoryPort, MemoryError};
pub use presentation_port::PresentationPort;

#[cfg(test)]
pub use clock_port::MockClockPort;
#[cfg(test)]
pub use memory_port::MockCharacterMemoryPort;
#[cfg(test)]
pub use presentation_port::MockPresentationPort;
