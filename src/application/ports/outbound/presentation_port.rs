//! Presentation port - Where dialogue lines are pushed for display

/// Receives dialogue lines meant for the player
#[cfg_attr(test, mockall::automock)]
pub trait PresentationPort: Send + Sync {
    fn show_dialogue(&self, speaker: &str, text: &str);
}
