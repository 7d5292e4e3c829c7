//! Character memories

use serde::{Deserialize, Serialize};

use super::Describe;

/// Something a character remembers, stamped with the in-game time it was formed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub timestamp_label: String,
    pub text: String,
}

impl Memory {
    pub fn new(text: impl Into<String>, timestamp_label: impl Into<String>) -> Self {
        Self {
            timestamp_label: timestamp_label.into(),
            text: text.into(),
        }
    }
}

impl Describe for Memory {
    fn describe(&self) -> String {
        format!("{}: {}", self.timestamp_label, self.text)
    }
}
