//! System requests - auxiliary, non-conversational queries
//!
//! A system request is layered on top of the most recent prompt to ask the
//! model something about the conversation rather than to continue it. Each
//! request only produces prompt text; whether the answer lands in the history
//! or on screen is decided by the session from the request's flags.

use serde::{Deserialize, Serialize};

use super::DialogueMessage;

/// The closed set of system queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemRequestKind {
    /// First-person memory summary from one character's point of view
    MemorySummary { character_name: String },
    /// Emotional state of everyone in the conversation
    EmotionalAnalysis,
    /// Key plot points, optionally limited to the last N messages
    PlotSummary { message_count: Option<usize> },
    /// Short label for the relationship between the characters
    Relationship,
    /// Free-form instruction
    Custom { instruction: String },
}

/// A system request together with its routing flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRequest {
    pub kind: SystemRequestKind,
    /// Append the cleaned answer to the conversation history
    pub add_to_history: bool,
    /// Push the request and its answer to the presentation layer
    pub show_on_ui: bool,
}

impl SystemRequest {
    pub fn memory_summary(character_name: impl Into<String>) -> Self {
        Self {
            kind: SystemRequestKind::MemorySummary {
                character_name: character_name.into(),
            },
            add_to_history: false,
            show_on_ui: false,
        }
    }

    pub fn emotional_analysis() -> Self {
        Self {
            kind: SystemRequestKind::EmotionalAnalysis,
            add_to_history: false,
            show_on_ui: true,
        }
    }

    pub fn plot_summary(message_count: Option<usize>) -> Self {
        Self {
            kind: SystemRequestKind::PlotSummary { message_count },
            add_to_history: true,
            show_on_ui: false,
        }
    }

    pub fn relationship() -> Self {
        Self {
            kind: SystemRequestKind::Relationship,
            add_to_history: true,
            show_on_ui: false,
        }
    }

    pub fn custom(instruction: impl Into<String>) -> Self {
        Self {
            kind: SystemRequestKind::Custom {
                instruction: instruction.into(),
            },
            add_to_history: false,
            show_on_ui: false,
        }
    }

    pub fn with_add_to_history(mut self, add_to_history: bool) -> Self {
        self.add_to_history = add_to_history;
        self
    }

    pub fn with_show_on_ui(mut self, show_on_ui: bool) -> Self {
        self.show_on_ui = show_on_ui;
        self
    }

    /// Produce the instruction text for this request
    ///
    /// Pure: the history is only read, never modified.
    pub fn generate_prompt(&self, _history: &[DialogueMessage]) -> String {
        match &self.kind {
            SystemRequestKind::MemorySummary { character_name } => format!(
                "Please create a concise memory summary from {name}'s perspective of the recent conversation. \
                 Focus on key events, decisions, and emotional moments that would be important for the character to remember. \
                 Format the summary in first person as if {name} is recording their thoughts.",
                name = character_name
            ),
            SystemRequestKind::EmotionalAnalysis => {
                "Analyze the emotional state of all characters in the recent conversation. \
                 Consider their words, actions, and reactions. Provide insights into their current feelings and mental state."
                    .to_string()
            }
            SystemRequestKind::PlotSummary { message_count } => {
                let scope = match message_count {
                    Some(count) if *count > 0 => format!("the last {} messages", count),
                    _ => "the recent conversation".to_string(),
                };
                format!(
                    "Please summarize the key plot points and significant events from {}. \
                     Focus on story progression, important decisions, and meaningful character interactions.",
                    scope
                )
            }
            SystemRequestKind::Relationship => {
                "Analyze the emotional state of all characters in the recent conversation. \
                 What would you consider them now to be in terms of their relationship? Reply with only a few words."
                    .to_string()
            }
            SystemRequestKind::Custom { instruction } => instruction.clone(),
        }
    }
}
