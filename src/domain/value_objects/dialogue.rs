//! Dialogue messages and the bounded conversation history

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::MessageId;

/// Default number of messages kept in a conversation history
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 20;

/// A single line of dialogue
///
/// Messages are immutable once created. Each carries its own identity so the
/// session can remove exactly the message a generation produced, even when an
/// identical line exists elsewhere in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueMessage {
    id: MessageId,
    sender: String,
    text: String,
}

impl DialogueMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            text: text.into(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for DialogueMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

/// Ordered dialogue history holding at most `max_length` messages
///
/// Pushing past the bound evicts the oldest messages first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<DialogueMessage>,
    max_length: usize,
}

impl ConversationHistory {
    pub fn new(max_length: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_length.min(64)),
            max_length,
        }
    }

    /// Append a message, evicting from the front to keep the bound
    pub fn push(&mut self, message: DialogueMessage) -> MessageId {
        let id = message.id();
        self.messages.push_back(message);
        self.enforce_bound();
        id
    }

    /// Remove the message with the given identity, wherever it sits
    pub fn remove(&mut self, id: MessageId) -> Option<DialogueMessage> {
        let position = self.messages.iter().position(|m| m.id() == id)?;
        self.messages.remove(position)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id() == id)
    }

    pub fn last(&self) -> Option<&DialogueMessage> {
        self.messages.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DialogueMessage> {
        self.messages.iter()
    }

    /// Copy of the current messages, oldest first
    pub fn snapshot(&self) -> Vec<DialogueMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Change the bound, trimming the oldest messages immediately if needed
    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        while self.messages.len() > self.max_length {
            self.messages.pop_front();
        }
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_LENGTH)
    }
}
