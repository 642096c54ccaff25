//! Message Log
//!
//! Append-only, time-ordered record of the turns in one conversation.
//!
//! The log is the only place chat turns live. Entries are never edited in
//! place; the single exception to append-only is the transient "agent is
//! typing" placeholder, which is inserted while an agent call is pending and
//! removed when it settles.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The customer using the chat widget
    Customer,
    /// The AI response agent
    Agent,
}

impl Sender {
    /// Label shown above a message bubble
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Agent => "AI Agent",
        }
    }
}

/// A single chat turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub sender: Sender,
    /// Message content (empty for the typing placeholder)
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Whether this is the typing placeholder
    #[serde(default)]
    pub is_transient: bool,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self::at(sender, content, Utc::now())
    }

    /// Create a message with an explicit timestamp
    pub fn at(sender: Sender, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            content: content.into(),
            timestamp,
            is_transient: false,
        }
    }

    /// Create the agent typing placeholder
    #[must_use]
    pub fn typing() -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Agent,
            content: String::new(),
            timestamp: Utc::now(),
            is_transient: true,
        }
    }

    /// Shorthand for a customer message
    pub fn customer(content: impl Into<String>) -> Self {
        Self::new(Sender::Customer, content)
    }

    /// Shorthand for an agent message
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Sender::Agent, content)
    }
}

/// Ordered list of turns within one conversation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log.
    ///
    /// Returns `false` (and leaves the log untouched) when `message` is a
    /// transient placeholder and one is already present.
    pub fn append(&mut self, message: Message) -> bool {
        if message.is_transient && self.has_transient() {
            return false;
        }
        self.entries.push(message);
        true
    }

    /// Remove the typing placeholder if there is one
    pub fn remove_transient(&mut self) -> Option<Message> {
        let idx = self.entries.iter().position(|m| m.is_transient)?;
        Some(self.entries.remove(idx))
    }

    /// Whether a typing placeholder is currently in the log
    #[must_use]
    pub fn has_transient(&self) -> bool {
        self.entries.iter().any(|m| m.is_transient)
    }

    /// Iterate oldest first
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.entries.iter()
    }

    /// All entries, oldest first
    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.entries
    }

    /// Most recent message that is not the typing placeholder
    #[must_use]
    pub fn last_terminal(&self) -> Option<&Message> {
        self.entries.iter().rev().find(|m| !m.is_transient)
    }

    /// Number of real (non-placeholder) messages
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.entries.iter().filter(|m| !m.is_transient).count()
    }

    /// Total number of entries, including a placeholder
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<Message> for MessageLog {
    /// Builds a log from imported messages, dropping any typing placeholders.
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().filter(|m| !m.is_transient).collect(),
        }
    }
}
