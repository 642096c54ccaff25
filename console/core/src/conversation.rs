//! Conversations and their lifecycle status
//!
//! A conversation is one customer's thread with the agent. It owns a
//! [`MessageLog`] and keeps `last_message`/`timestamp` in step with the most
//! recent real entry of that log.
//!
//! # Status
//!
//! ```text
//!            mark_resolved            escalate
//!   Active ────────────────▶ Resolved ◀──────▶ Escalated
//!     │                                          ▲
//!     └──────────────────────────────────────────┘
//!                        escalate
//! ```
//!
//! Both `Resolved` and `Escalated` stay overridable by an operator; there is
//! no terminal state. Transitions are idempotent and never touch the
//! activity timestamp on their own.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message_log::{Message, MessageLog};

/// Unique identifier for a conversation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Wrap an existing identifier (seed data, adapter-supplied ids)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier for a new chat session
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("conv_{}", &uuid[..12]))
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lifecycle status of a conversation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Customer and agent are still talking
    #[default]
    Active,
    /// Operator closed the conversation
    Resolved,
    /// Needs human handling
    Escalated,
}

impl ConversationStatus {
    /// All statuses in display order
    pub const ALL: [Self; 3] = [Self::Active, Self::Resolved, Self::Escalated];

    /// Lowercase name used in filters and serialized data
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown conversation status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ConversationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Result of a status transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Status changed
    Changed {
        /// Previous status
        from: ConversationStatus,
        /// New status
        to: ConversationStatus,
    },
    /// Already in the requested status
    Unchanged,
}

impl Transition {
    /// Whether the status actually changed
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// A customer-agent thread with a lifecycle status
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Conversation {
    /// Unique conversation identifier
    pub id: ConversationId,
    /// Customer display name
    pub customer_name: String,
    /// Customer email address
    pub customer_email: String,
    status: ConversationStatus,
    last_message: String,
    timestamp: DateTime<Utc>,
    messages: MessageLog,
    /// Message count reported by imported data; the live log may hold fewer
    reported_count: usize,
    /// Transcript generation, bumped on every reset
    #[serde(skip)]
    epoch: u64,
}

impl Conversation {
    /// Create a fresh, active conversation with an empty log
    pub fn new(
        id: ConversationId,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            status: ConversationStatus::Active,
            last_message: String::new(),
            timestamp: Utc::now(),
            messages: MessageLog::new(),
            reported_count: 0,
            epoch: 0,
        }
    }

    /// Rebuild a conversation from imported data.
    ///
    /// `last_message`/`timestamp` are taken as given; imported summaries do
    /// not always match the stored excerpt of the log.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ConversationId,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        status: ConversationStatus,
        last_message: impl Into<String>,
        timestamp: DateTime<Utc>,
        messages: MessageLog,
        reported_count: usize,
    ) -> Self {
        Self {
            id,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            status,
            last_message: last_message.into(),
            timestamp,
            messages,
            reported_count,
            epoch: 0,
        }
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    /// Content of the most recent message
    #[must_use]
    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Time of last activity
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The message log
    #[must_use]
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    /// Number of messages exchanged
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.terminal_count().max(self.reported_count)
    }

    /// Current transcript generation
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Append a message.
    ///
    /// Real messages update `last_message` and `timestamp`. Returns `false`
    /// if the log refused the message (a second typing placeholder).
    pub fn append(&mut self, message: Message) -> bool {
        let mirror = (!message.is_transient).then(|| (message.content.clone(), message.timestamp));
        if !self.messages.append(message) {
            return false;
        }
        if let Some((content, timestamp)) = mirror {
            self.last_message = content;
            self.timestamp = timestamp;
        }
        true
    }

    /// Remove the typing placeholder if present
    pub fn remove_transient(&mut self) -> Option<Message> {
        self.messages.remove_transient()
    }

    /// Transition to `Resolved`
    pub fn mark_resolved(&mut self) -> Transition {
        self.transition_to(ConversationStatus::Resolved)
    }

    /// Transition to `Escalated`
    pub fn escalate(&mut self) -> Transition {
        self.transition_to(ConversationStatus::Escalated)
    }

    fn transition_to(&mut self, to: ConversationStatus) -> Transition {
        if self.status == to {
            return Transition::Unchanged;
        }
        let from = std::mem::replace(&mut self.status, to);
        tracing::debug!(
            conversation_id = %self.id,
            from = %from,
            to = %to,
            "Conversation status changed"
        );
        Transition::Changed { from, to }
    }

    /// Start a new transcript.
    ///
    /// Any agent result still in flight for the previous transcript must be
    /// discarded; callers detect that by comparing [`Self::epoch`].
    pub fn reset_transcript(&mut self) -> u64 {
        self.messages = MessageLog::new();
        self.last_message.clear();
        self.reported_count = 0;
        self.epoch += 1;
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Conversation {
        Conversation::new(ConversationId::new("conv_test"), "Alice", "alice@example.com")
    }

    #[test]
    fn test_new_conversation_is_active() {
        let conv = sample();
        assert_eq!(conv.status(), ConversationStatus::Active);
        assert!(conv.messages().is_empty());
        assert_eq!(conv.message_count(), 0);
    }

    #[test]
    fn test_append_mirrors_last_message() {
        let mut conv = sample();
        let msg = Message::at(
            crate::message_log::Sender::Customer,
            "Where is my order?",
            Utc::now() + Duration::seconds(5),
        );
        let ts = msg.timestamp;
        conv.append(msg);

        assert_eq!(conv.last_message(), "Where is my order?");
        assert_eq!(conv.timestamp(), ts);
    }

    #[test]
    fn test_typing_placeholder_does_not_mirror() {
        let mut conv = sample();
        conv.append(Message::customer("hello"));
        let ts = conv.timestamp();
        conv.append(Message::typing());

        assert_eq!(conv.last_message(), "hello");
        assert_eq!(conv.timestamp(), ts);
    }

    #[test]
    fn test_mark_resolved_idempotent() {
        let mut conv = sample();
        let ts = conv.timestamp();

        assert_eq!(
            conv.mark_resolved(),
            Transition::Changed {
                from: ConversationStatus::Active,
                to: ConversationStatus::Resolved
            }
        );
        assert_eq!(conv.mark_resolved(), Transition::Unchanged);
        assert_eq!(conv.status(), ConversationStatus::Resolved);
        assert_eq!(conv.timestamp(), ts);
    }

    #[test]
    fn test_resolved_and_escalated_overridable() {
        let mut conv = sample();
        conv.escalate();
        assert_eq!(conv.status(), ConversationStatus::Escalated);
        conv.mark_resolved();
        assert_eq!(conv.status(), ConversationStatus::Resolved);
        assert!(conv.escalate().is_changed());
        assert!(!conv.escalate().is_changed());
    }

    #[test]
    fn test_reset_transcript_bumps_epoch() {
        let mut conv = sample();
        conv.append(Message::customer("hi"));
        conv.append(Message::typing());

        assert_eq!(conv.reset_transcript(), 1);
        assert!(conv.messages().is_empty());
        assert_eq!(conv.last_message(), "");
        assert_eq!(conv.epoch(), 1);
    }

    #[test]
    fn test_reported_count_is_a_floor() {
        let conv = Conversation::restore(
            ConversationId::new("conv_001"),
            "Sarah Johnson",
            "sarah.j@example.com",
            ConversationStatus::Resolved,
            "Thank you for the help!",
            Utc::now(),
            MessageLog::new(),
            8,
        );
        assert_eq!(conv.message_count(), 8);
        assert_eq!(conv.last_message(), "Thank you for the help!");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Resolved".parse::<ConversationStatus>(), Ok(ConversationStatus::Resolved));
        assert!("closed".parse::<ConversationStatus>().is_err());
        assert_eq!(ConversationStatus::Escalated.to_string(), "escalated");
    }

    #[test]
    fn test_generated_ids_unique() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("conv_"));
    }
}
