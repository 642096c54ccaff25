//! Seed data
//!
//! Demo conversations for a first run, and import of conversation records
//! from a JSON file.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::conversation::{Conversation, ConversationId, ConversationStatus};
use crate::knowledge::IndexedPage;
use crate::message_log::{Message, MessageId, MessageLog, Sender};

/// Errors loading a seed file
#[derive(Debug, Error)]
pub enum SeedError {
    /// File could not be read
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid seed JSON
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The same conversation id appears twice
    #[error("duplicate conversation id in seed file: {0}")]
    Duplicate(ConversationId),
}

/// One message in a seed file
#[derive(Debug, Deserialize)]
pub struct SeedMessage {
    /// Message id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Sender
    pub sender: Sender,
    /// Text
    pub content: String,
    /// Send time
    pub timestamp: DateTime<Utc>,
}

/// One conversation in a seed file
#[derive(Debug, Deserialize)]
pub struct SeedConversation {
    /// Conversation id
    pub id: String,
    /// Customer display name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Status, defaults to active
    #[serde(default)]
    pub status: ConversationStatus,
    /// Summary excerpt; defaults to the last message's content
    #[serde(default)]
    pub last_message: Option<String>,
    /// Last activity; defaults to the last message's time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Stored excerpt of the transcript
    #[serde(default)]
    pub messages: Vec<SeedMessage>,
    /// Total messages in the full transcript
    #[serde(default)]
    pub message_count: usize,
}

impl SeedConversation {
    /// Build the in-memory conversation
    #[must_use]
    pub fn into_conversation(self) -> Conversation {
        let log: MessageLog = self
            .messages
            .into_iter()
            .map(|m| {
                let mut message = Message::at(m.sender, m.content, m.timestamp);
                if let Some(id) = m.id {
                    message.id = MessageId(id);
                }
                message
            })
            .collect();

        let last = log.last_terminal();
        let last_message = self
            .last_message
            .or_else(|| last.map(|m| m.content.clone()))
            .unwrap_or_default();
        let timestamp = self
            .timestamp
            .or_else(|| last.map(|m| m.timestamp))
            .unwrap_or_else(Utc::now);

        Conversation::restore(
            ConversationId::new(self.id),
            self.customer_name,
            self.customer_email,
            self.status,
            last_message,
            timestamp,
            log,
            self.message_count,
        )
    }
}

/// Load conversations from a JSON array of [`SeedConversation`] records
pub fn load_seed_file(path: &Path) -> Result<Vec<Conversation>, SeedError> {
    let contents = std::fs::read_to_string(path)?;
    let records: Vec<SeedConversation> = serde_json::from_str(&contents)?;

    let mut seen = std::collections::HashSet::new();
    let mut conversations = Vec::with_capacity(records.len());
    for record in records {
        let conversation = record.into_conversation();
        if !seen.insert(conversation.id.clone()) {
            return Err(SeedError::Duplicate(conversation.id));
        }
        conversations.push(conversation);
    }

    tracing::info!(path = %path.display(), count = conversations.len(), "Loaded seed conversations");
    Ok(conversations)
}

fn seed_message(id: &str, sender: Sender, content: &str, at: DateTime<Utc>) -> Message {
    let mut message = Message::at(sender, content, at);
    message.id = MessageId(id.to_string());
    message
}

/// The three demo conversations, timed relative to `now`
#[must_use]
pub fn demo_conversations(now: DateTime<Utc>) -> Vec<Conversation> {
    vec![
        Conversation::restore(
            ConversationId::new("conv_001"),
            "Sarah Johnson",
            "sarah.j@example.com",
            ConversationStatus::Resolved,
            "Thank you for the help!",
            now - Duration::hours(1),
            [
                seed_message("m1", Sender::Customer, "Hi, I need help with my order", now - Duration::hours(2)),
                seed_message(
                    "m2",
                    Sender::Agent,
                    "Hello! I'd be happy to help you with your order. Could you please provide your order number?",
                    now - Duration::milliseconds(7_000_000),
                ),
            ]
            .into_iter()
            .collect(),
            8,
        ),
        Conversation::restore(
            ConversationId::new("conv_002"),
            "Michael Chen",
            "michael.c@example.com",
            ConversationStatus::Escalated,
            "Is there a human available?",
            now - Duration::minutes(30),
            [
                seed_message("m3", Sender::Customer, "I have a complex billing issue", now - Duration::hours(1)),
                seed_message(
                    "m4",
                    Sender::Agent,
                    "I understand you have a billing concern. Let me help you with that.",
                    now - Duration::milliseconds(3_400_000),
                ),
            ]
            .into_iter()
            .collect(),
            5,
        ),
        Conversation::restore(
            ConversationId::new("conv_003"),
            "Emily Rodriguez",
            "emily.r@example.com",
            ConversationStatus::Active,
            "What are your business hours?",
            now - Duration::minutes(5),
            [seed_message("m5", Sender::Customer, "What are your business hours?", now - Duration::minutes(5))]
                .into_iter()
                .collect(),
            2,
        ),
    ]
}

/// Demo crawled pages, newest first
#[must_use]
pub fn demo_indexed_pages(now: DateTime<Utc>) -> Vec<IndexedPage> {
    [
        ("https://example.com/pricing", 1),
        ("https://example.com/features", 1),
        ("https://example.com/support", 2),
    ]
    .into_iter()
    .map(|(url, days)| IndexedPage {
        url: url.to_string(),
        last_updated: now - Duration::days(days),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_demo_conversations() {
        let now = Utc::now();
        let demo = demo_conversations(now);

        let ids: Vec<_> = demo.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["conv_001", "conv_002", "conv_003"]);

        let sarah = &demo[0];
        assert_eq!(sarah.status(), ConversationStatus::Resolved);
        assert_eq!(sarah.message_count(), 8);
        assert_eq!(sarah.messages().len(), 2);
        assert_eq!(sarah.timestamp(), now - Duration::hours(1));

        assert_eq!(demo[1].status(), ConversationStatus::Escalated);
        assert_eq!(demo[2].status(), ConversationStatus::Active);
        assert_eq!(demo[2].last_message(), "What are your business hours?");

        let mut message_ids: Vec<_> = demo
            .iter()
            .flat_map(|c| c.messages().iter().map(|m| m.id.as_str().to_string()))
            .collect();
        let total = message_ids.len();
        message_ids.sort();
        message_ids.dedup();
        assert_eq!(message_ids.len(), total);
    }

    #[test]
    fn test_demo_pages_newest_first() {
        let pages = demo_indexed_pages(Utc::now());
        assert_eq!(pages.len(), 3);
        assert!(pages.windows(2).all(|w| w[0].last_updated >= w[1].last_updated));
    }

    #[test]
    fn test_load_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{
                    "id": "conv_100",
                    "customer_name": "Dana Lee",
                    "customer_email": "dana@example.com",
                    "status": "escalated",
                    "messages": [
                        {{"sender": "customer", "content": "My parcel is lost", "timestamp": "2026-01-05T10:00:00Z"}},
                        {{"id": "a1", "sender": "agent", "content": "Let me check.", "timestamp": "2026-01-05T10:00:04Z"}}
                    ]
                }},
                {{
                    "id": "conv_101",
                    "customer_name": "Sam Park",
                    "customer_email": "sam@example.com"
                }}
            ]"#
        )
        .unwrap();

        let conversations = load_seed_file(file.path()).unwrap();
        assert_eq!(conversations.len(), 2);

        let dana = &conversations[0];
        assert_eq!(dana.status(), ConversationStatus::Escalated);
        assert_eq!(dana.last_message(), "Let me check.");
        assert_eq!(dana.timestamp().to_rfc3339(), "2026-01-05T10:00:04+00:00");
        assert_eq!(dana.messages().as_slice()[1].id, MessageId("a1".to_string()));
        assert_eq!(dana.message_count(), 2);

        let sam = &conversations[1];
        assert_eq!(sam.status(), ConversationStatus::Active);
        assert!(sam.messages().is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "c", "customer_name": "A", "customer_email": "a@x"}},
                {{"id": "c", "customer_name": "B", "customer_email": "b@x"}}]"#
        )
        .unwrap();
        assert!(matches!(load_seed_file(file.path()), Err(SeedError::Duplicate(_))));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_seed_file(file.path()), Err(SeedError::Parse(_))));
    }
}
