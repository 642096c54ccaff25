//! Conversation list filtering
//!
//! Status filter and free-text search, ANDed together. Works on a registry
//! snapshot so the result reflects a single consistent moment.

use std::str::FromStr;

use crate::conversation::{Conversation, ConversationStatus, UnknownStatus};

/// Status constraint for the conversation list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every status
    #[default]
    All,
    /// Only this status
    Only(ConversationStatus),
}

impl StatusFilter {
    /// Whether a status passes this filter
    #[must_use]
    pub fn matches(self, status: ConversationStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl From<ConversationStatus> for StatusFilter {
    fn from(status: ConversationStatus) -> Self {
        Self::Only(status)
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(status) => f.write_str(status.as_str()),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// Case-insensitive substring match on name, email or last message.
///
/// A blank query matches everything; otherwise the query is used as typed,
/// surrounding spaces included.
#[must_use]
pub fn matches_query(conversation: &Conversation, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    [
        conversation.customer_name.as_str(),
        conversation.customer_email.as_str(),
        conversation.last_message(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Conversations passing both the status filter and the query, in order
#[must_use]
pub fn filter(snapshot: &[Conversation], status: StatusFilter, query: &str) -> Vec<Conversation> {
    snapshot
        .iter()
        .filter(|c| status.matches(c.status()) && matches_query(c, query))
        .cloned()
        .collect()
}
