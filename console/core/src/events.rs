//! Registry Events
//!
//! Change notifications published by the [`ConversationRegistry`] after each
//! mutation. Read-side views (conversation list, dashboard, chat widget)
//! subscribe and re-render when they receive one; they never poll.
//!
//! [`ConversationRegistry`]: crate::registry::ConversationRegistry

use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationId, ConversationStatus};
use crate::message_log::{MessageId, Sender};

/// A change to the conversation registry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A conversation was created or imported
    ConversationAdded {
        /// The new conversation
        conversation_id: ConversationId,
    },

    /// A message was appended to a conversation's log
    MessageAppended {
        /// Owning conversation
        conversation_id: ConversationId,
        /// The appended message
        message_id: MessageId,
        /// Who sent it
        sender: Sender,
        /// Whether it is the typing placeholder
        transient: bool,
    },

    /// The typing placeholder was removed
    TypingCleared {
        /// Owning conversation
        conversation_id: ConversationId,
    },

    /// A conversation's status changed
    StatusChanged {
        /// The conversation
        conversation_id: ConversationId,
        /// Previous status
        from: ConversationStatus,
        /// New status
        to: ConversationStatus,
    },

    /// An operator reset the conversation's transcript
    TranscriptReset {
        /// The conversation
        conversation_id: ConversationId,
        /// New transcript generation
        epoch: u64,
    },

    /// Every conversation was removed
    Cleared,
}

impl RegistryEvent {
    /// The conversation this event concerns, if any
    #[must_use]
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::ConversationAdded { conversation_id }
            | Self::MessageAppended { conversation_id, .. }
            | Self::TypingCleared { conversation_id }
            | Self::StatusChanged { conversation_id, .. }
            | Self::TranscriptReset { conversation_id, .. } => Some(conversation_id),
            Self::Cleared => None,
        }
    }
}
