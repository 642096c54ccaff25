//! Conversation Registry
//!
//! Keyed collection of every conversation the console knows about, in
//! insertion order. The registry is the single owner of conversation state;
//! the session controller and explicit operator actions are the only
//! mutators, and read-side views work from [`ConversationRegistry::snapshot`].
//!
//! # Notifications
//!
//! ```text
//!   transaction(|txn| { append; escalate; ... })
//!          │
//!          ├─ write lock held for the closure only
//!          │
//!          ▼
//!   collected RegistryEvents ──try_send──▶ subscriber 1
//!                                      ──▶ subscriber 2
//!                                      ──▶ ...
//! ```
//!
//! Events are published after the write lock is released so a slow
//! subscriber can never stall a writer. Subscribers whose receiver has been
//! dropped are pruned on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::conversation::{Conversation, ConversationId, Transition};
use crate::events::RegistryEvent;
use crate::message_log::Message;

/// Buffered events per subscriber before new ones are dropped
pub const SUBSCRIBER_CAPACITY: usize = 256;

/// Errors from registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No conversation with this ID
    #[error("unknown conversation: {0}")]
    UnknownConversation(ConversationId),

    /// A conversation with this ID already exists
    #[error("conversation already exists: {0}")]
    DuplicateConversation(ConversationId),
}

/// Identifier for a registry subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Default)]
struct Inner {
    order: Vec<ConversationId>,
    conversations: HashMap<ConversationId, Conversation>,
}

impl Inner {
    fn get_mut(&mut self, id: &ConversationId) -> Result<&mut Conversation, RegistryError> {
        self.conversations
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownConversation(id.clone()))
    }
}

/// A batch of mutations applied under one write lock.
///
/// Obtained from [`ConversationRegistry::transaction`]. Every mutating call
/// records the matching [`RegistryEvent`], published once the batch ends.
pub struct RegistryTxn<'a> {
    inner: &'a mut Inner,
    events: Vec<RegistryEvent>,
}

impl RegistryTxn<'_> {
    /// Look up a conversation
    #[must_use]
    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.inner.conversations.get(id)
    }

    /// Whether a conversation exists
    #[must_use]
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.inner.conversations.contains_key(id)
    }

    /// Add a conversation at the end of the display order
    pub fn insert(&mut self, conversation: Conversation) -> Result<(), RegistryError> {
        let id = conversation.id.clone();
        if self.inner.conversations.contains_key(&id) {
            return Err(RegistryError::DuplicateConversation(id));
        }
        self.inner.order.push(id.clone());
        self.inner.conversations.insert(id.clone(), conversation);
        self.events.push(RegistryEvent::ConversationAdded {
            conversation_id: id,
        });
        Ok(())
    }

    /// Append a message to a conversation's log
    pub fn append(&mut self, id: &ConversationId, message: Message) -> Result<bool, RegistryError> {
        let conversation = self.inner.get_mut(id)?;
        let event = RegistryEvent::MessageAppended {
            conversation_id: id.clone(),
            message_id: message.id.clone(),
            sender: message.sender,
            transient: message.is_transient,
        };
        let appended = conversation.append(message);
        if appended {
            self.events.push(event);
        }
        Ok(appended)
    }

    /// Remove the typing placeholder from a conversation
    pub fn remove_transient(&mut self, id: &ConversationId) -> Result<Option<Message>, RegistryError> {
        let removed = self.inner.get_mut(id)?.remove_transient();
        if removed.is_some() {
            self.events.push(RegistryEvent::TypingCleared {
                conversation_id: id.clone(),
            });
        }
        Ok(removed)
    }

    /// Mark a conversation resolved
    pub fn mark_resolved(&mut self, id: &ConversationId) -> Result<Transition, RegistryError> {
        let transition = self.inner.get_mut(id)?.mark_resolved();
        self.record_transition(id, transition);
        Ok(transition)
    }

    /// Escalate a conversation to human handling
    pub fn escalate(&mut self, id: &ConversationId) -> Result<Transition, RegistryError> {
        let transition = self.inner.get_mut(id)?.escalate();
        self.record_transition(id, transition);
        Ok(transition)
    }

    /// Start a new transcript for a conversation
    pub fn reset_transcript(&mut self, id: &ConversationId) -> Result<u64, RegistryError> {
        let epoch = self.inner.get_mut(id)?.reset_transcript();
        self.events.push(RegistryEvent::TranscriptReset {
            conversation_id: id.clone(),
            epoch,
        });
        Ok(epoch)
    }

    fn record_transition(&mut self, id: &ConversationId, transition: Transition) {
        if let Transition::Changed { from, to } = transition {
            self.events.push(RegistryEvent::StatusChanged {
                conversation_id: id.clone(),
                from,
                to,
            });
        }
    }
}

/// Insertion-ordered registry of conversations with change notifications
pub struct ConversationRegistry {
    inner: RwLock<Inner>,
    subscribers: Mutex<Vec<(SubscriberId, mpsc::Sender<RegistryEvent>)>>,
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConversationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRegistry")
            .field("conversations", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ConversationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Create a registry pre-populated with conversations (duplicates are skipped)
    pub fn with_conversations(conversations: impl IntoIterator<Item = Conversation>) -> Self {
        let registry = Self::new();
        registry.transaction(|txn| {
            for conversation in conversations {
                if let Err(e) = txn.insert(conversation) {
                    tracing::warn!(error = %e, "Skipping conversation during import");
                }
            }
        });
        registry
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> mpsc::Receiver<RegistryEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = SubscriberId::next();
        self.subscribers.lock().push((id, tx));
        tracing::debug!(subscriber = id.0, "Registry subscriber added");
        rx
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Apply a batch of mutations atomically, then notify subscribers
    pub fn transaction<R>(&self, f: impl FnOnce(&mut RegistryTxn<'_>) -> R) -> R {
        let (result, events) = {
            let mut inner = self.inner.write();
            let mut txn = RegistryTxn {
                inner: &mut *inner,
                events: Vec::new(),
            };
            let result = f(&mut txn);
            (result, txn.events)
        };

        for event in events {
            self.publish(event);
        }
        result
    }

    /// Add a conversation
    pub fn insert(&self, conversation: Conversation) -> Result<(), RegistryError> {
        self.transaction(|txn| txn.insert(conversation))
    }

    /// Append a message to a conversation
    pub fn append(&self, id: &ConversationId, message: Message) -> Result<bool, RegistryError> {
        self.transaction(|txn| txn.append(id, message))
    }

    /// Operator action: mark a conversation resolved
    pub fn mark_resolved(&self, id: &ConversationId) -> Result<Transition, RegistryError> {
        self.transaction(|txn| txn.mark_resolved(id))
    }

    /// Operator action: escalate a conversation
    pub fn escalate(&self, id: &ConversationId) -> Result<Transition, RegistryError> {
        self.transaction(|txn| txn.escalate(id))
    }

    /// Remove every conversation
    pub fn clear(&self) {
        {
            let mut inner = self.inner.write();
            inner.order.clear();
            inner.conversations.clear();
        }
        self.publish(RegistryEvent::Cleared);
    }

    /// Clone of one conversation
    #[must_use]
    pub fn get(&self, id: &ConversationId) -> Option<Conversation> {
        self.inner.read().conversations.get(id).cloned()
    }

    /// Read one conversation without cloning it
    pub fn with_conversation<R>(
        &self,
        id: &ConversationId,
        f: impl FnOnce(&Conversation) -> R,
    ) -> Option<R> {
        self.inner.read().conversations.get(id).map(f)
    }

    /// Whether a conversation exists
    #[must_use]
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.inner.read().conversations.contains_key(id)
    }

    /// Number of conversations
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// IDs in display order
    #[must_use]
    pub fn ids(&self) -> Vec<ConversationId> {
        self.inner.read().order.clone()
    }

    /// Consistent copy of every conversation, in display order.
    ///
    /// Taken under a single read lock, so it never mixes state from before
    /// and after a concurrent transaction.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Conversation> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.conversations.get(id).cloned())
            .collect()
    }

    fn publish(&self, event: RegistryEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(subscriber = id.0, "Registry subscriber lagging, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = id.0, "Registry subscriber closed");
                false
            }
        });
    }
}
