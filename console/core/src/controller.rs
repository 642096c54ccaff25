//! Conversation Session Controller
//!
//! Orchestrates one outbound customer message:
//!
//! ```text
//!  send_message(id, text)
//!     │
//!     ├─ validate: non-empty, nothing in flight for this transcript
//!     ├─ append customer message + typing placeholder   (one transaction)
//!     │
//!     ├─ adapter.invoke(text, agent_id).await            (only suspension point)
//!     │
//!     └─ settle                                          (one transaction)
//!          ├─ transcript reset meanwhile? → discard result
//!          ├─ remove placeholder
//!          ├─ append reply, or a fallback apology
//!          └─ escalation_needed? → escalate target conversation
//! ```
//!
//! The in-flight slot is an RAII guard, so it is released on every exit
//! path including an error or a dropped future. A send whose future is
//! dropped mid-call still settles: the placeholder is replaced by the
//! call-failure apology, provided the transcript was not reset meanwhile.
//! Different conversations
//! never contend with each other; the registry write lock is only held for
//! the two short transactions, never across the agent call.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use thiserror::Error;

use crate::agent::{saturating_millis, AgentCallAdapter, AgentResponse, CallFailure};
use crate::conversation::{Conversation, ConversationId};
use crate::message_log::Message;
use crate::metrics::ResponseTimes;
use crate::registry::{ConversationRegistry, RegistryError, RegistryTxn};

/// Shown when the agent replied without a message or status
pub const REPLY_FALLBACK: &str = "I apologize, but I encountered an issue. Please try again.";

/// Shown when the agent call completed without a usable reply
pub const EMPTY_REPLY_FALLBACK: &str =
    "I apologize, but I'm having trouble connecting right now. Please try again in a moment.";

/// Shown when the agent call failed outright
pub const CALL_FAILURE_FALLBACK: &str = "I apologize, but I encountered an error. Please try again.";

/// Rejections from [`SessionController::send_message`].
///
/// None of these change any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Text was empty after trimming
    #[error("message is empty")]
    EmptyMessage,

    /// A send is already pending for this conversation
    #[error("a message is already in flight for {0}")]
    InFlight(ConversationId),

    /// No such conversation
    #[error("unknown conversation: {0}")]
    UnknownConversation(ConversationId),
}

impl From<RegistryError> for SendError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownConversation(id) | RegistryError::DuplicateConversation(id) => {
                Self::UnknownConversation(id)
            }
        }
    }
}

/// Why a fallback message was appended instead of an agent reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Call completed without a usable reply
    EmptyReply,
    /// Call failed
    CallFailed(CallFailure),
}

/// How a send settled
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The agent replied
    Replied {
        /// The appended agent message
        reply: Message,
        /// Conversation escalated because the agent asked for it
        escalated: Option<ConversationId>,
    },
    /// A fallback apology was appended
    Fallback {
        /// The appended agent message
        reply: Message,
        /// What went wrong
        reason: FallbackReason,
    },
    /// The transcript was reset while the call was pending; nothing applied
    Discarded,
}

impl SendOutcome {
    /// The agent message appended by this send, if any
    #[must_use]
    pub fn reply(&self) -> Option<&Message> {
        match self {
            Self::Replied { reply, .. } | Self::Fallback { reply, .. } => Some(reply),
            Self::Discarded => None,
        }
    }
}

type SlotKey = (ConversationId, u64);

/// Holds a conversation's in-flight slot until dropped
struct InFlightGuard<'a> {
    slots: &'a DashMap<SlotKey, Instant>,
    key: SlotKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slots.remove(&self.key);
    }
}

/// Settles a send with the call-failure apology if it is dropped while armed
struct SettleGuard<'a> {
    registry: &'a ConversationRegistry,
    conversation_id: &'a ConversationId,
    epoch: u64,
    armed: bool,
}

impl SettleGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let conversation_id = self.conversation_id;
        let epoch = self.epoch;
        let settled = self.registry.transaction(|txn| {
            if txn.get(conversation_id).map(Conversation::epoch) != Some(epoch) {
                return false;
            }
            let _ = txn.remove_transient(conversation_id);
            txn.append(conversation_id, Message::agent(CALL_FAILURE_FALLBACK))
                .is_ok()
        });
        if settled {
            tracing::warn!(
                conversation_id = %conversation_id,
                "Send cancelled while agent call was pending"
            );
        }
    }
}

/// Session controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Agent identifier passed on every call
    pub agent_id: String,
}

/// Orchestrates sends between the registry and an agent adapter
pub struct SessionController<A: AgentCallAdapter> {
    registry: Arc<ConversationRegistry>,
    adapter: A,
    config: ControllerConfig,
    /// Pending sends keyed by conversation and transcript epoch
    in_flight: DashMap<SlotKey, Instant>,
    response_times: Arc<ResponseTimes>,
}

impl<A: AgentCallAdapter> SessionController<A> {
    /// Create a controller over `registry` using `adapter`
    pub fn new(registry: Arc<ConversationRegistry>, adapter: A, config: ControllerConfig) -> Self {
        Self {
            registry,
            adapter,
            config,
            in_flight: DashMap::new(),
            response_times: Arc::new(ResponseTimes::new()),
        }
    }

    /// Share a response-time accumulator with the dashboard
    #[must_use]
    pub fn with_response_times(mut self, response_times: Arc<ResponseTimes>) -> Self {
        self.response_times = response_times;
        self
    }

    /// The registry this controller mutates
    #[must_use]
    pub fn registry(&self) -> &Arc<ConversationRegistry> {
        &self.registry
    }

    /// Recorded agent round-trip times
    #[must_use]
    pub fn response_times(&self) -> &Arc<ResponseTimes> {
        &self.response_times
    }

    /// Agent identifier used for calls
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    /// Whether a send is pending for the conversation's current transcript
    #[must_use]
    pub fn is_in_flight(&self, conversation_id: &ConversationId) -> bool {
        self.registry
            .with_conversation(conversation_id, Conversation::epoch)
            .is_some_and(|epoch| {
                self.in_flight
                    .contains_key(&(conversation_id.clone(), epoch))
            })
    }

    /// Operator reset of a conversation's transcript.
    ///
    /// A send still pending for the old transcript settles into
    /// [`SendOutcome::Discarded`]; the new transcript accepts sends at once.
    pub fn reset_transcript(&self, conversation_id: &ConversationId) -> Result<u64, RegistryError> {
        let epoch = self
            .registry
            .transaction(|txn| txn.reset_transcript(conversation_id))?;
        tracing::info!(conversation_id = %conversation_id, epoch, "Transcript reset");
        Ok(epoch)
    }

    /// Send a customer message and wait for the agent's reply
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<SendOutcome, SendError> {
        if text.trim().is_empty() {
            tracing::debug!(conversation_id = %conversation_id, "Ignoring empty message");
            return Err(SendError::EmptyMessage);
        }

        let (guard, epoch) = self.registry.transaction(|txn| {
            let epoch = txn
                .get(conversation_id)
                .map(Conversation::epoch)
                .ok_or_else(|| SendError::UnknownConversation(conversation_id.clone()))?;
            let guard = self.acquire(conversation_id, epoch)?;
            txn.append(conversation_id, Message::customer(text))?;
            txn.append(conversation_id, Message::typing())?;
            Ok::<_, SendError>((guard, epoch))
        })?;
        let pending = SettleGuard {
            registry: &self.registry,
            conversation_id,
            epoch,
            armed: true,
        };

        tracing::debug!(
            conversation_id = %conversation_id,
            adapter = self.adapter.name(),
            agent_id = %self.config.agent_id,
            "Calling agent"
        );

        let start = Instant::now();
        let result = self.adapter.invoke(text, &self.config.agent_id).await;
        let elapsed = start.elapsed();
        if result.is_ok() {
            self.response_times.record(elapsed);
        }

        let outcome = self
            .registry
            .transaction(|txn| settle(txn, conversation_id, epoch, result));
        pending.disarm();

        tracing::debug!(
            conversation_id = %conversation_id,
            elapsed_ms = saturating_millis(elapsed),
            "Send settled"
        );
        drop(guard);
        Ok(outcome)
    }

    fn acquire(&self, conversation_id: &ConversationId, epoch: u64) -> Result<InFlightGuard<'_>, SendError> {
        let key = (conversation_id.clone(), epoch);
        match self.in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                tracing::debug!(conversation_id = %conversation_id, "Send already in flight");
                return Err(SendError::InFlight(conversation_id.clone()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Instant::now());
            }
        }
        Ok(InFlightGuard {
            slots: &self.in_flight,
            key,
        })
    }
}

/// Apply a settled agent call to the conversation
fn settle(
    txn: &mut RegistryTxn<'_>,
    conversation_id: &ConversationId,
    epoch: u64,
    result: Result<Option<AgentResponse>, CallFailure>,
) -> SendOutcome {
    if txn.get(conversation_id).map(Conversation::epoch) != Some(epoch) {
        tracing::info!(
            conversation_id = %conversation_id,
            "Transcript changed while agent call was pending, discarding reply"
        );
        return SendOutcome::Discarded;
    }

    // The conversation exists (checked above), so these cannot fail.
    let _ = txn.remove_transient(conversation_id);

    match result {
        Ok(Some(response)) => {
            let reply = Message::agent(reply_content(&response));
            let _ = txn.append(conversation_id, reply.clone());

            let escalated = response.escalation_needed().then(|| {
                let target = escalation_target(txn, &response, conversation_id);
                if let Ok(transition) = txn.escalate(&target) {
                    tracing::info!(
                        conversation_id = %target,
                        changed = transition.is_changed(),
                        "Agent requested escalation"
                    );
                }
                target
            });

            SendOutcome::Replied { reply, escalated }
        }
        Ok(None) => {
            tracing::warn!(conversation_id = %conversation_id, "Agent returned no usable reply");
            let reply = Message::agent(EMPTY_REPLY_FALLBACK);
            let _ = txn.append(conversation_id, reply.clone());
            SendOutcome::Fallback {
                reply,
                reason: FallbackReason::EmptyReply,
            }
        }
        Err(failure) => {
            tracing::warn!(conversation_id = %conversation_id, error = %failure, "Agent call failed");
            let reply = Message::agent(CALL_FAILURE_FALLBACK);
            let _ = txn.append(conversation_id, reply.clone());
            SendOutcome::Fallback {
                reply,
                reason: FallbackReason::CallFailed(failure),
            }
        }
    }
}

/// Response message, else the coarse status, else a generic apology
fn reply_content(response: &AgentResponse) -> String {
    response
        .response_message()
        .or_else(|| Some(response.status.as_str()).filter(|s| !s.trim().is_empty()))
        .unwrap_or(REPLY_FALLBACK)
        .to_string()
}

/// Adapter-supplied conversation when it is known, else the sending one
fn escalation_target(
    txn: &RegistryTxn<'_>,
    response: &AgentResponse,
    own: &ConversationId,
) -> ConversationId {
    match response.result.as_ref().and_then(|r| r.conversation_id()) {
        Some(id) if txn.contains(&id) => id,
        Some(id) => {
            tracing::debug!(
                supplied = %id,
                fallback = %own,
                "Escalation target not in registry, using sending conversation"
            );
            own.clone()
        }
        None => own.clone(),
    }
}
