//! Agent Call Adapter Traits
//!
//! The console never talks to the AI agent directly. It hands one outbound
//! text and an agent identifier to an [`AgentCallAdapter`] and gets back a
//! structured reply, an empty reply, or a [`CallFailure`].
//!
//! Only the reply contract lives here; transports live in sibling modules.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ConversationId;

/// Structured part of an agent reply
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentResult {
    /// Text to show the customer
    pub response_message: String,
    /// Whether the agent consulted the knowledge base
    pub knowledge_base_used: bool,
    /// Helpdesk action the agent performed, if any
    pub intercom_action_taken: String,
    /// Whether a human should take over
    pub escalation_needed: bool,
    /// Conversation the agent associates with this exchange
    pub conversation_id: Option<String>,
}

impl AgentResult {
    /// Adapter-supplied conversation id, ignoring blanks
    #[must_use]
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ConversationId::new)
    }
}

/// Full agent reply envelope
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Coarse status reported by the agent
    #[serde(default)]
    pub status: String,
    /// Structured result, when the agent produced one
    #[serde(default)]
    pub result: Option<AgentResult>,
    /// Opaque extra data; never interpreted by the console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl AgentResponse {
    /// Build a reply carrying just a response message
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            result: Some(AgentResult {
                response_message: message.into(),
                ..AgentResult::default()
            }),
            metadata: None,
        }
    }

    /// Mark this reply as requiring escalation
    #[must_use]
    pub fn with_escalation(mut self, conversation_id: Option<&str>) -> Self {
        let result = self.result.get_or_insert_with(AgentResult::default);
        result.escalation_needed = true;
        result.conversation_id = conversation_id.map(str::to_string);
        self
    }

    /// The response message, if non-empty
    #[must_use]
    pub fn response_message(&self) -> Option<&str> {
        self.result
            .as_ref()
            .map(|r| r.response_message.as_str())
            .filter(|m| !m.trim().is_empty())
    }

    /// Whether the agent asked for a human handoff
    #[must_use]
    pub fn escalation_needed(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.escalation_needed)
    }
}

/// Errors from an agent call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// Could not reach the agent
    #[error("agent transport error: {0}")]
    Transport(String),

    /// Agent endpoint answered with a non-success HTTP status
    #[error("agent returned HTTP {0}")]
    Status(u16),

    /// Reply body could not be decoded
    #[error("could not decode agent reply: {0}")]
    Decode(String),

    /// No reply within the configured limit
    #[error("agent call timed out after {0} ms")]
    Timeout(u64),
}

/// Agent Call Adapter
///
/// Implement this to connect the console to an agent runtime.
#[async_trait]
pub trait AgentCallAdapter: Send + Sync {
    /// Adapter name for logs
    fn name(&self) -> &str;

    /// Perform one agent call.
    ///
    /// `Ok(None)` means the call completed but produced no usable reply.
    async fn invoke(
        &self,
        message: &str,
        agent_id: &str,
    ) -> Result<Option<AgentResponse>, CallFailure>;
}

#[async_trait]
impl<T: AgentCallAdapter + ?Sized> AgentCallAdapter for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn invoke(
        &self,
        message: &str,
        agent_id: &str,
    ) -> Result<Option<AgentResponse>, CallFailure> {
        (**self).invoke(message, agent_id).await
    }
}
