//! HTTP Agent Adapter
//!
//! Posts `{ "message", "agent_id" }` to an agent endpoint and reads back an
//! envelope of the form:
//!
//! ```json
//! { "success": true, "response": { "status": "...", "result": { ... } } }
//! ```
//!
//! Transport errors, non-2xx statuses and non-JSON bodies are
//! [`CallFailure`]s. A well-formed envelope reporting `success: false`, or
//! one whose `response` does not match [`AgentResponse`], is an empty reply.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::saturating_millis;
use super::traits::{AgentCallAdapter, AgentResponse, CallFailure};

#[derive(Serialize)]
struct AgentRequest<'a> {
    message: &'a str,
    agent_id: &'a str,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    response: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Agent adapter speaking JSON over HTTP
#[derive(Clone, Debug)]
pub struct HttpAgentAdapter {
    /// Full URL of the agent endpoint
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpAgentAdapter {
    /// Create an adapter for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("omniserve-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into(),
            http_client,
        }
    }

    /// The configured endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Interpret a decoded envelope
fn unwrap_envelope(envelope: Envelope) -> Option<AgentResponse> {
    if !envelope.success {
        tracing::warn!(
            error = envelope.error.as_deref().unwrap_or("unspecified"),
            "Agent reported failure"
        );
        return None;
    }

    let value = envelope.response?;
    match serde_json::from_value::<AgentResponse>(value) {
        Ok(response) => Some(response),
        Err(e) => {
            tracing::warn!(error = %e, "Agent response missing required fields");
            None
        }
    }
}

#[async_trait]
impl AgentCallAdapter for HttpAgentAdapter {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn invoke(
        &self,
        message: &str,
        agent_id: &str,
    ) -> Result<Option<AgentResponse>, CallFailure> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&AgentRequest { message, agent_id })
            .send()
            .await
            .map_err(|e| CallFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallFailure::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CallFailure::Transport(e.to_string()))?;

        let envelope: Envelope =
            serde_json::from_slice(&body).map_err(|e| CallFailure::Decode(e.to_string()))?;

        tracing::debug!(
            endpoint = %self.endpoint,
            agent_id,
            elapsed_ms = saturating_millis(start.elapsed()),
            "Agent call completed"
        );

        Ok(unwrap_envelope(envelope))
    }
}
