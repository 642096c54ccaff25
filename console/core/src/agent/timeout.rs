//! Boundary timeout for agent calls
//!
//! The session controller imposes no deadline of its own. Deployments that
//! want one wrap their adapter in a [`TimeoutAdapter`]; an elapsed deadline
//! surfaces as [`CallFailure::Timeout`] and takes the normal fallback path.

use std::time::Duration;

use async_trait::async_trait;

use super::saturating_millis;
use super::traits::{AgentCallAdapter, AgentResponse, CallFailure};

/// Adapter decorator that bounds each call
#[derive(Clone, Debug)]
pub struct TimeoutAdapter<A> {
    inner: A,
    timeout: Duration,
}

impl<A: AgentCallAdapter> TimeoutAdapter<A> {
    /// Wrap `inner`, failing calls that take longer than `timeout`
    pub fn new(inner: A, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The wrapped adapter
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: AgentCallAdapter> AgentCallAdapter for TimeoutAdapter<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(
        &self,
        message: &str,
        agent_id: &str,
    ) -> Result<Option<AgentResponse>, CallFailure> {
        match tokio::time::timeout(self.timeout, self.inner.invoke(message, agent_id)).await {
            Ok(result) => result,
            Err(_) => {
                let after_ms = saturating_millis(self.timeout);
                tracing::warn!(adapter = self.inner.name(), after_ms, "Agent call timed out");
                Err(CallFailure::Timeout(after_ms))
            }
        }
    }
}
