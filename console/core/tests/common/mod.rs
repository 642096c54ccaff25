//! Test agent adapters shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use console_core::{AgentCallAdapter, AgentResponse, CallFailure, Conversation, ConversationId};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Semaphore};

pub type CallResult = Result<Option<AgentResponse>, CallFailure>;

/// Answers calls from a fixed script, in order
#[derive(Default)]
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<CallResult>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedAdapter {
    pub fn new(script: impl IntoIterator<Item = CallResult>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(message: &str) -> Self {
        Self::new([Ok(Some(AgentResponse::reply(message)))])
    }

    /// `(message, agent_id)` pairs received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AgentCallAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, message: &str, agent_id: &str) -> CallResult {
        self.calls
            .lock()
            .push((message.to_string(), agent_id.to_string()));
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CallFailure::Transport("script exhausted".to_string())))
    }
}

/// Holds each call open until the test releases it
pub struct GatedAdapter {
    gates: Mutex<HashMap<String, oneshot::Receiver<CallResult>>>,
    started: Semaphore,
}

impl GatedAdapter {
    pub fn new() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
            started: Semaphore::new(0),
        }
    }

    /// Register a gate for calls carrying `message`; send on the returned
    /// sender to let the call finish
    pub fn gate(&self, message: &str) -> oneshot::Sender<CallResult> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(message.to_string(), rx);
        tx
    }

    /// Wait until one more call has reached the adapter
    pub async fn wait_started(&self) {
        if let Ok(permit) = self.started.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl AgentCallAdapter for GatedAdapter {
    fn name(&self) -> &str {
        "gated"
    }

    async fn invoke(&self, message: &str, _agent_id: &str) -> CallResult {
        let gate = self.gates.lock().remove(message);
        self.started.add_permits(1);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(CallFailure::Transport("gate dropped".to_string()))),
            None => Err(CallFailure::Transport(format!("no gate for {message}"))),
        }
    }
}

pub fn conversation(id: &str, name: &str) -> Conversation {
    let email = format!("{}@example.com", name.to_lowercase());
    Conversation::new(ConversationId::new(id), name, email)
}
