//! Console Core - Headless Conversation Engine for the OmniServe Console
//!
//! This crate holds the state and orchestration behind the support console:
//! the conversation registry, the per-conversation message logs, and the
//! session controller that relays customer messages to an external AI agent.
//! It has no UI of its own; the `omniserve-console` shell and the tests
//! drive it directly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Front ends                               │
//! │   Dashboard     Conversations     Knowledge Base     Chat Widget │
//! │       │              │                  │                 │      │
//! │       └──── view::{Navigator, ConversationsView, ChatWidget} ────┘│
//! └───────────────┬───────────────────────────────┬──────────────────┘
//!                 │ snapshot / subscribe          │ send_message
//! ┌───────────────┴──────────────┐   ┌────────────┴──────────────────┐
//! │     ConversationRegistry     │◀──│       SessionController       │
//! │  Conversation ── MessageLog  │   │  single-flight, epoch check   │
//! └──────────────────────────────┘   └────────────┬──────────────────┘
//!                                                 │ invoke
//!                                    ┌────────────┴──────────────────┐
//!                                    │  AgentCallAdapter (HTTP, ...) │
//!                                    └───────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ConversationRegistry`]: Owner of every conversation, with change notifications
//! - [`Conversation`]: One customer thread and its status
//! - [`MessageLog`]: Append-only transcript with a single typing placeholder
//! - [`SessionController`]: Sends a customer message and applies the agent's reply
//! - [`AgentCallAdapter`]: Seam to the external AI agent
//! - [`KnowledgeBase`]: Crawled pages and uploads for the agent's knowledge base
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use console_core::{
//!     ConversationId, ConversationRegistry, ControllerConfig, HttpAgentAdapter,
//!     SessionController,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(ConversationRegistry::new());
//!     let adapter = HttpAgentAdapter::new("http://localhost:8787/agent");
//!     let controller = SessionController::new(
//!         Arc::clone(&registry),
//!         adapter,
//!         ControllerConfig { agent_id: "support".to_string() },
//!     );
//!
//!     let id = ConversationId::new("conv_001");
//!     let outcome = controller.send_message(&id, "Where is my order?").await;
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`message_log`]: Messages and the append-only log
//! - [`conversation`]: Conversations and status transitions
//! - [`registry`]: Conversation registry and transactions
//! - [`events`]: Change notifications published by the registry
//! - [`agent`]: Agent call adapters
//! - [`controller`]: Session controller
//! - [`filter`]: Status filter and search
//! - [`metrics`]: Dashboard figures
//! - [`knowledge`]: Knowledge base ingestion
//! - [`view`]: Per-screen view state
//! - [`seed`]: Demo data and JSON import
//! - [`config`]: TOML and environment configuration
//! - [`format`]: Display helpers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod events;
pub mod filter;
pub mod format;
pub mod knowledge;
pub mod message_log;
pub mod metrics;
pub mod registry;
pub mod seed;
pub mod view;

// Re-exports for convenience
pub use agent::{
    AgentCallAdapter, AgentResponse, AgentResult, CallFailure, HttpAgentAdapter, TimeoutAdapter,
};
pub use controller::{
    ControllerConfig, FallbackReason, SendError, SendOutcome, SessionController,
    CALL_FAILURE_FALLBACK, EMPTY_REPLY_FALLBACK, REPLY_FALLBACK,
};
pub use conversation::{Conversation, ConversationId, ConversationStatus, Transition};
pub use events::RegistryEvent;
pub use filter::StatusFilter;
pub use knowledge::{
    HttpIngestor, IndexedPage, IngestError, IngestReceipt, KnowledgeBase, KnowledgeIngestor,
    KnowledgeResource,
};
pub use message_log::{Message, MessageId, MessageLog, Sender};
pub use metrics::{DashboardMetrics, ResponseTimes};
pub use registry::{ConversationRegistry, RegistryError, RegistryTxn};
pub use view::{ChatError, ChatWidget, ConversationsView, CustomerForm, Navigator, Screen};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, ConsoleConfig,
};
