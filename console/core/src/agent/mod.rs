//! Agent Call Adapters
//!
//! Access to the external AI response agent through a common trait.
//!
//! # Available Adapters
//!
//! - **HTTP**: JSON envelope over HTTP (default)
//! - **Timeout**: decorator bounding any adapter's call time
//!
//! # Usage
//!
//! ```ignore
//! use console_core::agent::{AgentCallAdapter, HttpAgentAdapter};
//!
//! let adapter = HttpAgentAdapter::new("http://localhost:8787/agent");
//! let reply = adapter.invoke("What are your hours?", "support-agent").await?;
//! ```

mod http;
mod timeout;
mod traits;

pub use http::HttpAgentAdapter;
pub use timeout::TimeoutAdapter;
pub use traits::{AgentCallAdapter, AgentResponse, AgentResult, CallFailure};

use std::time::Duration;

/// Whole milliseconds for log fields, saturating at `u64::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
