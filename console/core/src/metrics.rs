//! Dashboard metrics
//!
//! Aggregates computed from a registry snapshot, plus the agent round-trip
//! accumulator the session controller feeds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::conversation::{Conversation, ConversationStatus};

/// Conversations shown in the dashboard's recent list
pub const RECENT_LIMIT: usize = 5;

/// Running total of agent call latencies, updated lock-free
#[derive(Debug, Default)]
pub struct ResponseTimes {
    calls: AtomicU64,
    total_micros: AtomicU64,
}

impl ResponseTimes {
    /// Empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed call
    pub fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of recorded calls
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Mean latency, `None` before the first call
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let calls = self.calls.load(Ordering::Relaxed);
        if calls == 0 {
            return None;
        }
        Some(Duration::from_micros(
            self.total_micros.load(Ordering::Relaxed) / calls,
        ))
    }
}

/// Dashboard figures
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardMetrics {
    /// Conversations in the registry
    pub total_conversations: usize,
    /// Conversations with status active
    pub active_chats: usize,
    /// Share of resolved conversations, as a rounded percentage
    pub resolution_rate: u32,
    /// Mean agent latency
    pub avg_response_time: Option<Duration>,
    /// Escalated conversations, in registry order
    pub pending_handoffs: Vec<Conversation>,
    /// First conversations in registry order
    pub recent: Vec<Conversation>,
}

impl DashboardMetrics {
    /// Compute metrics from a registry snapshot
    #[must_use]
    pub fn compute(snapshot: &[Conversation], response_times: &ResponseTimes) -> Self {
        let total = snapshot.len();
        let count = |status| snapshot.iter().filter(|c| c.status() == status).count();
        let resolved = count(ConversationStatus::Resolved);

        let resolution_rate = if total == 0 {
            0
        } else {
            ((resolved as f64 / total as f64) * 100.0).round() as u32
        };

        Self {
            total_conversations: total,
            active_chats: count(ConversationStatus::Active),
            resolution_rate,
            avg_response_time: response_times.average(),
            pending_handoffs: snapshot
                .iter()
                .filter(|c| c.status() == ConversationStatus::Escalated)
                .cloned()
                .collect(),
            recent: snapshot.iter().take(RECENT_LIMIT).cloned().collect(),
        }
    }

    /// Average response time like `2.3s`, or `-` before any call
    #[must_use]
    pub fn avg_response_label(&self) -> String {
        match self.avg_response_time {
            Some(avg) => format!("{:.1}s", avg.as_secs_f64()),
            None => "-".to_string(),
        }
    }
}
