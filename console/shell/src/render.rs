//! Plain-text rendering of console screens

use std::fmt::Write;

use chrono::{DateTime, Utc};
use console_core::format::{initials, relative_time};
use console_core::{Conversation, DashboardMetrics, IndexedPage, Message, Sender};

/// Dashboard cards, pending handoffs and recent conversations
pub fn dashboard(metrics: &DashboardMetrics, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total Conversations  {}", metrics.total_conversations);
    let _ = writeln!(out, "Active Chats         {}", metrics.active_chats);
    let _ = writeln!(out, "Avg Response Time    {}", metrics.avg_response_label());
    let _ = writeln!(out, "Resolution Rate      {}%", metrics.resolution_rate);

    let _ = writeln!(out, "\nPending Handoffs");
    if metrics.pending_handoffs.is_empty() {
        let _ = writeln!(out, "  No pending handoffs");
    }
    for conversation in &metrics.pending_handoffs {
        let _ = writeln!(out, "  {}", summary_line(conversation, now));
    }

    let _ = writeln!(out, "\nRecent Conversations");
    for conversation in &metrics.recent {
        let _ = writeln!(out, "  {}", summary_line(conversation, now));
    }
    out
}

/// One line per conversation
pub fn conversation_list(conversations: &[Conversation], now: DateTime<Utc>) -> String {
    if conversations.is_empty() {
        return "No conversations found\n".to_string();
    }
    conversations
        .iter()
        .map(|c| format!("{}\n", summary_line(c, now)))
        .collect()
}

/// Header plus full transcript
pub fn transcript(conversation: &Conversation, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] {} <{}>  {}  ({} messages)",
        initials(&conversation.customer_name),
        conversation.customer_name,
        conversation.customer_email,
        conversation.status(),
        conversation.message_count(),
    );
    for message in conversation.messages() {
        let _ = writeln!(out, "  {}", message_line(message, now));
    }
    out
}

/// A single transcript line
pub fn message_line(message: &Message, now: DateTime<Utc>) -> String {
    if message.is_transient {
        return format!("{}: ...", Sender::Agent.label());
    }
    format!(
        "{} ({}): {}",
        message.sender.label(),
        relative_time(message.timestamp, now),
        message.content
    )
}

/// Indexed knowledge base pages
pub fn pages(pages: &[IndexedPage], crawling: bool, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    if crawling {
        let _ = writeln!(out, "Crawling...");
    }
    if pages.is_empty() {
        let _ = writeln!(out, "No pages indexed");
    }
    for page in pages {
        let _ = writeln!(out, "  {}  Updated {}", page.url, relative_time(page.last_updated, now));
    }
    out
}

fn summary_line(conversation: &Conversation, now: DateTime<Utc>) -> String {
    format!(
        "{:<10} {:<18} {:<10} {:>9}  {}",
        conversation.id.as_str(),
        conversation.customer_name,
        conversation.status().as_str(),
        relative_time(conversation.timestamp(), now),
        conversation.last_message(),
    )
}
