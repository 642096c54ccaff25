//! View state
//!
//! Each screen's state is a plain struct owned by whichever front end drives
//! it. Nothing here is global; reads go through the registry.

use thiserror::Error;

use crate::conversation::{Conversation, ConversationId, ConversationStatus, Transition};
use crate::filter::{filter, StatusFilter};
use crate::message_log::Message;
use crate::registry::{ConversationRegistry, RegistryError};

/// Top-level screens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Metrics overview
    #[default]
    Dashboard,
    /// Conversation list and transcript
    Conversations,
    /// Knowledge base management
    Knowledge,
    /// Customer chat widget preview
    Chat,
}

impl Screen {
    /// Navigation order
    pub const ALL: [Self; 4] = [Self::Dashboard, Self::Conversations, Self::Knowledge, Self::Chat];

    /// Title shown in navigation
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Conversations => "Conversations",
            Self::Knowledge => "Knowledge Base",
            Self::Chat => "Chat Widget",
        }
    }
}

/// Which screen is showing
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    screen: Screen,
}

impl Navigator {
    /// Start on the dashboard
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current screen
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Switch screens; returns the previous one
    pub fn navigate(&mut self, screen: Screen) -> Screen {
        let previous = self.screen;
        if previous != screen {
            tracing::debug!(from = previous.title(), to = screen.title(), "Navigate");
        }
        self.screen = screen;
        previous
    }
}

/// Conversations screen state
#[derive(Clone, Debug, Default)]
pub struct ConversationsView {
    /// Status constraint
    pub status_filter: StatusFilter,
    /// Search text
    pub query: String,
    selected: Option<ConversationId>,
}

impl ConversationsView {
    /// Unfiltered view with no selection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the status filter
    pub fn set_filter(&mut self, status_filter: StatusFilter) {
        self.status_filter = status_filter;
    }

    /// Change the search text
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Select a conversation for the detail pane
    pub fn select(&mut self, id: ConversationId) {
        self.selected = Some(id);
    }

    /// Close the detail pane
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Selected conversation id
    #[must_use]
    pub fn selected(&self) -> Option<&ConversationId> {
        self.selected.as_ref()
    }

    /// Current state of the selected conversation
    #[must_use]
    pub fn selected_conversation(&self, registry: &ConversationRegistry) -> Option<Conversation> {
        self.selected.as_ref().and_then(|id| registry.get(id))
    }

    /// Conversations passing the filter and search, in registry order
    #[must_use]
    pub fn visible(&self, registry: &ConversationRegistry) -> Vec<Conversation> {
        filter(&registry.snapshot(), self.status_filter, &self.query)
    }

    /// Whether the resolve action applies to the selection
    #[must_use]
    pub fn can_resolve(&self, registry: &ConversationRegistry) -> bool {
        self.selected_status(registry)
            .is_some_and(|status| status != ConversationStatus::Resolved)
    }

    /// Whether the escalate action applies to the selection
    #[must_use]
    pub fn can_escalate(&self, registry: &ConversationRegistry) -> bool {
        self.selected_status(registry)
            .is_some_and(|status| status != ConversationStatus::Escalated)
    }

    /// Resolve the selected conversation; `Ok(None)` when nothing is selected
    pub fn mark_selected_resolved(
        &self,
        registry: &ConversationRegistry,
    ) -> Result<Option<Transition>, RegistryError> {
        self.selected
            .as_ref()
            .map(|id| registry.mark_resolved(id))
            .transpose()
    }

    /// Escalate the selected conversation; `Ok(None)` when nothing is selected
    pub fn escalate_selected(
        &self,
        registry: &ConversationRegistry,
    ) -> Result<Option<Transition>, RegistryError> {
        self.selected
            .as_ref()
            .map(|id| registry.escalate(id))
            .transpose()
    }

    fn selected_status(&self, registry: &ConversationRegistry) -> Option<ConversationStatus> {
        self.selected
            .as_ref()
            .and_then(|id| registry.with_conversation(id, Conversation::status))
    }
}

/// Customer identity collected before a chat starts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomerForm {
    /// Customer display name
    pub name: String,
    /// Customer email
    pub email: String,
}

/// Errors starting a chat
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Name left blank
    #[error("name is required")]
    MissingName,

    /// Email left blank
    #[error("email is required")]
    MissingEmail,

    /// A chat is already running in this widget
    #[error("a chat session is already active: {0}")]
    SessionActive(ConversationId),

    /// Registry refused the new conversation
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Greeting appended when a chat starts
#[must_use]
pub fn welcome_message(name: &str, brand: &str) -> String {
    format!("Hello {name}! Welcome to {brand} Support. How can I help you today?")
}

/// Chat widget state
#[derive(Clone, Debug, Default)]
pub struct ChatWidget {
    /// Whether the widget is open
    pub expanded: bool,
    /// Identity form
    pub form: CustomerForm,
    session: Option<ConversationId>,
    /// Unsent input
    pub draft: String,
}

impl ChatWidget {
    /// Collapsed widget with an empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or close the widget
    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    /// Conversation this widget is chatting in
    #[must_use]
    pub fn session(&self) -> Option<&ConversationId> {
        self.session.as_ref()
    }

    /// Create an active conversation from the form and greet the customer
    pub fn start_chat(
        &mut self,
        registry: &ConversationRegistry,
        brand: &str,
    ) -> Result<ConversationId, ChatError> {
        if let Some(id) = &self.session {
            return Err(ChatError::SessionActive(id.clone()));
        }
        let name = self.form.name.trim();
        let email = self.form.email.trim();
        if name.is_empty() {
            return Err(ChatError::MissingName);
        }
        if email.is_empty() {
            return Err(ChatError::MissingEmail);
        }

        let conversation = Conversation::new(ConversationId::generate(), name, email);
        let id = conversation.id.clone();
        let greeting = Message::agent(welcome_message(name, brand));

        registry.transaction(|txn| {
            txn.insert(conversation)?;
            txn.append(&id, greeting).map(|_| ())
        })?;

        tracing::info!(conversation_id = %id, "Chat session started");
        self.session = Some(id.clone());
        self.expanded = true;
        Ok(id)
    }

    /// Leave the current chat; the conversation stays in the registry
    pub fn end_chat(&mut self) -> Option<ConversationId> {
        self.draft.clear();
        self.form = CustomerForm::default();
        self.session.take()
    }

    /// Take the draft for sending, clearing it.
    ///
    /// Blank drafts are left in place and yield `None`.
    pub fn take_draft(&mut self) -> Option<String> {
        if self.draft.trim().is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.draft))
    }
}
