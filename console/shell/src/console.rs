//! Operator console state and command execution
//!
//! Owns the registry, the session controller, the knowledge base and the
//! per-screen view state. Agent sends and crawls run as background tasks so
//! the prompt stays responsive; their results are printed when they land.

use std::sync::Arc;

use chrono::Utc;
use console_core::{
    AgentCallAdapter, ChatWidget, ConsoleConfig, ConversationId, ConversationRegistry,
    ConversationsView, CustomerForm, DashboardMetrics, KnowledgeBase, KnowledgeIngestor,
    Navigator, Screen, SendOutcome, Sender, SessionController,
};
use tokio::task::JoinHandle;

use crate::commands::{Command, HELP};
use crate::render;

/// Agent adapter chosen at startup
pub type DynAdapter = Arc<dyn AgentCallAdapter>;

/// Knowledge ingestor chosen at startup
pub type DynIngestor = Arc<dyn KnowledgeIngestor>;

/// What the prompt loop should do next
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    /// Print this and read the next command
    Continue(String),
    /// Exit the loop
    Quit,
}

/// Interactive console
pub struct Console {
    config: ConsoleConfig,
    registry: Arc<ConversationRegistry>,
    controller: Arc<SessionController<DynAdapter>>,
    knowledge: KnowledgeBase<DynIngestor>,
    navigator: Navigator,
    conversations: ConversationsView,
    chat: ChatWidget,
    last_send: Option<JoinHandle<()>>,
    last_crawl: Option<JoinHandle<()>>,
}

impl Console {
    /// Assemble a console from its parts
    pub fn new(
        config: ConsoleConfig,
        controller: SessionController<DynAdapter>,
        knowledge: KnowledgeBase<DynIngestor>,
    ) -> Self {
        Self {
            config,
            registry: Arc::clone(controller.registry()),
            controller: Arc::new(controller),
            knowledge,
            navigator: Navigator::new(),
            conversations: ConversationsView::new(),
            chat: ChatWidget::new(),
            last_send: None,
            last_crawl: None,
        }
    }

    /// Shared registry
    pub fn registry(&self) -> &Arc<ConversationRegistry> {
        &self.registry
    }

    /// Current screen
    pub fn screen(&self) -> Screen {
        self.navigator.screen()
    }

    /// Run one command
    pub async fn execute(&mut self, command: Command) -> Flow {
        let now = Utc::now();
        let output = match command {
            Command::Dashboard => {
                self.navigator.navigate(Screen::Dashboard);
                let metrics = DashboardMetrics::compute(
                    &self.registry.snapshot(),
                    self.controller.response_times(),
                );
                render::dashboard(&metrics, now)
            }
            Command::List { status, query } => {
                self.navigator.navigate(Screen::Conversations);
                self.conversations.set_filter(status);
                self.conversations.set_query(query);
                render::conversation_list(&self.conversations.visible(&self.registry), now)
            }
            Command::Open(id) => {
                self.navigator.navigate(Screen::Conversations);
                match self.registry.get(&id) {
                    Some(conversation) => {
                        self.conversations.select(id);
                        render::transcript(&conversation, now)
                    }
                    None => format!("Unknown conversation: {id}\n"),
                }
            }
            Command::Resolve(id) => self.transition(id, true),
            Command::Escalate(id) => self.transition(id, false),
            Command::Chat { name, email } => {
                self.navigator.navigate(Screen::Chat);
                self.chat.form = CustomerForm { name, email };
                match self.chat.start_chat(&self.registry, &self.config.brand_name) {
                    Ok(id) => self
                        .registry
                        .get(&id)
                        .map(|c| render::transcript(&c, now))
                        .unwrap_or_default(),
                    Err(e) => format!("{e}\n"),
                }
            }
            Command::Say(text) => {
                self.chat.draft = text;
                self.say()
            }
            Command::EndChat => match self.chat.end_chat() {
                Some(id) => format!("Left chat {id}\n"),
                None => "No active chat\n".to_string(),
            },
            Command::Reset => self.reset(),
            Command::Crawl(url) => self.crawl(&url),
            Command::Upload(path) => {
                self.navigator.navigate(Screen::Knowledge);
                match self.knowledge.upload(&path).await {
                    Ok(_) => format!("Uploaded {}\n", path.display()),
                    Err(e) => format!("Upload failed: {e}\n"),
                }
            }
            Command::Pages => {
                self.navigator.navigate(Screen::Knowledge);
                render::pages(&self.knowledge.pages(), self.knowledge.is_crawling(), now)
            }
            Command::Help => format!("{HELP}\n"),
            Command::Quit => return Flow::Quit,
        };
        Flow::Continue(output)
    }

    /// Wait for the most recent send and crawl to finish
    pub async fn settle(&mut self) {
        if let Some(handle) = self.last_send.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.last_crawl.take() {
            let _ = handle.await;
        }
    }

    fn target(&self, id: Option<ConversationId>) -> Option<ConversationId> {
        id.or_else(|| self.conversations.selected().cloned())
    }

    fn transition(&mut self, id: Option<ConversationId>, resolve: bool) -> String {
        let Some(id) = self.target(id) else {
            return "No conversation selected\n".to_string();
        };
        let result = if resolve {
            self.registry.mark_resolved(&id)
        } else {
            self.registry.escalate(&id)
        };
        match result {
            Ok(transition) if transition.is_changed() => {
                let status = self
                    .registry
                    .with_conversation(&id, |c| c.status())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                format!("{id} is now {status}\n")
            }
            Ok(_) => format!("{id} unchanged\n"),
            Err(e) => format!("{e}\n"),
        }
    }

    fn say(&mut self) -> String {
        let Some(id) = self.chat.session().cloned() else {
            return "Start a chat first: chat <name..> <email>\n".to_string();
        };
        // Mirrors a disabled send button: the draft stays for later
        if self.controller.is_in_flight(&id) {
            return String::new();
        }
        let Some(text) = self.chat.take_draft() else {
            return String::new();
        };

        let echo = format!("{}: {text}\n", Sender::Customer.label());
        let controller = Arc::clone(&self.controller);
        self.last_send = Some(tokio::spawn(async move {
            match controller.send_message(&id, &text).await {
                Ok(SendOutcome::Discarded) => {
                    println!("(reply discarded, transcript was reset)");
                }
                Ok(outcome) => {
                    if let Some(reply) = outcome.reply() {
                        println!("{}", render::message_line(reply, Utc::now()));
                    }
                }
                Err(e) => tracing::debug!(conversation_id = %id, error = %e, "Send rejected"),
            }
        }));
        echo
    }

    fn reset(&mut self) -> String {
        let Some(id) = self
            .chat
            .session()
            .cloned()
            .or_else(|| self.conversations.selected().cloned())
        else {
            return "No conversation to reset\n".to_string();
        };
        match self.controller.reset_transcript(&id) {
            Ok(_) => format!("Transcript for {id} reset\n"),
            Err(e) => format!("{e}\n"),
        }
    }

    fn crawl(&mut self, url: &str) -> String {
        self.navigator.navigate(Screen::Knowledge);
        match self.knowledge.crawl(url) {
            Ok(handle) => {
                let url = url.trim().to_string();
                let started = format!("Crawling {url}...\n");
                self.last_crawl = Some(tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(_)) => println!("Crawled {url}"),
                        Ok(Err(e)) => println!("Crawl of {url} failed: {e}"),
                        Err(e) => tracing::warn!(error = %e, "Crawl task aborted"),
                    }
                }));
                started
            }
            Err(e) => format!("{e}\n"),
        }
    }
}
