//! Operator command parsing
//!
//! One line of input is one command. Words are split on whitespace. The
//! text of `say` is kept exactly as typed after the command word; `list`
//! queries and `chat` names have their inner spacing collapsed.

use std::path::PathBuf;
use std::str::FromStr;

use console_core::conversation::UnknownStatus;
use console_core::{ConversationId, StatusFilter};
use thiserror::Error;

/// A parsed operator command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show dashboard metrics
    Dashboard,
    /// List conversations
    List {
        /// Status constraint
        status: StatusFilter,
        /// Search text
        query: String,
    },
    /// Show one conversation's transcript
    Open(ConversationId),
    /// Resolve a conversation (selected one when omitted)
    Resolve(Option<ConversationId>),
    /// Escalate a conversation (selected one when omitted)
    Escalate(Option<ConversationId>),
    /// Start a chat as a customer
    Chat {
        /// Customer name
        name: String,
        /// Customer email
        email: String,
    },
    /// Send a message in the current chat
    Say(String),
    /// Leave the current chat
    EndChat,
    /// Start a new transcript for the current chat
    Reset,
    /// Crawl a page into the knowledge base
    Crawl(String),
    /// Upload a document into the knowledge base
    Upload(PathBuf),
    /// List indexed pages
    Pages,
    /// Show help
    Help,
    /// Exit
    Quit,
}

/// Errors parsing a command line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Line was blank
    #[error("empty command")]
    Empty,

    /// Unrecognised command word
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    /// A required argument is missing
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Bad status name
    #[error(transparent)]
    Status(#[from] UnknownStatus),
}

/// Help text listing every command
pub const HELP: &str = "\
Commands:
  dashboard                   Show dashboard metrics
  list [status] [query..]     List conversations (status: all|active|resolved|escalated)
  open <id>                   Show a conversation transcript
  resolve [id]                Mark a conversation resolved
  escalate [id]               Escalate a conversation to a human
  chat <name..> <email>       Start a chat as a customer
  say <text..>                Send a message in the current chat
  end                         Leave the current chat
  reset                       Start a new transcript for the current chat
  crawl <url>                 Crawl a page into the knowledge base
  upload <path>               Upload a document into the knowledge base
  pages                       List indexed pages
  help                        Show this help
  quit                        Exit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let rest: Vec<&str> = words.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "dashboard" | "dash" => Self::Dashboard,
            "list" | "ls" => parse_list(&rest)?,
            "open" => Self::Open(single(&rest, "open <id>")?.into()),
            "resolve" => Self::Resolve(optional_id(&rest, "resolve [id]")?),
            "escalate" => Self::Escalate(optional_id(&rest, "escalate [id]")?),
            "chat" => {
                let (email, name) = rest.split_last().ok_or(CommandError::Usage("chat <name..> <email>"))?;
                if name.is_empty() {
                    return Err(CommandError::Usage("chat <name..> <email>"));
                }
                Self::Chat {
                    name: name.join(" "),
                    email: (*email).to_string(),
                }
            }
            "say" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("say <text..>"));
                }
                Self::Say(remainder(line, head).to_string())
            }
            "end" => Self::EndChat,
            "reset" => Self::Reset,
            "crawl" => Self::Crawl(single(&rest, "crawl <url>")?.to_string()),
            "upload" => Self::Upload(PathBuf::from(single(&rest, "upload <path>")?)),
            "pages" => Self::Pages,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Everything after the command word, spacing kept as typed
fn remainder<'a>(line: &'a str, head: &str) -> &'a str {
    let line = line.trim_start();
    line[head.len()..].trim_start()
}

fn single<'a>(rest: &[&'a str], usage: &'static str) -> Result<&'a str, CommandError> {
    match rest {
        [one] => Ok(one),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn optional_id(rest: &[&str], usage: &'static str) -> Result<Option<ConversationId>, CommandError> {
    match rest {
        [] => Ok(None),
        [id] => Ok(Some(ConversationId::new(*id))),
        _ => Err(CommandError::Usage(usage)),
    }
}

/// First word is a status filter when it parses as one; the rest is the query
fn parse_list(rest: &[&str]) -> Result<Command, CommandError> {
    let (status, query) = match rest.split_first() {
        Some((first, tail)) => match first.parse::<StatusFilter>() {
            Ok(status) => (status, tail),
            Err(_) => (StatusFilter::All, rest),
        },
        None => (StatusFilter::All, rest),
    };
    Ok(Command::List {
        status,
        query: query.join(" "),
    })
}
