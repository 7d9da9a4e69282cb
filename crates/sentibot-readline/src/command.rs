//! Parsing of REPL input lines.

/// Slash commands offered for completion and hints.
pub const COMMANDS: &[&str] = &["/new", "/history", "/load", "/end", "/help"];

pub const HELP_TEXT: &str = "\
Commands:
  /new               save this chat and start a new one
  /history           list saved chats, most recent first
  /load <n|name>     open a saved chat by list number or file name
  /end               analyze this chat (verdict, trend, chart) and save it
  /help              show this help
  quit | exit        leave SentiBOT
Anything else is sent to the bot. Ctrl-C interrupts a reply.";

/// Which saved session `/load` refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// 1-based position in the `/history` listing.
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NewChat,
    History,
    Load(SessionRef),
    EndAndAnalyze,
    Help,
    Quit,
    Chat(String),
    /// A slash command that is unknown or misused; carries a usage message.
    Invalid(String),
}

impl Command {
    /// Interprets one line of input. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return Some(Command::Quit);
        }
        if !trimmed.starts_with('/') {
            return Some(Command::Chat(trimmed.to_string()));
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (trimmed, ""),
        };

        let command = match (name, arg) {
            ("/new", "") => Command::NewChat,
            ("/history", "") => Command::History,
            ("/end", "") => Command::EndAndAnalyze,
            ("/help", "") => Command::Help,
            ("/load", "") => Command::Invalid("Usage: /load <n|name>".to_string()),
            ("/load", target) => Command::Load(match target.parse::<usize>() {
                Ok(index) => SessionRef::Index(index),
                Err(_) => SessionRef::Name(target.to_string()),
            }),
            (known, _) if COMMANDS.contains(&known) => {
                Command::Invalid(format!("{} takes no arguments", known))
            }
            (unknown, _) => Command::Invalid(format!(
                "Unknown command {}. Type /help for the list.",
                unknown
            )),
        };
        Some(command)
    }
}
