//! Input lines of the interactive client.

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/chats`: print the chat list.
    Chats,
    /// `/open <n>`: select the n-th chat (1-based) of the last listing.
    Open(usize),
    /// `/retry`: re-run failed fetches.
    Retry,
    /// `/connect`: start the incoming feed.
    Connect,
    /// `/disconnect`: stop the incoming feed.
    Disconnect,
    /// `/dump`: print both views as JSON.
    Dump,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything not starting with `/` is sent to the selected chat.
    Send(String),
    /// Unrecognized or malformed command, with a hint.
    Invalid(String),
}

impl Command {
    /// Parses one input line. Returns `None` for blank lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Some(Self::Send(line.trim_end_matches(['\r', '\n']).to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let command = match name {
            "chats" => Self::Chats,
            "open" => match parts.next().map(str::parse::<usize>) {
                Some(Ok(n)) if n > 0 => Self::Open(n),
                _ => Self::Invalid("usage: /open <number>".to_string()),
            },
            "retry" => Self::Retry,
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "dump" => Self::Dump,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command /{other}, try /help")),
        };
        Some(command)
    }
}

/// Shown for `/help`.
pub const HELP: &str = "\
/chats          list chats
/open <n>       open chat number n
/retry          retry a failed load
/connect        start incoming messages
/disconnect     stop incoming messages
/dump           print state as JSON
/help           show this list
/quit           exit
<text>          send to the open chat";
