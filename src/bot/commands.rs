//! Prefix command table.
//!
//! A message is a command when it starts with the prefix character followed
//! immediately by a word. The word (up to the first whitespace) is looked up
//! in the table; anything after it is ignored. Lookup is case-sensitive.

use std::collections::HashMap;

/// Reply sent for the `team` command.
pub const TEAM_REPLY: &str = "Hi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Close the platform connection and stop the worker.
    Quit,
    /// Reply with [`TEAM_REPLY`] in the invoking channel.
    Team,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::Quit, Command::Team];

    pub fn name(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Team => "team",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name → command mapping for one prefix.
#[derive(Debug, Clone)]
pub struct CommandSet {
    prefix: char,
    table: HashMap<&'static str, Command>,
}

impl CommandSet {
    /// Register every [`Command`] under `prefix`.
    pub fn new(prefix: char) -> Self {
        let table = Command::ALL.iter().map(|c| (c.name(), *c)).collect();
        Self { prefix, table }
    }

    /// Extract the invoked name from `content`, if it is shaped like a command.
    ///
    /// Returns `None` for a missing prefix or an empty name (`"-"`, `"- team"`).
    pub fn invoked_name<'a>(&self, content: &'a str) -> Option<&'a str> {
        let rest = content.strip_prefix(self.prefix)?;
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..end];
        (!name.is_empty()).then_some(name)
    }

    /// Resolve `content` to a registered command.
    ///
    /// `None` means "not a command": the caller does nothing.
    pub fn resolve(&self, content: &str) -> Option<Command> {
        self.invoked_name(content)
            .and_then(|name| self.table.get(name).copied())
    }
}
