//! Bot behaviour, independent of the transport.
//!
//! The gateway session feeds decoded events into [`Bot`] and carries out the
//! [`Action`] it returns. Nothing in here touches the network, which keeps
//! command handling testable without a live connection.

pub mod commands;
pub mod startup_log;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::gateway::protocol::{Message, Ready};

pub use commands::{Command, CommandSet, TEAM_REPLY};
pub use startup_log::StartupLog;

/// What the session should do in response to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send `content` to `channel_id`.
    Reply { channel_id: String, content: String },
    /// Close the connection and stop the worker. Nothing is sent back.
    Shutdown,
}

pub struct Bot {
    commands: CommandSet,
    startup_log: StartupLog,
    started: bool,
}

impl Bot {
    pub fn new(commands: CommandSet, startup_log: StartupLog) -> Self {
        Self {
            commands,
            startup_log,
            started: false,
        }
    }

    /// Handle a `READY` dispatch.
    ///
    /// Only the first one in the bot's lifetime is written to the startup log;
    /// later ones come from reconnects.
    pub async fn on_ready(&mut self, ready: &Ready) {
        if self.started {
            info!(user = %ready.user.username, "gateway session re-established");
            return;
        }
        self.started = true;
        info!(user = %ready.user.username, session_id = %ready.session_id, "bot is ready");

        if let Err(e) = self.startup_log.record_start(&Local::now()).await {
            warn!(
                path = %self.startup_log.path().display(),
                error = %e,
                "failed to append startup log line"
            );
        }
    }

    /// Handle a `MESSAGE_CREATE` dispatch.
    ///
    /// Returns `None` for anything that is not a registered command, and for
    /// every message written by a bot account.
    pub fn on_message(&self, message: &Message) -> Option<Action> {
        if message.author.bot {
            return None;
        }

        let Some(command) = self.commands.resolve(&message.content) else {
            if let Some(name) = self.commands.invoked_name(&message.content) {
                debug!(command = name, channel_id = %message.channel_id, "unknown command ignored");
            }
            return None;
        };

        info!(
            command = %command,
            channel_id = %message.channel_id,
            message_id = %message.id,
            author_id = %message.author.id,
            "command received"
        );

        let action = match command {
            Command::Team => Action::Reply {
                channel_id: message.channel_id.clone(),
                content: TEAM_REPLY.to_string(),
            },
            Command::Quit => Action::Shutdown,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::protocol::User;

    fn bot_in(dir: &tempfile::TempDir) -> Bot {
        Bot::new(CommandSet::new('-'), StartupLog::new(dir.path().join("log.txt")))
    }

    fn ready() -> Ready {
        Ready {
            user: User {
                id: "1".into(),
                username: "FunBot".into(),
                bot: true,
            },
            session_id: "s".into(),
        }
    }

    fn message(content: &str) -> Message {
        Message {
            id: "900".into(),
            channel_id: "123".into(),
            content: content.into(),
            author: User {
                id: "7".into(),
                username: "alice".into(),
                bot: false,
            },
        }
    }

    fn log_lines(dir: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("log.txt"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    // -----------------------------------------------------------------------
    // READY
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn first_ready_appends_one_timestamped_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = bot_in(&dir);
        bot.on_ready(&ready()).await;

        let lines = log_lines(&dir);
        assert_eq!(lines.len(), 1);
        let stamp = lines[0].strip_prefix("Bot has started - ").unwrap();
        assert!(
            chrono::NaiveDateTime::parse_from_str(stamp, "%d/%m/%Y %H:%M:%S").is_ok(),
            "unexpected timestamp: {stamp}"
        );
    }

    #[tokio::test]
    async fn later_ready_does_not_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = bot_in(&dir);
        bot.on_ready(&ready()).await;
        bot.on_ready(&ready()).await;
        assert_eq!(log_lines(&dir).len(), 1);
    }

    #[tokio::test]
    async fn unwritable_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = Bot::new(
            CommandSet::new('-'),
            StartupLog::new(dir.path().join("missing").join("log.txt")),
        );
        bot.on_ready(&ready()).await;
    }

    // -----------------------------------------------------------------------
    // MESSAGE_CREATE
    // -----------------------------------------------------------------------

    #[test]
    fn team_replies_hi_to_origin_channel() {
        let dir = tempfile::tempdir().unwrap();
        let action = bot_in(&dir).on_message(&message("-team"));
        assert_eq!(
            action,
            Some(Action::Reply {
                channel_id: "123".into(),
                content: "Hi".into(),
            })
        );
    }

    #[test]
    fn quit_requests_shutdown_without_reply() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(bot_in(&dir).on_message(&message("-quit")), Some(Action::Shutdown));
    }

    #[test]
    fn non_commands_produce_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let bot = bot_in(&dir);
        for content in ["hello", "-dance", "-", "team", ""] {
            assert_eq!(bot.on_message(&message(content)), None, "content: {content:?}");
        }
        assert!(log_lines(&dir).is_empty(), "messages must not touch the log");
    }

    #[test]
    fn messages_from_bots_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut msg = message("-team");
        msg.author.bot = true;
        assert_eq!(bot_in(&dir).on_message(&msg), None);
    }
}
