//! Gateway wire format (JSON encoding, API v10).
//!
//! Only the opcodes and dispatch events the bot reacts to are modelled.
//! Everything else decodes into a catch-all variant and is ignored by the
//! session loop.

use serde::Deserialize;
use serde_json::{json, Value};

pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intents requested on identify.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;

    /// Everything needed to read command text in servers and DMs.
    pub const COMMANDS: u64 = GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT;
}

/// Raw gateway frame: `{"op": .., "d": .., "s": .., "t": ..}`.
#[derive(Debug, Deserialize)]
pub struct Payload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// `READY` dispatch body.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub user: User,
    pub session_id: String,
}

/// `MESSAGE_CREATE` dispatch body.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: User,
}

#[derive(Debug)]
pub enum Dispatch {
    Ready(Ready),
    MessageCreate(Message),
    Other(String),
}

/// A decoded inbound frame.
#[derive(Debug)]
pub enum Event {
    Hello { heartbeat_interval: u64 },
    HeartbeatRequest,
    HeartbeatAck,
    Reconnect,
    InvalidSession { resumable: bool },
    Dispatch { seq: Option<u64>, event: Dispatch },
    Unknown(u8),
}

impl Event {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        let payload: Payload = serde_json::from_str(text)?;
        Self::from_payload(payload)
    }

    pub fn from_payload(payload: Payload) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        struct Hello {
            heartbeat_interval: u64,
        }

        let event = match payload.op {
            opcode::HELLO => {
                let hello: Hello = serde_json::from_value(payload.d)?;
                Self::Hello {
                    heartbeat_interval: hello.heartbeat_interval,
                }
            }
            opcode::HEARTBEAT => Self::HeartbeatRequest,
            opcode::HEARTBEAT_ACK => Self::HeartbeatAck,
            opcode::RECONNECT => Self::Reconnect,
            opcode::INVALID_SESSION => Self::InvalidSession {
                resumable: payload.d.as_bool().unwrap_or(false),
            },
            opcode::DISPATCH => {
                let name = payload.t.unwrap_or_default();
                let event = match name.as_str() {
                    "READY" => Dispatch::Ready(serde_json::from_value(payload.d)?),
                    "MESSAGE_CREATE" => Dispatch::MessageCreate(serde_json::from_value(payload.d)?),
                    _ => Dispatch::Other(name),
                };
                Self::Dispatch {
                    seq: payload.s,
                    event,
                }
            }
            other => Self::Unknown(other),
        };
        Ok(event)
    }
}

/// Op 2 frame carrying the bot token.
pub fn identify(token: &str, intents: u64) -> String {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "funbot",
                "device": "funbot",
            },
        },
    })
    .to_string()
}

/// Op 1 frame carrying the last sequence number seen (or `null`).
pub fn heartbeat(seq: Option<u64>) -> String {
    json!({ "op": opcode::HEARTBEAT, "d": seq }).to_string()
}
