//! Error type for the gateway session.
//!
//! [`GatewayError`] separates the failures the session loop recovers from
//! (dropped sockets, garbage frames, non-fatal close codes) from the ones
//! that end the worker for good. [`GatewayError::is_fatal`] is the single
//! place that decision is made.
//!
//! Setup code outside the session (config, REST client construction, the
//! worker thread itself) uses [`anyhow::Error`] with context instead.

use tokio_tungstenite::tungstenite;

/// Close codes after which reconnecting cannot succeed.
///
/// 4004 authentication failed, 4010 invalid shard, 4011 sharding required,
/// 4012 invalid API version, 4013 invalid intents, 4014 disallowed intents.
const FATAL_CLOSE_CODES: &[u16] = &[4004, 4010, 4011, 4012, 4013, 4014];

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed gateway payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected gateway message: {0}")]
    Protocol(String),

    #[error("gateway closed the connection (code {code}): {reason}")]
    Closed { code: u16, reason: String },
}

impl GatewayError {
    /// True when the platform has rejected this client outright.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed { code, .. } if FATAL_CLOSE_CODES.contains(code))
    }
}
