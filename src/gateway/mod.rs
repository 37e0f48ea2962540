//! Minimal client for the messaging platform: websocket gateway plus the one
//! REST call the bot needs.

pub mod protocol;
pub mod rest;
pub mod session;

#[cfg(test)]
pub mod fake;

pub use rest::RestClient;
pub use session::Session;
