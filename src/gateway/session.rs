//! Gateway session loop.
//!
//! One [`Session`] owns the connection for the life of the worker:
//!
//! 1. connect to `{gateway_url}/?v=10&encoding=json` and wait for Hello
//! 2. send Identify
//! 3. heartbeat every `heartbeat_interval` ms with the last sequence seen
//! 4. feed READY / MESSAGE_CREATE into the [`Bot`] and carry out its [`Action`]
//!
//! Dropped connections, op 7, op 9 and non-fatal close codes lead to a fresh
//! connect + Identify after a delay that starts at 1 s, doubles per failed
//! attempt (capped at 60 s) and resets once a READY has been seen. Fatal
//! close codes end the session with an error. Cancelling the token ends it
//! with `Ok`, sending a normal close frame if a connection is open.

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message as WsMessage,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    protocol::{self, intents, opcode, Dispatch, Event, Payload},
    rest::RestClient,
};
use crate::{
    bot::{Action, Bot},
    error::GatewayError,
};

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// How a single connection ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Shutdown,
    Reconnect,
}

/// A websocket frame reduced to what the loop cares about.
enum Incoming {
    Text(String),
    Ended,
    Skip,
}

pub struct Session<'a> {
    gateway_url: &'a str,
    token: &'a str,
    bot: &'a mut Bot,
    rest: &'a RestClient,
    cancel: CancellationToken,
    seq: Option<u64>,
    reached_ready: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        gateway_url: &'a str,
        token: &'a str,
        bot: &'a mut Bot,
        rest: &'a RestClient,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway_url,
            token,
            bot,
            rest,
            cancel,
            seq: None,
            reached_ready: false,
        }
    }

    /// Run until cancelled, told to quit, or rejected with a fatal close code.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let mut delay = INITIAL_RECONNECT_DELAY;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            self.seq = None;
            self.reached_ready = false;

            match self.connect_once().await {
                Ok(Outcome::Shutdown) => return Ok(()),
                Ok(Outcome::Reconnect) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "gateway connection lost"),
            }

            if self.reached_ready {
                delay = INITIAL_RECONNECT_DELAY;
            }

            info!(delay_ms = delay.as_millis() as u64, "reconnecting to gateway");
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
            delay = (delay * 2).min(MAX_RECONNECT_DELAY);
        }
    }

    async fn connect_once(&mut self) -> Result<Outcome, GatewayError> {
        let url = format!("{}/?v=10&encoding=json", self.gateway_url.trim_end_matches('/'));
        debug!(%url, "connecting to gateway");

        let cancel = self.cancel.clone();
        let handshake = async {
            let (ws, _) = connect_async(url.as_str()).await?;
            let (sink, mut stream) = ws.split();
            let interval = loop {
                match classify(stream.next().await)? {
                    Incoming::Text(text) => match Event::decode(&text)? {
                        Event::Hello { heartbeat_interval } => break heartbeat_interval,
                        other => {
                            return Err(GatewayError::Protocol(format!(
                                "expected Hello, got {other:?}"
                            )))
                        }
                    },
                    Incoming::Ended => {
                        return Err(GatewayError::Protocol("connection closed before Hello".into()))
                    }
                    Incoming::Skip => continue,
                }
            };
            Ok::<_, GatewayError>((sink, stream, interval))
        };

        let (mut sink, mut stream, interval_ms) = tokio::select! {
            _ = cancel.cancelled() => return Ok(Outcome::Shutdown),
            result = handshake => result?,
        };

        sink.send(WsMessage::Text(protocol::identify(self.token, intents::COMMANDS)))
            .await?;
        debug!(heartbeat_interval_ms = interval_ms, "identify sent");

        let mut heartbeat = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the first beat is due one interval in.
        heartbeat.tick().await;
        let mut awaiting_ack = false;

        loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    close(&mut sink).await;
                    return Ok(Outcome::Shutdown);
                }
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        warn!("no heartbeat ACK since the last beat, dropping connection");
                        return Ok(Outcome::Reconnect);
                    }
                    sink.send(WsMessage::Text(protocol::heartbeat(self.seq))).await?;
                    awaiting_ack = true;
                    continue;
                }
                frame = stream.next() => frame,
            };

            let text = match classify(frame)? {
                Incoming::Text(text) => text,
                Incoming::Ended => return Ok(Outcome::Reconnect),
                Incoming::Skip => continue,
            };

            let payload: Payload = match serde_json::from_str(&text) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "ignoring undecodable gateway frame");
                    continue;
                }
            };

            // A dispatch counts toward the sequence even if its body is unusable.
            if payload.op == opcode::DISPATCH && payload.s.is_some() {
                self.seq = payload.s;
            }

            let event = match Event::from_payload(payload) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "ignoring gateway event with unexpected body");
                    continue;
                }
            };

            match event {
                Event::HeartbeatAck => awaiting_ack = false,
                Event::HeartbeatRequest => {
                    sink.send(WsMessage::Text(protocol::heartbeat(self.seq))).await?;
                }
                Event::Reconnect => {
                    info!("gateway requested reconnect");
                    return Ok(Outcome::Reconnect);
                }
                Event::InvalidSession { resumable } => {
                    warn!(resumable, "gateway invalidated the session");
                    return Ok(Outcome::Reconnect);
                }
                Event::Hello { .. } => {}
                Event::Unknown(op) => debug!(op, "ignoring unknown opcode"),
                Event::Dispatch { event, .. } => {
                    if self.dispatch(event).await == Some(Outcome::Shutdown) {
                        close(&mut sink).await;
                        return Ok(Outcome::Shutdown);
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, event: Dispatch) -> Option<Outcome> {
        match event {
            Dispatch::Ready(ready) => {
                self.reached_ready = true;
                self.bot.on_ready(&ready).await;
            }
            Dispatch::MessageCreate(message) => match self.bot.on_message(&message)? {
                Action::Reply {
                    channel_id,
                    content,
                } => {
                    if let Err(e) = self.rest.create_message(&channel_id, &content).await {
                        warn!(%channel_id, error = %format!("{e:#}"), "failed to send reply");
                    }
                }
                Action::Shutdown => {
                    info!("quit command received, closing gateway connection");
                    self.cancel.cancel();
                    return Some(Outcome::Shutdown);
                }
            },
            Dispatch::Other(name) => debug!(event = %name, "unhandled dispatch"),
        }
        None
    }
}

fn classify(frame: Option<Result<WsMessage, tungstenite::Error>>) -> Result<Incoming, GatewayError> {
    match frame {
        None => Ok(Incoming::Ended),
        Some(Err(e)) => Err(e.into()),
        Some(Ok(WsMessage::Text(text))) => Ok(Incoming::Text(text)),
        Some(Ok(WsMessage::Close(Some(frame)))) => Err(GatewayError::Closed {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }),
        Some(Ok(WsMessage::Close(None))) => Ok(Incoming::Ended),
        Some(Ok(_)) => Ok(Incoming::Skip),
    }
}

async fn close<S>(sink: &mut S)
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    };
    if let Err(e) = sink.send(WsMessage::Close(Some(frame))).await {
        debug!(error = %e, "close frame not delivered");
    }
}
