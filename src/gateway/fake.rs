//! Scripted in-process gateway for session and worker tests.
//!
//! Each inner `Vec<Step>` is played against one accepted connection, in order.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    WebSocketStream,
};

pub enum Step {
    /// Send a JSON frame to the client.
    Send(Value),
    /// Read the next text frame and assert its opcode.
    Expect(u8),
    /// Close the connection with the given code.
    CloseWith(u16),
    /// Read until the client closes or drops the connection.
    AwaitClientClose,
}

/// Everything the fake saw from the client.
#[derive(Debug, Default)]
pub struct Transcript {
    pub received: Vec<Value>,
    /// Close frames sent by the client.
    pub client_closes: usize,
}

pub struct FakeGateway {
    pub url: String,
    task: JoinHandle<Transcript>,
}

impl FakeGateway {
    /// Wait for every script to finish and return what was received.
    pub async fn finish(self) -> Transcript {
        self.task.await.expect("fake gateway panicked")
    }
}

pub async fn spawn(connections: Vec<Vec<Step>>) -> FakeGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let task = tokio::spawn(async move {
        let mut transcript = Transcript::default();
        for script in connections {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            for step in script {
                play(&mut ws, step, &mut transcript).await;
            }
        }
        transcript
    });

    FakeGateway { url, task }
}

async fn play(
    ws: &mut WebSocketStream<tokio::net::TcpStream>,
    step: Step,
    transcript: &mut Transcript,
) {
    match step {
        Step::Send(frame) => ws.send(Message::Text(frame.to_string())).await.unwrap(),
        Step::Expect(op) => loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: Value = serde_json::from_str(&text).unwrap();
                    assert_eq!(frame["op"], op, "unexpected frame: {frame}");
                    transcript.received.push(frame);
                    break;
                }
                Some(Ok(Message::Close(_))) | None => panic!("client went away, expected op {op}"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("read failed, expected op {op}: {e}"),
            }
        },
        Step::CloseWith(code) => {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: "closed by fake gateway".into(),
            };
            ws.close(Some(frame)).await.unwrap();
        }
        Step::AwaitClientClose => loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    transcript.received.push(serde_json::from_str(&text).unwrap());
                }
                Some(Ok(Message::Close(_))) => {
                    transcript.client_closes += 1;
                    break;
                }
                Some(Ok(_)) => continue,
                None | Some(Err(_)) => break,
            }
        },
    }
}

pub fn hello(heartbeat_interval: u64) -> Value {
    json!({ "op": 10, "d": { "heartbeat_interval": heartbeat_interval }, "s": null, "t": null })
}

pub fn ready(seq: u64) -> Value {
    json!({
        "op": 0, "s": seq, "t": "READY",
        "d": {
            "v": 10,
            "user": { "id": "1000", "username": "FunBot", "bot": true },
            "session_id": "fake-session",
        },
    })
}

pub fn message_create(seq: u64, channel_id: &str, content: &str, from_bot: bool) -> Value {
    json!({
        "op": 0, "s": seq, "t": "MESSAGE_CREATE",
        "d": {
            "id": format!("m{seq}"),
            "channel_id": channel_id,
            "content": content,
            "author": { "id": "7", "username": "alice", "bot": from_bot },
        },
    })
}
