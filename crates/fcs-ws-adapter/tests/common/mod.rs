/*
[INPUT]:  Scripted per-connection behaviour for a fake feed
[OUTPUT]: Local WebSocket server URL and JSON frame helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for fcs-ws-adapter tests

use std::future::Future;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub type FeedSocket = WebSocketStream<TcpStream>;

/// Start a local feed; `session` runs once per accepted connection with its index.
pub async fn start_feed<F, Fut>(session: F) -> String
where
    F: Fn(usize, FeedSocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind feed");
    let addr = listener.local_addr().expect("feed addr");
    let session = Arc::new(session);

    tokio::spawn(async move {
        let mut index = 0;
        while let Ok((stream, _)) = listener.accept().await {
            let Ok(socket) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            tokio::spawn(session(index, socket));
            index += 1;
        }
    });

    format!("ws://{addr}/ws")
}

/// A `ws://` URL whose peer accepts TCP but never answers the upgrade.
pub async fn silent_feed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind silent peer");
    let addr = listener.local_addr().expect("silent peer addr");

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    format!("ws://{addr}/ws")
}

/// A `ws://` URL nothing listens on
pub async fn closed_feed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("ws://{addr}/ws")
}

pub async fn send_json(socket: &mut FeedSocket, value: Value) {
    let _ = socket.send(Message::Text(value.to_string().into())).await;
}

/// Next text frame parsed as JSON, or `None` once the client goes away.
pub async fn next_json(socket: &mut FeedSocket) -> Option<Value> {
    while let Some(Ok(message)) = socket.next().await {
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

/// Read frames until the client closes so the session future stays alive.
pub async fn drain(socket: &mut FeedSocket) {
    while next_json(socket).await.is_some() {}
}
