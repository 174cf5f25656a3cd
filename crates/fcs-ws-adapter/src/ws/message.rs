/*
[INPUT]:  Connection lifecycle transitions and parsed server frames
[OUTPUT]: Events delivered to consumers and observable connection state
[POS]:    WebSocket layer - consumer-facing event definitions
[UPDATE]: When adding lifecycle events or connection states
*/

use crate::types::ServerMessage;

/// Events produced by the connection driver, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// First `welcome` of this client.
    Connected,
    /// `welcome` after an automatic reconnect; subscriptions were re-sent.
    Reconnected,
    Message(ServerMessage),
    Closed { code: u16, reason: String },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected { retry_count: u32 },
    Stopped,
}
