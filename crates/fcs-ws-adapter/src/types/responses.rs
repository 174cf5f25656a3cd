/*
[INPUT]:  Inbound JSON frames from the feed
[OUTPUT]: Typed server messages
[POS]:    Data layer - server to client message definitions
[UPDATE]: When the feed introduces a new message type
*/

use serde::{Deserialize, Serialize};

use super::models::PriceUpdate;

/// Short code the server uses to confirm a join.
pub const JOINED_ROOM: &str = "joined_room";

/// Frames sent by the server, tagged on `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted; the session is usable from here on.
    Welcome {
        #[serde(default)]
        message: Option<String>,
    },
    Ping {
        #[serde(default)]
        timestamp: Option<i64>,
    },
    Pong {
        #[serde(default)]
        timestamp: Option<i64>,
    },
    /// Informational message, e.g. a join confirmation.
    Message {
        #[serde(default)]
        short: Option<String>,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        timeframe: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Price(PriceUpdate),
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// The (symbol, timeframe) pair of a join confirmation.
    pub fn joined_room(&self) -> Option<(&str, &str)> {
        match self {
            ServerMessage::Message {
                short: Some(short),
                symbol: Some(symbol),
                timeframe: Some(timeframe),
                ..
            } if short == JOINED_ROOM && !symbol.is_empty() && !timeframe.is_empty() => {
                Some((symbol.as_str(), timeframe.as_str()))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::Ping { .. } => "ping",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::Message { .. } => "message",
            ServerMessage::Price(_) => "price",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Unknown => "unknown",
        }
    }
}
