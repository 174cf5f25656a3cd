/*
[INPUT]:  Subscription intents and heartbeat ticks
[OUTPUT]: Outbound JSON frames
[POS]:    Data layer - client to server message definitions
[UPDATE]: When the feed accepts a new command
*/

use serde::{Deserialize, Serialize};

use super::models::SubscriptionKey;

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinSymbol { symbol: String, timeframe: String },
    LeaveSymbol { symbol: String, timeframe: String },
    RemoveAll,
    Ping { timestamp: i64 },
    Pong { timestamp: i64 },
}

impl ClientMessage {
    pub fn join(key: &SubscriptionKey) -> Self {
        ClientMessage::JoinSymbol {
            symbol: key.symbol.clone(),
            timeframe: key.timeframe.clone(),
        }
    }

    pub fn leave(key: &SubscriptionKey) -> Self {
        ClientMessage::LeaveSymbol {
            symbol: key.symbol.clone(),
            timeframe: key.timeframe.clone(),
        }
    }

    pub fn ping_now() -> Self {
        ClientMessage::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn pong_now() -> Self {
        ClientMessage::Pong {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
