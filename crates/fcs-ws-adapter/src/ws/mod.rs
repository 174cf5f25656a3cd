/*
[INPUT]:  API key, client configuration and subscription requests
[OUTPUT]: Real-time price messages via callbacks or an event channel
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new commands or changing connection logic
*/

pub mod background;
pub mod client;
pub mod handler;
pub mod message;

pub use background::BackgroundClient;
pub use client::{ClientConfig, FcsClient, DEFAULT_WS_URL};
pub use handler::{dispatch, EventHandler};
pub use message::{ClientEvent, ConnectionState};
