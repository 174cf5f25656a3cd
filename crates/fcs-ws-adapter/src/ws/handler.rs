/*
[INPUT]:  ClientEvent values from the connection driver
[OUTPUT]: Calls into user callbacks
[POS]:    WebSocket layer - callback registration surface
[UPDATE]: When adding lifecycle events
*/

use super::client::FcsClient;
use super::message::ClientEvent;
use crate::types::ServerMessage;

/// Callbacks for feed events. Every method defaults to a no-op.
///
/// Callbacks run on the task that drives [`FcsClient::run_forever`], so they should not block.
/// The client handle is passed in so handlers can `join`/`leave` from inside a callback.
pub trait EventHandler {
    fn on_connected(&mut self, _client: &FcsClient) {}

    fn on_reconnect(&mut self, _client: &FcsClient) {}

    fn on_message(&mut self, _client: &FcsClient, _message: &ServerMessage) {}

    fn on_close(&mut self, _client: &FcsClient, _code: u16, _reason: &str) {}

    fn on_error(&mut self, _client: &FcsClient, _error: &str) {}
}

/// Route a single event to the matching callback.
pub fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, client: &FcsClient, event: &ClientEvent) {
    match event {
        ClientEvent::Connected => handler.on_connected(client),
        ClientEvent::Reconnected => handler.on_reconnect(client),
        ClientEvent::Message(message) => handler.on_message(client, message),
        ClientEvent::Closed { code, reason } => handler.on_close(client, *code, reason),
        ClientEvent::Error(error) => handler.on_error(client, error),
    }
}
