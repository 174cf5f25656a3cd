/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public FCS feed adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod error;
pub mod types;
pub mod ws;

pub use error::{FcsError, Result};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    BackgroundClient,
    ClientConfig,
    ClientEvent,
    ConnectionState,
    EventHandler,
    FcsClient,
    DEFAULT_WS_URL,
};
