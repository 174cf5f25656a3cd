/*
[INPUT]:  Public API exports for the fcs-ws-demos crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod console;
pub mod format;
pub mod monitor;
pub mod quote_book;
pub mod web;

// Re-export main types for convenience
pub use config::{ConfigOverrides, DemoConfig, Preset};
pub use console::{SimplePrinter, TerminalPrinter};
pub use monitor::{run_monitor, MonitorOptions};
pub use quote_book::{QuoteBook, SharedQuoteBook};
pub use web::Engine;
