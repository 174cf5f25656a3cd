/*
[INPUT]:  Feed client running on a background thread, shutdown token
[OUTPUT]: Periodic "Tick i/N" snapshots of the latest closes
[POS]:    Presentation layer - background (non-blocking) demo
[UPDATE]: When changing the polling loop or the watched symbols
*/

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::Context;
use console::style;
use fcs_ws_adapter::{EventHandler, FcsClient, ServerMessage};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::quote_book::{QuoteBook, SharedQuoteBook};

pub const MONITOR_SYMBOLS: [&str; 2] = ["BINANCE:BTCUSDT", "BINANCE:ETHUSDT"];
pub const MONITOR_TIMEFRAME: &str = "1D";

const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub ticks: u32,
    pub interval: Duration,
    /// Pause before the first tick so the connection can settle.
    pub warmup: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            ticks: 20,
            interval: Duration::from_secs(3),
            warmup: Duration::from_secs(3),
        }
    }
}

/// Writes every price into the shared book from the client thread.
pub struct PriceRecorder {
    book: SharedQuoteBook,
}

impl PriceRecorder {
    pub fn new(book: SharedQuoteBook) -> Self {
        Self { book }
    }
}

impl EventHandler for PriceRecorder {
    fn on_connected(&mut self, client: &FcsClient) {
        println!("{}", style("[WebSocket] Connected!").green());
        for symbol in MONITOR_SYMBOLS {
            if let Err(err) = client.join(symbol, MONITOR_TIMEFRAME) {
                warn!(symbol, error = %err, "join rejected");
            }
        }
    }

    fn on_message(&mut self, _client: &FcsClient, message: &ServerMessage) {
        if let ServerMessage::Price(update) = message {
            match self.book.write() {
                Ok(mut book) => {
                    book.apply(update);
                }
                Err(poisoned) => {
                    poisoned.into_inner().apply(update);
                }
            }
        }
    }

    fn on_error(&mut self, _client: &FcsClient, error: &str) {
        warn!(error, "feed error");
    }
}

pub fn render_tick(tick: u32, total: u32, closes: &BTreeMap<String, Decimal>) -> String {
    let prices = closes
        .iter()
        .map(|(symbol, close)| format!("{symbol}: {close}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[Main] Tick {tick}/{total} - Latest prices: {{{prices}}}")
}

/// Run `client` on its own thread and poll its prices from this one.
///
/// Blocks the calling thread; call it from `spawn_blocking` inside async code.
pub fn run_monitor(
    client: &FcsClient,
    options: &MonitorOptions,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let book = QuoteBook::shared();
    let background = client
        .run_in_background(PriceRecorder::new(book.clone()))
        .context("start background client")?;

    println!("[Main] WebSocket running in background thread");
    println!("[Main] Main thread continues to run...\n");

    if sleep_or_cancelled(options.warmup, shutdown) {
        for tick in 1..=options.ticks {
            let closes = match book.read() {
                Ok(book) => book.closes(),
                Err(poisoned) => poisoned.into_inner().closes(),
            };
            println!("{}", render_tick(tick, options.ticks, &closes));

            if background.is_finished() {
                warn!("background client stopped early");
                break;
            }
            if tick < options.ticks && !sleep_or_cancelled(options.interval, shutdown) {
                break;
            }
        }
    }

    println!("\n[Main] Disconnecting...");
    background.stop().context("stop background client")?;
    println!("[Main] Done!");
    info!("background monitor finished");
    Ok(())
}

/// Sleep for `duration`; returns `false` if shutdown fired first.
fn sleep_or_cancelled(duration: Duration, shutdown: &CancellationToken) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcs_ws_adapter::{PriceFields, PriceMode, PriceUpdate};
    use std::str::FromStr;

    #[test]
    fn tick_line_lists_closes_in_symbol_order() {
        let mut closes = BTreeMap::new();
        closes.insert("BINANCE:ETHUSDT".to_string(), Decimal::from_str("3200.5").unwrap());
        closes.insert("BINANCE:BTCUSDT".to_string(), Decimal::from(67000));
        assert_eq!(
            render_tick(2, 20, &closes),
            "[Main] Tick 2/20 - Latest prices: {BINANCE:BTCUSDT: 67000, BINANCE:ETHUSDT: 3200.5}"
        );
        assert_eq!(render_tick(1, 3, &BTreeMap::new()), "[Main] Tick 1/3 - Latest prices: {}");
    }

    #[test]
    fn recorder_writes_into_shared_book() {
        let book = QuoteBook::shared();
        let mut recorder = PriceRecorder::new(book.clone());
        let client = FcsClient::new("fcs_socket_demo").unwrap();
        let update = PriceUpdate {
            symbol: "BINANCE:BTCUSDT".to_string(),
            timeframe: Some("1D".to_string()),
            prices: PriceFields {
                mode: PriceMode::Initial,
                c: Some(Decimal::from(67000)),
                ..PriceFields::default()
            },
        };

        recorder.on_message(&client, &ServerMessage::Price(update));
        assert_eq!(
            book.read().unwrap().closes().get("BINANCE:BTCUSDT"),
            Some(&Decimal::from(67000))
        );
    }

    #[test]
    fn cancelled_token_cuts_sleep_short() {
        let token = CancellationToken::new();
        token.cancel();
        let started = Instant::now();
        assert!(!sleep_or_cancelled(Duration::from_secs(5), &token));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(sleep_or_cancelled(Duration::ZERO, &CancellationToken::new()));
    }
}
