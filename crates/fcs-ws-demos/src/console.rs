/*
[INPUT]:  Client events, resolved demo configuration
[OUTPUT]: Formatted price cards and status lines on stdout
[POS]:    Presentation layer - terminal demos (stream, simple)
[UPDATE]: When changing terminal layouts or per-preset card styles
*/

use std::fmt::Write as _;

use console::style;
use fcs_ws_adapter::{EventHandler, FcsClient, PriceFields, PriceMode, PriceUpdate, ServerMessage};
use tracing::{debug, warn};

use crate::config::{DemoConfig, Preset};
use crate::format::{calculate_spread, format_price, format_volume, is_present, split_symbol};
use crate::quote_book::{ApplyOutcome, QuoteBook, QuoteRecord};

const RULE_WIDTH: usize = 60;

pub fn render_banner(preset: Preset, api_key: &str, symbols: &[String], timeframe: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "  FCS Real-time {} Prices - Terminal Demo", preset.title());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  API Key: {api_key}");
    let _ = writeln!(out, "  Symbols: {}", symbols.join(", "));
    let _ = writeln!(out, "  Timeframe: {timeframe}");
    let _ = writeln!(out, "{rule}");
    out
}

/// Multi-line card for a full `initial`/`candle` record.
pub fn render_card(preset: Preset, symbol: &str, record: &QuoteRecord) -> String {
    let (exchange, ticker) = split_symbol(symbol);
    let price = |value| format_price(value);
    let dollar = |value| format!("${}", format_price(value));
    let mut out = String::new();

    match preset {
        Preset::Stock => {
            let _ = writeln!(out, "\n  [{ticker}] ({exchange})");
            let _ = writeln!(out, "    Price: {}", dollar(record.close));
            let _ = writeln!(
                out,
                "    O: {} | H: {} | L: {} | C: {}",
                dollar(record.open),
                dollar(record.high),
                dollar(record.low),
                dollar(record.close)
            );
            if let Some(volume) = record.volume.filter(|v| !v.is_zero()) {
                let _ = writeln!(out, "    Volume: {}", format_volume(volume));
            }
            if is_present(record.ask) && is_present(record.bid) {
                let _ = writeln!(out, "    Ask: {} | Bid: {}", dollar(record.ask), dollar(record.bid));
            }
        }
        Preset::Forex => {
            let _ = writeln!(out, "\n  [{ticker}]");
            let _ = writeln!(out, "    Price: {}", price(record.close));
            let _ = writeln!(
                out,
                "    O: {} | H: {} | L: {} | C: {}",
                price(record.open),
                price(record.high),
                price(record.low),
                price(record.close)
            );
            if is_present(record.ask) && is_present(record.bid) {
                let _ = writeln!(
                    out,
                    "    Ask: {} | Bid: {} | Spread: {} pips",
                    price(record.ask),
                    price(record.bid),
                    calculate_spread(record.ask, record.bid)
                );
            }
        }
        Preset::Crypto => {
            let _ = writeln!(out, "\n  [{ticker}]");
            let _ = writeln!(out, "    Price: {}", dollar(record.close));
            let _ = writeln!(
                out,
                "    O: {} | H: {} | L: {} | C: {}",
                price(record.open),
                price(record.high),
                price(record.low),
                price(record.close)
            );
            if is_present(record.volume) {
                let _ = writeln!(out, "    Volume: {}", price(record.volume));
            }
            if is_present(record.ask) && is_present(record.bid) {
                let _ = writeln!(out, "    Ask: {} | Bid: {}", price(record.ask), price(record.bid));
            }
        }
    }
    out
}

/// One-line top-of-book update for an `askbid` message.
pub fn render_quote_line(preset: Preset, symbol: &str, fields: &PriceFields) -> String {
    let ask = format_price(fields.a);
    let bid = format_price(fields.b);
    match preset {
        Preset::Stock => format!("  {symbol}: Ask=${ask} Bid=${bid}"),
        Preset::Forex => format!(
            "  {symbol}: Ask={ask} Bid={bid} Spread={} pips",
            calculate_spread(fields.a, fields.b)
        ),
        Preset::Crypto => format!("  {symbol}: Ask={ask} Bid={bid}"),
    }
}

pub fn render_close(code: u16, reason: &str) -> String {
    format!("\n[!] Connection closed: {code} - {reason}")
}

pub fn render_error(error: &str) -> String {
    format!("\n[!] Error: {error}")
}

/// Streams every configured symbol and prints a card per candle.
pub struct TerminalPrinter {
    preset: Preset,
    api_key: String,
    symbols: Vec<String>,
    timeframe: String,
    book: QuoteBook,
}

impl TerminalPrinter {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            preset: config.preset,
            api_key: config.api_key.clone(),
            symbols: config.resolved_symbols(),
            timeframe: config.resolved_timeframe(),
            book: QuoteBook::new(),
        }
    }

    pub fn book(&self) -> &QuoteBook {
        &self.book
    }

    /// Apply a price update and return the text to print, if any.
    pub fn handle_price(&mut self, update: &PriceUpdate) -> Option<String> {
        let outcome = self.book.apply(update);
        let mode = update.prices.mode;
        if mode.replaces_candle() && outcome == ApplyOutcome::Replaced {
            return self
                .book
                .get(&update.symbol)
                .map(|record| render_card(self.preset, &update.symbol, record));
        }
        (mode == PriceMode::AskBid)
            .then(|| render_quote_line(self.preset, &update.symbol, &update.prices))
    }
}

impl EventHandler for TerminalPrinter {
    fn on_connected(&mut self, client: &FcsClient) {
        let banner = render_banner(self.preset, &self.api_key, &self.symbols, &self.timeframe);
        println!("{}", style(banner).cyan());

        for symbol in &self.symbols {
            if let Err(err) = client.join(symbol, &self.timeframe) {
                warn!(symbol = %symbol, error = %err, "join rejected");
            }
        }
    }

    fn on_reconnect(&mut self, _client: &FcsClient) {
        println!("{}", style("[*] Reconnected, subscriptions restored").yellow());
    }

    fn on_message(&mut self, _client: &FcsClient, message: &ServerMessage) {
        match message {
            ServerMessage::Price(update) => {
                if let Some(text) = self.handle_price(update) {
                    println!("{text}");
                }
            }
            ServerMessage::Message { short, message, .. } => {
                debug!(short = ?short, message = ?message, "server message");
            }
            _ => {}
        }
    }

    fn on_close(&mut self, _client: &FcsClient, code: u16, reason: &str) {
        println!("{}", style(render_close(code, reason)).red());
    }

    fn on_error(&mut self, _client: &FcsClient, error: &str) {
        println!("{}", style(render_error(error)).red());
    }
}

pub const SIMPLE_SYMBOL: &str = "BINANCE:BTCUSDT";
pub const SIMPLE_TIMEFRAME: &str = "1D";

/// Quick-start handler: one symbol, one line per price.
#[derive(Debug, Default)]
pub struct SimplePrinter;

impl SimplePrinter {
    pub fn render(update: &PriceUpdate) -> String {
        format!("{}: ${}", update.symbol, format_price(update.prices.c))
    }
}

impl EventHandler for SimplePrinter {
    fn on_connected(&mut self, client: &FcsClient) {
        println!("{}", style("Connected to FCS WebSocket!").green());
        println!("Subscribing to BTCUSDT...\n");
        if let Err(err) = client.join(SIMPLE_SYMBOL, SIMPLE_TIMEFRAME) {
            warn!(error = %err, "join rejected");
        }
    }

    fn on_message(&mut self, _client: &FcsClient, message: &ServerMessage) {
        if let ServerMessage::Price(update) = message {
            println!("{}", Self::render(update));
        }
    }

    fn on_close(&mut self, _client: &FcsClient, code: u16, reason: &str) {
        println!("{}", render_close(code, reason));
    }

    fn on_error(&mut self, _client: &FcsClient, error: &str) {
        println!("{}", render_error(error));
    }
}
