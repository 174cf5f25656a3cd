/*
[INPUT]:  Decimal price/volume fields, possibly missing
[OUTPUT]: Display strings for terminal output
[POS]:    Presentation layer - formatting helpers
[UPDATE]: When changing pip heuristics or display precision
*/

use rust_decimal::{Decimal, RoundingStrategy};

/// Shown wherever a value is missing.
pub const PLACEHOLDER: &str = "--";

/// Raw spreads above this are treated as JPY-quoted pairs (2 decimal pips).
fn jpy_spread_threshold() -> Decimal {
    Decimal::new(1, 1)
}

/// Spread in pips, one decimal place. `"--"` if either side is missing or zero.
pub fn calculate_spread(ask: Option<Decimal>, bid: Option<Decimal>) -> String {
    let (Some(ask), Some(bid)) = (ask, bid) else {
        return PLACEHOLDER.to_string();
    };
    if ask.is_zero() || bid.is_zero() {
        return PLACEHOLDER.to_string();
    }

    let spread = (ask - bid).abs();
    let multiplier = if spread > jpy_spread_threshold() {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::from(10_000)
    };
    let pips = (spread * multiplier).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{pips:.1}")
}

/// `1.50M`, `2.50K`, or a plain integer below one thousand.
pub fn format_volume(volume: Decimal) -> String {
    let million = Decimal::from(1_000_000);
    let thousand = Decimal::ONE_THOUSAND;

    if volume >= million {
        format!("{:.2}M", round2(volume / million))
    } else if volume >= thousand {
        format!("{:.2}K", round2(volume / thousand))
    } else {
        format!(
            "{:.0}",
            volume.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

pub fn format_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| PLACEHOLDER.to_string(), |price| price.to_string())
}

/// `("NASDAQ", "AAPL")` for `NASDAQ:AAPL`; empty exchange when there is no prefix.
pub fn split_symbol(symbol: &str) -> (&str, &str) {
    symbol.split_once(':').unwrap_or(("", symbol))
}

/// Present and non-zero.
pub fn is_present(value: Option<Decimal>) -> bool {
    value.is_some_and(|value| !value.is_zero())
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
