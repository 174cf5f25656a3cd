/*
[INPUT]:  Wire values of the `prices.mode` field
[OUTPUT]: Typed price update mode
[POS]:    Data layer - enum definitions for feed payloads
[UPDATE]: When the feed introduces a new update mode
*/

use serde::{Deserialize, Serialize};

/// Subtype of a price update, controls which fields are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    /// First snapshot sent right after a join.
    Initial,
    /// Candle update for the subscribed timeframe.
    Candle,
    /// Top of book update (ask, bid and last close only).
    #[serde(rename = "askbid")]
    AskBid,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PriceMode {
    /// Whether this mode carries a full OHLCV record.
    pub fn replaces_candle(self) -> bool {
        matches!(self, PriceMode::Initial | PriceMode::Candle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriceMode::Initial => "initial",
            PriceMode::Candle => "candle",
            PriceMode::AskBid => "askbid",
            PriceMode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PriceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_mode_parses_wire_values() {
        let mode: PriceMode = serde_json::from_str("\"askbid\"").unwrap();
        assert_eq!(mode, PriceMode::AskBid);
        let mode: PriceMode = serde_json::from_str("\"candle\"").unwrap();
        assert_eq!(mode, PriceMode::Candle);
        let mode: PriceMode = serde_json::from_str("\"trade\"").unwrap();
        assert_eq!(mode, PriceMode::Unknown);
    }

    #[test]
    fn price_mode_replaces_candle_only_for_full_records() {
        assert!(PriceMode::Initial.replaces_candle());
        assert!(PriceMode::Candle.replaces_candle());
        assert!(!PriceMode::AskBid.replaces_candle());
        assert!(!PriceMode::Unknown.replaces_candle());
    }
}
