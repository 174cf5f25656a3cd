/*
[INPUT]:  Price payloads and subscription identifiers from the feed
[OUTPUT]: Typed Rust structs with lenient decimal parsing
[POS]:    Data layer - type definitions for feed communication
[UPDATE]: When the price payload schema changes or new fields are added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::PriceMode;
use crate::error::{FcsError, Result};

/// Field set of a price update. Which fields are present depends on `mode`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFields {
    #[serde(default)]
    pub mode: PriceMode,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub o: Option<Decimal>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub h: Option<Decimal>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub l: Option<Decimal>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub c: Option<Decimal>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub v: Option<Decimal>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub a: Option<Decimal>,
    #[serde(default, deserialize_with = "serde_helpers::deserialize_decimal_lenient")]
    pub b: Option<Decimal>,
}

/// A `type = "price"` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub prices: PriceFields,
}

/// Identifies one stream: an exchange-qualified symbol plus a candle timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub symbol: String,
    pub timeframe: String,
}

impl SubscriptionKey {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Result<Self> {
        let symbol = symbol.into();
        let timeframe = timeframe.into();

        if symbol.trim().is_empty() || timeframe.trim().is_empty() {
            return Err(FcsError::InvalidSubscription(
                "symbol and timeframe are required".to_string(),
            ));
        }
        if !symbol.contains(':') {
            return Err(FcsError::InvalidSubscription(format!(
                "symbol must include exchange prefix, e.g. \"BINANCE:BTCUSDT\" (got {symbol})"
            )));
        }

        Ok(Self { symbol, timeframe })
    }

    /// Deduplication id, `UPPER(symbol)_timeframe`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.symbol.to_uppercase(), self.timeframe)
    }

    pub fn exchange(&self) -> &str {
        self.symbol.split_once(':').map(|(exchange, _)| exchange).unwrap_or("")
    }

    pub fn ticker(&self) -> &str {
        self.symbol
            .split_once(':')
            .map(|(_, ticker)| ticker)
            .unwrap_or(&self.symbol)
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.symbol, self.timeframe)
    }
}

mod serde_helpers {
    use super::Decimal;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    fn parse_decimal(raw: &str) -> Option<Decimal> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }

    /// Numbers and numeric strings parse; null, empty and garbage map to `None`.
    pub fn deserialize_decimal_lenient<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(raw) => parse_decimal(&raw),
            Value::Number(number) => parse_decimal(&number.to_string()),
            _ => None,
        })
    }
}
