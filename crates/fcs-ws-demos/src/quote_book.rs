/*
[INPUT]:  PriceUpdate messages from the feed client
[OUTPUT]: Latest-known OHLCV and top-of-book fields per symbol
[POS]:    Data layer - in-memory quote cache shared by the terminal demos
[UPDATE]: When changing which fields a price mode may overwrite
*/

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use fcs_ws_adapter::{PriceFields, PriceMode, PriceUpdate};
use rust_decimal::Decimal;

/// Last-known fields for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteRecord {
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub bid: Option<Decimal>,
}

impl QuoteRecord {
    fn from_fields(fields: &PriceFields) -> Self {
        Self {
            open: fields.o,
            high: fields.h,
            low: fields.l,
            close: fields.c,
            volume: fields.v,
            ask: fields.a,
            bid: fields.b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// `initial`/`candle`: the whole record was replaced.
    Replaced,
    /// `askbid`: ask, bid and close were overwritten on an existing record.
    TopOfBook,
    /// Unknown mode, or `askbid` for a symbol without a record yet.
    Ignored,
}

/// Symbol to last-known record. Lives for the process run; no eviction.
#[derive(Debug, Default)]
pub struct QuoteBook {
    records: BTreeMap<String, QuoteRecord>,
}

pub type SharedQuoteBook = Arc<RwLock<QuoteBook>>;

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedQuoteBook {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn apply(&mut self, update: &PriceUpdate) -> ApplyOutcome {
        let fields = &update.prices;
        if fields.mode.replaces_candle() {
            self.records
                .insert(update.symbol.clone(), QuoteRecord::from_fields(fields));
            return ApplyOutcome::Replaced;
        }

        if fields.mode != PriceMode::AskBid {
            return ApplyOutcome::Ignored;
        }
        match self.records.get_mut(&update.symbol) {
            Some(record) => {
                record.ask = fields.a;
                record.bid = fields.b;
                record.close = fields.c;
                ApplyOutcome::TopOfBook
            }
            None => ApplyOutcome::Ignored,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&QuoteRecord> {
        self.records.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Symbols that have a close price, with that price.
    pub fn closes(&self) -> BTreeMap<String, Decimal> {
        self.records
            .iter()
            .filter_map(|(symbol, record)| record.close.map(|close| (symbol.clone(), close)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QuoteRecord)> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> Option<Decimal> {
        Some(Decimal::from_str(value).unwrap())
    }

    fn update(symbol: &str, fields: PriceFields) -> PriceUpdate {
        PriceUpdate {
            symbol: symbol.to_string(),
            timeframe: Some("1D".to_string()),
            prices: fields,
        }
    }

    fn candle() -> PriceFields {
        PriceFields {
            mode: PriceMode::Candle,
            o: dec("1.0800"),
            h: dec("1.0850"),
            l: dec("1.0790"),
            c: dec("1.0833"),
            v: dec("12000"),
            a: dec("1.0834"),
            b: dec("1.0832"),
        }
    }

    #[test]
    fn askbid_after_candle_keeps_ohlc() {
        let mut book = QuoteBook::new();
        assert_eq!(book.apply(&update("FX:EURUSD", candle())), ApplyOutcome::Replaced);

        let askbid = PriceFields {
            mode: PriceMode::AskBid,
            c: dec("1.0840"),
            a: dec("1.0841"),
            b: dec("1.0839"),
            ..PriceFields::default()
        };
        assert_eq!(book.apply(&update("FX:EURUSD", askbid)), ApplyOutcome::TopOfBook);

        let record = book.get("FX:EURUSD").unwrap();
        assert_eq!(record.open, dec("1.0800"));
        assert_eq!(record.high, dec("1.0850"));
        assert_eq!(record.low, dec("1.0790"));
        assert_eq!(record.volume, dec("12000"));
        assert_eq!(record.close, dec("1.0840"));
        assert_eq!(record.ask, dec("1.0841"));
        assert_eq!(record.bid, dec("1.0839"));
    }

    #[test]
    fn askbid_without_record_is_ignored() {
        let mut book = QuoteBook::new();
        let askbid = PriceFields {
            mode: PriceMode::AskBid,
            a: dec("1.1"),
            b: dec("1.0"),
            ..PriceFields::default()
        };
        assert_eq!(book.apply(&update("FX:GBPUSD", askbid)), ApplyOutcome::Ignored);
        assert!(book.is_empty());
    }

    #[test]
    fn candle_replaces_previous_record() {
        let mut book = QuoteBook::new();
        book.apply(&update("FX:EURUSD", candle()));

        let initial = PriceFields {
            mode: PriceMode::Initial,
            c: dec("1.09"),
            ..PriceFields::default()
        };
        assert_eq!(book.apply(&update("FX:EURUSD", initial)), ApplyOutcome::Replaced);

        let record = book.get("FX:EURUSD").unwrap();
        assert_eq!(record.open, None);
        assert_eq!(record.ask, None);
        assert_eq!(record.close, dec("1.09"));
    }

    #[test]
    fn unknown_mode_is_ignored_and_closes_are_sorted() {
        let mut book = QuoteBook::new();
        book.apply(&update("BINANCE:ETHUSDT", candle()));
        book.apply(&update("BINANCE:BTCUSDT", candle()));
        let unknown = PriceFields {
            mode: PriceMode::Unknown,
            c: dec("1"),
            ..PriceFields::default()
        };
        assert_eq!(book.apply(&update("BINANCE:SOLUSDT", unknown)), ApplyOutcome::Ignored);

        let closes: Vec<_> = book.closes().into_keys().collect();
        assert_eq!(closes, vec!["BINANCE:BTCUSDT", "BINANCE:ETHUSDT"]);
        assert_eq!(book.len(), 2);
    }
}
