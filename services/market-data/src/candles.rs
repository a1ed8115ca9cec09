//! OHLCV candle intervals and upsert arithmetic
//!
//! Candle boundaries floor to the interval width; daily candles floor to
//! UTC midnight. The engine upserts candles through the repository keyed by
//! (symbol, interval, open-time).

use serde::{Deserialize, Serialize};
use types::ids::Symbol;
use types::numeric::{Price, Quantity};

/// Supported candle intervals with their wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl CandleInterval {
    /// Interval width in nanoseconds
    pub fn duration_nanos(&self) -> i64 {
        const SECOND: i64 = 1_000_000_000;
        match self {
            CandleInterval::M1 => 60 * SECOND,
            CandleInterval::M5 => 5 * 60 * SECOND,
            CandleInterval::M15 => 15 * 60 * SECOND,
            CandleInterval::H1 => 3600 * SECOND,
            CandleInterval::H4 => 4 * 3600 * SECOND,
            CandleInterval::D1 => 86_400 * SECOND,
        }
    }

    /// Floor a timestamp to this interval's boundary
    ///
    /// The epoch is UTC midnight, so the daily floor lands on UTC midnight.
    pub fn align(&self, timestamp_nanos: i64) -> i64 {
        let duration = self.duration_nanos();
        (timestamp_nanos / duration) * duration
    }

    /// All supported intervals
    pub fn all() -> &'static [CandleInterval] {
        &[
            CandleInterval::M1,
            CandleInterval::M5,
            CandleInterval::M15,
            CandleInterval::H1,
            CandleInterval::H4,
            CandleInterval::D1,
        ]
    }
}

/// One OHLCV candle, upserted in place as trades arrive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: Symbol,
    pub interval: CandleInterval,
    pub open_time: i64,
    pub close_time: i64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub trades: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Candle {
    /// Open a candle from the first contributing trade of its period
    pub fn open_from_trade(
        symbol: Symbol,
        interval: CandleInterval,
        open_time: i64,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol,
            interval,
            open_time,
            close_time: open_time + interval.duration_nanos(),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: quantity,
            trades: 1,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Fold another trade of the same period into the candle
    pub fn apply_trade(&mut self, price: Price, quantity: Quantity, timestamp: i64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume = self.volume + quantity;
        self.trades += 1;
        self.updated_at = timestamp;
    }

    /// OHLC ordering invariant: high >= max(open, close) >= min(open, close) >= low
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close_time == self.open_time + self.interval.duration_nanos()
    }
}
