//! Market-data persistence seams

use dashmap::DashMap;
use parking_lot::Mutex;
use types::errors::ExchangeError;
use types::ids::Symbol;
use types::trade::TradeEvent;

use crate::candles::{Candle, CandleInterval};
use crate::ticker::Ticker24h;

/// Candle storage keyed by (symbol, interval, open-time)
pub trait CandleRepository: Send + Sync {
    fn find(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        open_time: i64,
    ) -> Result<Option<Candle>, ExchangeError>;

    /// Insert or replace the candle at its (symbol, interval, open-time) key
    fn upsert(&self, candle: Candle) -> Result<(), ExchangeError>;

    /// Most recent candles by open-time descending
    fn recent(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;
}

/// Append-only trade event history
pub trait TradeHistoryRepository: Send + Sync {
    fn save(&self, event: TradeEvent) -> Result<(), ExchangeError>;
    fn recent(&self, symbol: &Symbol, limit: usize) -> Result<Vec<TradeEvent>, ExchangeError>;
}

/// Ticker storage, upserted per symbol
pub trait TickerRepository: Send + Sync {
    fn upsert(&self, ticker: Ticker24h) -> Result<(), ExchangeError>;
    fn get(&self, symbol: &Symbol) -> Result<Option<Ticker24h>, ExchangeError>;
    fn list(&self) -> Result<Vec<Ticker24h>, ExchangeError>;
}

/// DashMap-backed candle repository
#[derive(Default)]
pub struct InMemoryCandleRepository {
    candles: DashMap<(Symbol, CandleInterval, i64), Candle>,
}

impl InMemoryCandleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CandleRepository for InMemoryCandleRepository {
    fn find(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        open_time: i64,
    ) -> Result<Option<Candle>, ExchangeError> {
        Ok(self
            .candles
            .get(&(symbol.clone(), interval, open_time))
            .map(|entry| entry.clone()))
    }

    fn upsert(&self, candle: Candle) -> Result<(), ExchangeError> {
        self.candles.insert(
            (candle.symbol.clone(), candle.interval, candle.open_time),
            candle,
        );
        Ok(())
    }

    fn recent(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let mut matching: Vec<Candle> = self
            .candles
            .iter()
            .filter(|entry| {
                let (entry_symbol, entry_interval, _) = entry.key();
                entry_symbol == symbol && *entry_interval == interval
            })
            .map(|entry| entry.clone())
            .collect();
        matching.sort_by_key(|candle| std::cmp::Reverse(candle.open_time));
        matching.truncate(limit);
        Ok(matching)
    }
}

/// Vec-backed trade history
#[derive(Default)]
pub struct InMemoryTradeHistoryRepository {
    events: Mutex<Vec<TradeEvent>>,
}

impl InMemoryTradeHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TradeHistoryRepository for InMemoryTradeHistoryRepository {
    fn save(&self, event: TradeEvent) -> Result<(), ExchangeError> {
        self.events.lock().push(event);
        Ok(())
    }

    fn recent(&self, symbol: &Symbol, limit: usize) -> Result<Vec<TradeEvent>, ExchangeError> {
        let events = self.events.lock();
        Ok(events
            .iter()
            .rev()
            .filter(|event| &event.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// DashMap-backed ticker repository
#[derive(Default)]
pub struct InMemoryTickerRepository {
    tickers: DashMap<Symbol, Ticker24h>,
}

impl InMemoryTickerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickerRepository for InMemoryTickerRepository {
    fn upsert(&self, ticker: Ticker24h) -> Result<(), ExchangeError> {
        self.tickers.insert(ticker.symbol.clone(), ticker);
        Ok(())
    }

    fn get(&self, symbol: &Symbol) -> Result<Option<Ticker24h>, ExchangeError> {
        Ok(self.tickers.get(symbol).map(|entry| entry.clone()))
    }

    fn list(&self) -> Result<Vec<Ticker24h>, ExchangeError> {
        Ok(self.tickers.iter().map(|entry| entry.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::{Price, Quantity};

    const MINUTE: i64 = 60 * 1_000_000_000;

    fn candle(open_time: i64) -> Candle {
        Candle::open_from_trade(
            Symbol::new("AAPL"),
            CandleInterval::M1,
            open_time,
            Price::from_u64(100),
            Quantity::from_u64(1),
            open_time,
        )
    }

    #[test]
    fn test_candle_upsert_replaces() {
        let repo = InMemoryCandleRepository::new();
        let symbol = Symbol::new("AAPL");

        let mut first = candle(0);
        repo.upsert(first.clone()).unwrap();

        first.apply_trade(Price::from_u64(105), Quantity::from_u64(1), 30);
        repo.upsert(first).unwrap();

        let fetched = repo.find(&symbol, CandleInterval::M1, 0).unwrap().unwrap();
        assert_eq!(fetched.trades, 2);
    }

    #[test]
    fn test_recent_descending() {
        let repo = InMemoryCandleRepository::new();
        let symbol = Symbol::new("AAPL");

        for i in 0..5 {
            repo.upsert(candle(i * MINUTE)).unwrap();
        }

        let recent = repo.recent(&symbol, CandleInterval::M1, 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].open_time, 4 * MINUTE);
        assert_eq!(recent[2].open_time, 2 * MINUTE);
    }

    #[test]
    fn test_recent_filters_interval() {
        let repo = InMemoryCandleRepository::new();
        let symbol = Symbol::new("AAPL");
        repo.upsert(candle(0)).unwrap();

        assert!(repo.recent(&symbol, CandleInterval::H1, 10).unwrap().is_empty());
    }
}
