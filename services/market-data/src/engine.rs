//! Market data engine
//!
//! Consumes trade events and book snapshots, upserts candles per interval,
//! rotates the 24h ticker, caches the latest state, and fans everything
//! out through the publisher.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;
use types::book::OrderBookSnapshot;
use types::errors::ExchangeError;
use types::ids::Symbol;
use types::numeric::Price;
use types::trade::TradeEvent;

use crate::candles::{Candle, CandleInterval};
use crate::publisher::MarketDataPublisher;
use crate::repository::{CandleRepository, TickerRepository, TradeHistoryRepository};
use crate::ticker::{Ticker24h, TickerWindow};

/// Market-data configuration
#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    /// Trailing ticker window, nanoseconds
    pub ticker_window: i64,
    /// Candle intervals to maintain
    pub candle_intervals: Vec<CandleInterval>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            ticker_window: 24 * 3600 * 1_000_000_000,
            candle_intervals: vec![CandleInterval::M1, CandleInterval::H1, CandleInterval::D1],
        }
    }
}

/// Aggregation engine over the trade-event stream
pub struct MarketDataEngine {
    config: MarketDataConfig,
    candles: Arc<dyn CandleRepository>,
    history: Arc<dyn TradeHistoryRepository>,
    tickers: Arc<dyn TickerRepository>,
    publisher: Arc<dyn MarketDataPublisher>,

    /// Rolling window state plus derived ticker, one entry per symbol
    ticker_state: Mutex<HashMap<Symbol, TickerWindow>>,
    ticker_cache: RwLock<HashMap<Symbol, Ticker24h>>,
    book_cache: RwLock<HashMap<Symbol, OrderBookSnapshot>>,
}

impl MarketDataEngine {
    pub fn new(
        config: MarketDataConfig,
        candles: Arc<dyn CandleRepository>,
        history: Arc<dyn TradeHistoryRepository>,
        tickers: Arc<dyn TickerRepository>,
        publisher: Arc<dyn MarketDataPublisher>,
    ) -> Self {
        Self {
            config,
            candles,
            history,
            tickers,
            publisher,
            ticker_state: Mutex::new(HashMap::new()),
            ticker_cache: RwLock::new(HashMap::new()),
            book_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Ingest one trade event: persist, aggregate, publish
    pub fn on_trade_event(&self, event: TradeEvent) -> Result<(), ExchangeError> {
        self.history.save(event.clone())?;
        self.update_candles(&event)?;
        self.update_ticker(&event)?;

        if let Err(err) = self.publisher.publish_trade(&event) {
            warn!(symbol = %event.symbol, error = %err, "trade publish failed");
        }
        Ok(())
    }

    /// Ingest a fresh book snapshot: cache a clone and rebroadcast
    pub fn on_order_book_snapshot(&self, snapshot: OrderBookSnapshot) {
        self.book_cache
            .write()
            .insert(snapshot.symbol.clone(), snapshot.clone());

        if let Err(err) = self.publisher.publish_order_book(&snapshot) {
            warn!(symbol = %snapshot.symbol, error = %err, "book publish failed");
        }
    }

    /// Most recent candles, open-time descending
    pub fn get_candles(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.candles.recent(symbol, interval, limit)
    }

    /// Current ticker from cache, falling back to the repository
    pub fn get_ticker(&self, symbol: &Symbol) -> Result<Option<Ticker24h>, ExchangeError> {
        if let Some(ticker) = self.ticker_cache.read().get(symbol) {
            return Ok(Some(ticker.clone()));
        }
        self.tickers.get(symbol)
    }

    /// All known tickers
    pub fn list_tickers(&self) -> Result<Vec<Ticker24h>, ExchangeError> {
        self.tickers.list()
    }

    /// Clone of the latest cached book snapshot
    pub fn get_order_book(&self, symbol: &Symbol) -> Option<OrderBookSnapshot> {
        self.book_cache.read().get(symbol).cloned()
    }

    /// Recent trade events, newest first
    pub fn recent_trades(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> Result<Vec<TradeEvent>, ExchangeError> {
        self.history.recent(symbol, limit)
    }

    /// Last trade price for a symbol, if any trade has been observed
    pub fn last_price(&self, symbol: &Symbol) -> Option<Price> {
        self.ticker_cache
            .read()
            .get(symbol)
            .map(|ticker| ticker.last_price)
    }

    fn update_candles(&self, event: &TradeEvent) -> Result<(), ExchangeError> {
        for &interval in &self.config.candle_intervals {
            let open_time = interval.align(event.timestamp);

            let candle = match self.candles.find(&event.symbol, interval, open_time)? {
                Some(mut candle) => {
                    candle.apply_trade(event.price, event.quantity, event.timestamp);
                    candle
                }
                None => Candle::open_from_trade(
                    event.symbol.clone(),
                    interval,
                    open_time,
                    event.price,
                    event.quantity,
                    event.timestamp,
                ),
            };
            self.candles.upsert(candle.clone())?;

            if let Err(err) = self.publisher.publish_candle(&candle) {
                warn!(symbol = %event.symbol, error = %err, "candle publish failed");
            }
        }
        Ok(())
    }

    fn update_ticker(&self, event: &TradeEvent) -> Result<(), ExchangeError> {
        let ticker = {
            let mut state = self.ticker_state.lock();
            let window = state.entry(event.symbol.clone()).or_insert_with(|| {
                TickerWindow::new(event.symbol.clone(), self.config.ticker_window)
            });
            window.apply(event)
        };

        self.ticker_cache
            .write()
            .insert(event.symbol.clone(), ticker.clone());
        self.tickers.upsert(ticker.clone())?;

        if let Err(err) = self.publisher.publish_ticker(&ticker) {
            warn!(symbol = %event.symbol, error = %err, "ticker publish failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        InMemoryCandleRepository, InMemoryTickerRepository, InMemoryTradeHistoryRepository,
    };
    use crate::publisher::LogPublisher;
    use rust_decimal::Decimal;
    use types::book::BookLevel;
    use types::ids::TradeId;
    use types::numeric::Quantity;
    use types::order::Side;
    use types::trade::TradeSource;

    const MINUTE: i64 = 60 * 1_000_000_000;
    const HOUR: i64 = 60 * MINUTE;
    // 2024-02-17 00:00:00 UTC
    const T0: i64 = 1_708_128_000_000_000_000;

    fn engine() -> MarketDataEngine {
        MarketDataEngine::new(
            MarketDataConfig::default(),
            Arc::new(InMemoryCandleRepository::new()),
            Arc::new(InMemoryTradeHistoryRepository::new()),
            Arc::new(InMemoryTickerRepository::new()),
            Arc::new(LogPublisher),
        )
    }

    fn event(price: u64, qty: u64, at: i64) -> TradeEvent {
        TradeEvent {
            trade_id: TradeId::new(),
            symbol: Symbol::new("AAPL"),
            price: Price::from_u64(price),
            quantity: Quantity::from_u64(qty),
            aggressor: Side::BUY,
            source: TradeSource::Lit,
            timestamp: at,
        }
    }

    #[test]
    fn test_candle_upsert_within_minute() {
        let engine = engine();
        let symbol = Symbol::new("AAPL");

        // :05 and :40 land in the same 1m candle
        engine.on_trade_event(event(100, 1, T0 + 5 * 1_000_000_000)).unwrap();
        engine.on_trade_event(event(105, 2, T0 + 40 * 1_000_000_000)).unwrap();
        // 12:01:10 opens the next one
        engine.on_trade_event(event(103, 1, T0 + MINUTE + 10 * 1_000_000_000)).unwrap();

        let candles = engine.get_candles(&symbol, CandleInterval::M1, 10).unwrap();
        assert_eq!(candles.len(), 2);

        let second = &candles[0];
        assert_eq!(second.open_time, T0 + MINUTE);
        assert_eq!(second.open, Price::from_u64(103));
        assert_eq!(second.volume, Quantity::from_u64(1));
        assert_eq!(second.trades, 1);

        let first = &candles[1];
        assert_eq!(first.open_time, T0);
        assert_eq!(first.open, Price::from_u64(100));
        assert_eq!(first.high, Price::from_u64(105));
        assert_eq!(first.low, Price::from_u64(100));
        assert_eq!(first.close, Price::from_u64(105));
        assert_eq!(first.volume, Quantity::from_u64(3));
        assert_eq!(first.trades, 2);
    }

    #[test]
    fn test_all_configured_intervals_updated() {
        let engine = engine();
        let symbol = Symbol::new("AAPL");

        engine.on_trade_event(event(100, 1, T0 + 5 * 1_000_000_000)).unwrap();

        for interval in [CandleInterval::M1, CandleInterval::H1, CandleInterval::D1] {
            let candles = engine.get_candles(&symbol, interval, 10).unwrap();
            assert_eq!(candles.len(), 1, "missing candle for {interval:?}");
        }
        // Unconfigured interval untouched
        assert!(engine
            .get_candles(&symbol, CandleInterval::M5, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_ticker_rollup() {
        let engine = engine();
        let symbol = Symbol::new("AAPL");

        engine.on_trade_event(event(100, 1, T0)).unwrap();
        engine.on_trade_event(event(110, 2, T0 + HOUR)).unwrap();
        engine.on_trade_event(event(90, 3, T0 + 2 * HOUR)).unwrap();

        let ticker = engine.get_ticker(&symbol).unwrap().unwrap();
        assert_eq!(ticker.last_price, Price::from_u64(90));
        assert_eq!(ticker.open_price, Price::from_u64(100));
        assert_eq!(ticker.high_price, Price::from_u64(110));
        assert_eq!(ticker.low_price, Price::from_u64(90));
        assert_eq!(ticker.volume, Quantity::from_u64(6));
        assert_eq!(ticker.price_change, Decimal::from(-10));
        assert_eq!(ticker.price_change_percent, Decimal::from(-10));
    }

    #[test]
    fn test_last_price_follows_trades() {
        let engine = engine();
        let symbol = Symbol::new("AAPL");

        assert!(engine.last_price(&symbol).is_none());
        engine.on_trade_event(event(100, 1, T0)).unwrap();
        engine.on_trade_event(event(97, 1, T0 + 1)).unwrap();
        assert_eq!(engine.last_price(&symbol), Some(Price::from_u64(97)));
    }

    #[test]
    fn test_book_snapshot_cache_returns_clone() {
        let engine = engine();
        let symbol = Symbol::new("AAPL");

        let snapshot = OrderBookSnapshot {
            symbol: symbol.clone(),
            bids: vec![BookLevel {
                price: Price::from_u64(99),
                quantity: Quantity::from_u64(5),
                count: 1,
            }],
            asks: vec![],
        };
        engine.on_order_book_snapshot(snapshot.clone());

        let cached = engine.get_order_book(&symbol).unwrap();
        assert_eq!(cached, snapshot);
        assert!(engine.get_order_book(&Symbol::new("MSFT")).is_none());
    }

    #[test]
    fn test_trade_history_recent() {
        let engine = engine();
        let symbol = Symbol::new("AAPL");

        for i in 0..5 {
            engine.on_trade_event(event(100 + i, 1, T0 + i as i64)).unwrap();
        }

        let recent = engine.recent_trades(&symbol, 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].price, Price::from_u64(104));
    }

    #[test]
    fn test_ticker_persisted_to_repository() {
        let tickers = Arc::new(InMemoryTickerRepository::new());
        let engine = MarketDataEngine::new(
            MarketDataConfig::default(),
            Arc::new(InMemoryCandleRepository::new()),
            Arc::new(InMemoryTradeHistoryRepository::new()),
            tickers.clone(),
            Arc::new(LogPublisher),
        );
        let symbol = Symbol::new("AAPL");

        engine.on_trade_event(event(100, 1, T0)).unwrap();

        let stored = tickers.get(&symbol).unwrap().unwrap();
        assert_eq!(stored.last_price, Price::from_u64(100));
        assert_eq!(engine.list_tickers().unwrap().len(), 1);
    }
}
