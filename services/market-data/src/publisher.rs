//! Market-data broadcast sink
//!
//! The publisher is a pure sink: constructible with no engine reference,
//! bound into the engine once at wiring time. Transport implementations
//! (WebSocket fan-out, message queues) live outside the core; the engine
//! logs publish failures and never propagates them.

use tracing::info;
use types::book::OrderBookSnapshot;
use types::errors::ExchangeError;
use types::trade::TradeEvent;

use crate::candles::Candle;
use crate::ticker::Ticker24h;

/// Broadcast seam for derived market data
pub trait MarketDataPublisher: Send + Sync {
    fn publish_trade(&self, event: &TradeEvent) -> Result<(), ExchangeError>;
    fn publish_ticker(&self, ticker: &Ticker24h) -> Result<(), ExchangeError>;
    fn publish_candle(&self, candle: &Candle) -> Result<(), ExchangeError>;
    fn publish_order_book(&self, snapshot: &OrderBookSnapshot) -> Result<(), ExchangeError>;
}

/// Publisher that only emits tracing output
#[derive(Debug, Default)]
pub struct LogPublisher;

impl MarketDataPublisher for LogPublisher {
    fn publish_trade(&self, event: &TradeEvent) -> Result<(), ExchangeError> {
        info!(
            symbol = %event.symbol,
            price = %event.price,
            quantity = %event.quantity,
            aggressor = ?event.aggressor,
            "trade"
        );
        Ok(())
    }

    fn publish_ticker(&self, ticker: &Ticker24h) -> Result<(), ExchangeError> {
        info!(
            symbol = %ticker.symbol,
            last = %ticker.last_price,
            change_percent = %ticker.price_change_percent,
            "ticker"
        );
        Ok(())
    }

    fn publish_candle(&self, candle: &Candle) -> Result<(), ExchangeError> {
        info!(
            symbol = %candle.symbol,
            interval = ?candle.interval,
            open = %candle.open,
            close = %candle.close,
            volume = %candle.volume,
            "candle"
        );
        Ok(())
    }

    fn publish_order_book(&self, snapshot: &OrderBookSnapshot) -> Result<(), ExchangeError> {
        info!(
            symbol = %snapshot.symbol,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "order book"
        );
        Ok(())
    }
}
