//! Realtime event bus seam
//!
//! Book updates and trades flow to realtime consumers through this trait.
//! The engine treats the bus as fire-and-forget: failures are logged,
//! never propagated, and a slow subscriber cannot fail a trade.

use tracing::info;
use types::book::OrderBookSnapshot;
use types::errors::ExchangeError;
use types::ids::Symbol;
use types::trade::Trade;

/// Outbound realtime stream of book updates and trades
pub trait EventBus: Send + Sync {
    fn publish_order_book_update(
        &self,
        symbol: &Symbol,
        snapshot: &OrderBookSnapshot,
    ) -> Result<(), ExchangeError>;

    fn publish_trade(&self, trade: &Trade) -> Result<(), ExchangeError>;
}

/// Bus that only emits tracing output
#[derive(Debug, Default)]
pub struct LogEventBus;

impl EventBus for LogEventBus {
    fn publish_order_book_update(
        &self,
        symbol: &Symbol,
        snapshot: &OrderBookSnapshot,
    ) -> Result<(), ExchangeError> {
        info!(
            symbol = %symbol,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "book update"
        );
        Ok(())
    }

    fn publish_trade(&self, trade: &Trade) -> Result<(), ExchangeError> {
        info!(
            symbol = %trade.symbol,
            price = %trade.price,
            quantity = %trade.quantity,
            "trade published"
        );
        Ok(())
    }
}
