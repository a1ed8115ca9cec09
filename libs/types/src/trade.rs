//! Trade and trade-event types

use crate::ids::{OrderId, Symbol, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed match between two orders
///
/// Immutable once published. The price is always the resting order's price;
/// price improvement accrues to the aggressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: i64, // Unix nanos
}

impl Trade {
    pub fn new(
        symbol: Symbol,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            symbol,
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            executed_at,
        }
    }

    /// Trade value (price × quantity)
    pub fn trade_value(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}

/// Venue a trade originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSource {
    /// Continuous lit-book matching
    Lit,
    /// Negotiated block execution
    DarkPool,
}

/// Market-data view of a trade
///
/// Carries the aggressor side instead of the order references; this is the
/// shape consumed by candles, tickers, and public trade feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub price: Price,
    pub quantity: Quantity,
    /// Side of the incoming order that removed liquidity
    pub aggressor: Side,
    pub source: TradeSource,
    pub timestamp: i64, // Unix nanos
}

impl TradeEvent {
    /// Event value (price × quantity)
    pub fn value(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_value() {
        let trade = Trade::new(
            Symbol::new("AAPL"),
            OrderId::new(),
            OrderId::new(),
            Price::from_u64(100),
            Quantity::from_str("0.5").unwrap(),
            1_708_123_456_789_000_000,
        );

        assert_eq!(trade.trade_value(), Decimal::from(50));
    }

    #[test]
    fn test_trade_source_wire_tags() {
        assert_eq!(serde_json::to_string(&TradeSource::Lit).unwrap(), "\"LIT\"");
        assert_eq!(
            serde_json::to_string(&TradeSource::DarkPool).unwrap(),
            "\"DARK_POOL\""
        );
    }

    #[test]
    fn test_trade_event_serialization() {
        let event = TradeEvent {
            trade_id: TradeId::new(),
            symbol: Symbol::new("AAPL"),
            price: Price::from_u64(101),
            quantity: Quantity::from_u64(3),
            aggressor: Side::BUY,
            source: TradeSource::Lit,
            timestamp: 1_708_123_456_789_000_000,
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: TradeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
        assert_eq!(event.value(), Decimal::from(303));
    }
}
