//! Fill execution
//!
//! Applies a fill to both orders and materializes the trade records. The
//! execution price is always the resting order's price, so any price
//! improvement accrues to the aggressor.

use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::trade::{Trade, TradeEvent, TradeSource};

/// Outcome of one fill between an incoming and a resting order
#[derive(Debug, Clone)]
pub struct Fill {
    pub trade: Trade,
    pub event: TradeEvent,
    /// Snapshot of the maker after the fill was applied
    pub maker: Order,
}

/// Execute one fill at the maker's price
///
/// Both orders' filled quantities and statuses advance atomically from the
/// caller's perspective (the caller holds the book lock). The trade event
/// tags the incoming order's side as the aggressor.
pub fn execute_fill(
    incoming: &mut Order,
    maker: &mut Order,
    price: Price,
    quantity: Quantity,
    timestamp: i64,
) -> Fill {
    incoming.add_fill(quantity, timestamp);
    maker.add_fill(quantity, timestamp);

    let (buy_order_id, sell_order_id) = match incoming.side {
        Side::BUY => (incoming.order_id, maker.order_id),
        Side::SELL => (maker.order_id, incoming.order_id),
    };

    let trade = Trade::new(
        incoming.symbol.clone(),
        buy_order_id,
        sell_order_id,
        price,
        quantity,
        timestamp,
    );

    let event = TradeEvent {
        trade_id: trade.trade_id,
        symbol: trade.symbol.clone(),
        price,
        quantity,
        aggressor: incoming.side,
        source: TradeSource::Lit,
        timestamp,
    };

    Fill {
        trade,
        event,
        maker: maker.clone(),
    }
}
