//! Per-symbol order book
//!
//! Two price-indexed sides with FIFO levels. The book itself is a plain
//! data structure; the engine wraps each book in a mutex so matching and
//! snapshots are linearisable per symbol.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::PriceLevel;

use types::book::OrderBookSnapshot;
use types::ids::{OrderId, Symbol};
use types::numeric::Price;
use types::order::{Order, Side};

/// Price-time-priority book for one symbol
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    pub(crate) bids: BidBook,
    pub(crate) asks: AskBook,
}

impl OrderBook {
    /// Create an empty book for a symbol
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    /// Symbol this book trades
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Rest an order on its side at its limit price
    pub fn add(&mut self, order: Order) {
        match order.side {
            Side::BUY => self.bids.insert(order),
            Side::SELL => self.asks.insert(order),
        }
    }

    /// Remove a resting order by id, searching both sides
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        self.bids
            .remove(order_id)
            .or_else(|| self.asks.remove(order_id))
    }

    /// Best bid price, if any
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Best ask price, if any
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Top-`depth` levels per side; `depth == 0` means all levels
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.depth(depth),
            asks: self.asks.depth(depth),
        }
    }
}
