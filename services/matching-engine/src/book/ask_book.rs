//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).

use std::collections::BTreeMap;
use types::book::BookLevel;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;

use super::price_level::PriceLevel;

/// Sell side of the book; the lowest price is the best ask
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resting order at its limit price
    pub fn insert(&mut self, order: Order) {
        self.levels
            .entry(order.price)
            .or_insert_with(PriceLevel::new)
            .push_back(order);
    }

    /// Remove an order by id, searching all levels
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let mut removed = None;
        let mut empty_price = None;
        for (price, level) in self.levels.iter_mut() {
            if let Some(order) = level.remove(order_id) {
                if level.is_empty() {
                    empty_price = Some(*price);
                }
                removed = Some(order);
                break;
            }
        }
        if let Some(price) = empty_price {
            self.levels.remove(&price);
        }
        removed
    }

    /// Best ask price (lowest), if any
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Mutable access to the best ask level
    pub fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels
            .iter_mut()
            .next()
            .map(|(price, level)| (*price, level))
    }

    /// Erase the level at `price` if it holds no orders
    pub fn remove_if_empty(&mut self, price: Price) {
        if let Some(level) = self.levels.get(&price) {
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
    }

    /// Top-`depth` levels, lowest price first; `depth == 0` means all.
    /// Levels whose remaining quantity has drained to zero are skipped.
    pub fn depth(&self, depth: usize) -> Vec<BookLevel> {
        let mut result = Vec::new();
        for (price, level) in self.levels.iter() {
            if depth > 0 && result.len() >= depth {
                break;
            }
            let quantity = level.total_remaining();
            if quantity.is_zero() {
                continue;
            }
            result.push(BookLevel {
                price: *price,
                quantity,
                count: level.order_count(),
            });
        }
        result
    }

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{Symbol, UserId};
    use types::numeric::Quantity;
    use types::order::{OrderType, Side};

    const TS: i64 = 1_708_123_456_789_000_000;

    fn order(price: u64, qty: u64) -> Order {
        Order::new(
            UserId::new(),
            Symbol::new("AAPL"),
            Side::SELL,
            OrderType::LIMIT,
            Price::from_u64(price),
            None,
            Quantity::from_u64(qty),
            TS,
        )
    }

    #[test]
    fn test_best_is_lowest() {
        let mut book = AskBook::new();
        book.insert(order(101, 1));
        book.insert(order(99, 2));
        book.insert(order(100, 3));

        assert_eq!(book.best_price(), Some(Price::from_u64(99)));
    }

    #[test]
    fn test_depth_ascending() {
        let mut book = AskBook::new();
        book.insert(order(101, 1));
        book.insert(order(99, 2));
        book.insert(order(100, 3));

        let depth = book.depth(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].price, Price::from_u64(99));
        assert_eq!(depth[1].price, Price::from_u64(100));
    }

    #[test]
    fn test_remove_erases_empty_level() {
        let mut book = AskBook::new();
        let resting = order(100, 1);
        let order_id = resting.order_id;
        book.insert(resting);
        book.insert(order(101, 1));

        assert!(book.remove(&order_id).is_some());
        assert_eq!(book.level_count(), 1);
        assert_eq!(book.best_price(), Some(Price::from_u64(101)));
    }
}
