//! Price level with FIFO order queue
//!
//! A price level holds the resting orders queued at one price in arrival
//! order. The head of the queue always fills first, which is what gives
//! the book its time priority at a given price.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;
use types::order::Order;

/// Resting orders at a single price, oldest first
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back of the queue (time priority)
    pub fn push_back(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    /// Oldest order at this price, if any
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Mutable access to the oldest order
    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Remove and return the oldest order
    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Remove an order anywhere in the queue by id
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let index = self
            .orders
            .iter()
            .position(|order| &order.order_id == order_id)?;
        self.orders.remove(index)
    }

    /// Check if the level holds no orders
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of orders queued at this price
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Summed unfilled quantity across the queue
    pub fn total_remaining(&self) -> Quantity {
        self.orders
            .iter()
            .fold(Quantity::zero(), |acc, order| acc + order.remaining())
    }
}
