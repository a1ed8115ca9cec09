//! Order/trade persistence seam
//!
//! Orders are saved at admission and updated on every fill or
//! cancellation; trades are append-only. Cold start rebuilds the book from
//! the resting orders this repository returns.

use dashmap::DashMap;
use parking_lot::Mutex;
use types::errors::ExchangeError;
use types::ids::{OrderId, Symbol};
use types::order::{Order, OrderStatus, OrderType};
use types::trade::Trade;

/// CRUD surface for orders and trades
pub trait OrderRepository: Send + Sync {
    fn save_order(&self, order: Order) -> Result<(), ExchangeError>;
    fn update_order(&self, order: Order) -> Result<(), ExchangeError>;
    fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, ExchangeError>;
    fn save_trade(&self, trade: Trade) -> Result<(), ExchangeError>;

    /// Resting limit orders for a symbol (cold-start book rebuild)
    fn resting_orders(&self, symbol: &Symbol) -> Result<Vec<Order>, ExchangeError>;
}

/// DashMap-backed repository for tests and single-process wiring
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<OrderId, Order>,
    trades: Mutex<Vec<Trade>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded trades in execution order (test inspection)
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().clone()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn save_order(&self, order: Order) -> Result<(), ExchangeError> {
        self.orders.insert(order.order_id, order);
        Ok(())
    }

    fn update_order(&self, order: Order) -> Result<(), ExchangeError> {
        self.orders.insert(order.order_id, order);
        Ok(())
    }

    fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, ExchangeError> {
        Ok(self.orders.get(order_id).map(|entry| entry.clone()))
    }

    fn save_trade(&self, trade: Trade) -> Result<(), ExchangeError> {
        self.trades.lock().push(trade);
        Ok(())
    }

    fn resting_orders(&self, symbol: &Symbol) -> Result<Vec<Order>, ExchangeError> {
        let mut resting: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| {
                &entry.symbol == symbol
                    && entry.order_type == OrderType::LIMIT
                    && matches!(
                        entry.status,
                        OrderStatus::New | OrderStatus::PartiallyFilled
                    )
            })
            .map(|entry| entry.clone())
            .collect();
        resting.sort_by_key(|order| order.created_at);
        Ok(resting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::numeric::{Price, Quantity};
    use types::order::Side;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn order(status: OrderStatus, created_at: i64) -> Order {
        let mut order = Order::new(
            UserId::new(),
            Symbol::new("AAPL"),
            Side::SELL,
            OrderType::LIMIT,
            Price::from_u64(100),
            None,
            Quantity::from_u64(10),
            created_at,
        );
        if status == OrderStatus::PartiallyFilled {
            order.add_fill(Quantity::from_u64(1), created_at);
        }
        order
    }

    #[test]
    fn test_order_round_trip() {
        let repo = InMemoryOrderRepository::new();
        let order = order(OrderStatus::New, TS);
        let order_id = order.order_id;

        repo.save_order(order).unwrap();
        assert!(repo.find_order(&order_id).unwrap().is_some());
    }

    #[test]
    fn test_resting_orders_filters_and_sorts() {
        let repo = InMemoryOrderRepository::new();
        let symbol = Symbol::new("AAPL");

        repo.save_order(order(OrderStatus::New, TS + 2)).unwrap();
        repo.save_order(order(OrderStatus::PartiallyFilled, TS + 1)).unwrap();

        let mut canceled = order(OrderStatus::New, TS);
        canceled.cancel(TS);
        repo.save_order(canceled).unwrap();

        let resting = repo.resting_orders(&symbol).unwrap();
        assert_eq!(resting.len(), 2);
        assert!(resting[0].created_at < resting[1].created_at);
    }
}
