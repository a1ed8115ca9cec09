//! Crossing detection
//!
//! Decides when an incoming order can trade against a resting price.

use types::numeric::Price;
use types::order::{Order, OrderType, Side};

/// Check whether the incoming order crosses the best opposing price
///
/// Market orders always cross. A limit buy crosses asks at or below its
/// price; a limit sell crosses bids at or above its price.
pub fn crosses(incoming: &Order, resting_price: Price) -> bool {
    if incoming.order_type == OrderType::MARKET {
        return true;
    }
    match incoming.side {
        Side::BUY => incoming.price >= resting_price,
        Side::SELL => incoming.price <= resting_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{Symbol, UserId};
    use types::numeric::Quantity;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn order(side: Side, order_type: OrderType, price: u64) -> Order {
        Order::new(
            UserId::new(),
            Symbol::new("AAPL"),
            side,
            order_type,
            if price == 0 {
                Price::zero()
            } else {
                Price::from_u64(price)
            },
            None,
            Quantity::from_u64(1),
            TS,
        )
    }

    #[test]
    fn test_limit_buy_crossing() {
        let buy = order(Side::BUY, OrderType::LIMIT, 100);
        assert!(crosses(&buy, Price::from_u64(99)));
        assert!(crosses(&buy, Price::from_u64(100)));
        assert!(!crosses(&buy, Price::from_u64(101)));
    }

    #[test]
    fn test_limit_sell_crossing() {
        let sell = order(Side::SELL, OrderType::LIMIT, 100);
        assert!(crosses(&sell, Price::from_u64(101)));
        assert!(crosses(&sell, Price::from_u64(100)));
        assert!(!crosses(&sell, Price::from_u64(99)));
    }

    #[test]
    fn test_market_always_crosses() {
        let buy = order(Side::BUY, OrderType::MARKET, 0);
        assert!(crosses(&buy, Price::from_u64(1)));
        assert!(crosses(&buy, Price::from_u64(1_000_000)));

        let sell = order(Side::SELL, OrderType::MARKET, 0);
        assert!(crosses(&sell, Price::from_u64(1)));
    }
}
