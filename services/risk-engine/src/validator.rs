//! Pre-trade validation checks
//!
//! Each check is a pure function over the order and the current risk state;
//! the engine sequences them and fails on the first rejection.

use rust_decimal::Decimal;
use types::errors::RiskError;
use types::numeric::Price;
use types::order::{Order, OrderType};
use types::position::MarginAccount;

/// Reference price for notional computations: the limit price when the
/// order carries one, otherwise the last trade price.
pub fn reference_price(order: &Order, last_price: Option<Price>) -> Option<Price> {
    match order.order_type {
        OrderType::LIMIT => Some(order.price),
        OrderType::MARKET | OrderType::STOP => last_price.filter(|p| !p.is_zero()),
    }
}

/// Price-band check, limit orders only
///
/// Rejects when the limit price deviates from the last trade price by more
/// than the configured percentage. Without a reference price there is no
/// band to enforce and the check passes.
pub fn check_price_band(
    order: &Order,
    last_price: Option<Price>,
    max_deviation_percent: Decimal,
) -> Result<(), RiskError> {
    if order.order_type != OrderType::LIMIT {
        return Ok(());
    }
    let reference = match last_price {
        Some(p) if !p.is_zero() => p.as_decimal(),
        _ => return Ok(()),
    };

    let deviation = (order.price.as_decimal() - reference).abs() / reference * Decimal::from(100);
    if deviation > max_deviation_percent {
        return Err(RiskError::PriceBand {
            deviation_percent: deviation,
            max_percent: max_deviation_percent,
        });
    }
    Ok(())
}

/// Per-order notional cap
pub fn check_max_notional(
    order: &Order,
    last_price: Option<Price>,
    max_notional: Decimal,
) -> Result<(), RiskError> {
    let reference = match reference_price(order, last_price) {
        Some(p) => p.as_decimal(),
        None => return Ok(()),
    };
    let notional = reference * order.quantity.as_decimal();
    if notional > max_notional {
        return Err(RiskError::MaxNotional {
            notional,
            max_notional,
        });
    }
    Ok(())
}

/// Pre-trade margin check
///
/// The order consumes `notional / max_leverage` of margin; equity must
/// cover the maintenance ratio applied to the post-order used margin.
pub fn check_margin(
    account: &MarginAccount,
    order_notional: Decimal,
    max_leverage: Decimal,
    maintenance_ratio: Decimal,
) -> Result<(), RiskError> {
    let additional_margin = order_notional / max_leverage;
    let post_used = account.used_margin + additional_margin;
    let required_equity = post_used * maintenance_ratio;
    if account.equity < required_equity {
        return Err(RiskError::InsufficientMargin {
            required_equity,
            equity: account.equity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{Symbol, UserId};
    use types::numeric::Quantity;
    use types::order::Side;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn limit_order(price: u64, qty: u64) -> Order {
        Order::new(
            UserId::new(),
            Symbol::new("AAPL"),
            Side::BUY,
            OrderType::LIMIT,
            Price::from_u64(price),
            None,
            Quantity::from_u64(qty),
            TS,
        )
    }

    fn market_order(qty: u64) -> Order {
        Order::new(
            UserId::new(),
            Symbol::new("AAPL"),
            Side::BUY,
            OrderType::MARKET,
            Price::zero(),
            None,
            Quantity::from_u64(qty),
            TS,
        )
    }

    #[test]
    fn test_price_band_within() {
        let order = limit_order(105, 1);
        assert!(check_price_band(&order, Some(Price::from_u64(100)), Decimal::from(10)).is_ok());
    }

    #[test]
    fn test_price_band_exceeded() {
        let order = limit_order(120, 1);
        let err =
            check_price_band(&order, Some(Price::from_u64(100)), Decimal::from(10)).unwrap_err();
        assert!(matches!(err, RiskError::PriceBand { .. }));
    }

    #[test]
    fn test_price_band_no_reference_passes() {
        let order = limit_order(99_999, 1);
        assert!(check_price_band(&order, None, Decimal::from(10)).is_ok());
    }

    #[test]
    fn test_price_band_skips_market_orders() {
        let order = market_order(1);
        assert!(check_price_band(&order, Some(Price::from_u64(1)), Decimal::from(10)).is_ok());
    }

    #[test]
    fn test_max_notional_limit_order() {
        let order = limit_order(100, 50);
        assert!(check_max_notional(&order, None, Decimal::from(5_000)).is_ok());

        let err = check_max_notional(&order, None, Decimal::from(4_999)).unwrap_err();
        assert!(matches!(err, RiskError::MaxNotional { .. }));
    }

    #[test]
    fn test_max_notional_market_uses_last_price() {
        let order = market_order(50);
        // No last price: nothing to measure against
        assert!(check_max_notional(&order, None, Decimal::from(1)).is_ok());

        let err = check_max_notional(&order, Some(Price::from_u64(100)), Decimal::from(4_999))
            .unwrap_err();
        assert!(matches!(err, RiskError::MaxNotional { .. }));
    }

    #[test]
    fn test_margin_check() {
        let user = UserId::new();
        let mut account = MarginAccount::new(user, TS);

        // Zero maintenance ratio: any order passes
        assert!(check_margin(&account, Decimal::from(1_000), Decimal::from(10), Decimal::ZERO).is_ok());

        // With a ratio, zero equity cannot support new margin
        let err = check_margin(
            &account,
            Decimal::from(1_000),
            Decimal::from(10),
            Decimal::from_str_exact("0.25").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, RiskError::InsufficientMargin { .. }));

        // Equity above the requirement passes
        account.equity = Decimal::from(100);
        assert!(check_margin(
            &account,
            Decimal::from(1_000),
            Decimal::from(10),
            Decimal::from_str_exact("0.25").unwrap(),
        )
        .is_ok());
    }

    #[test]
    fn test_margin_requirement_formula() {
        let user = UserId::new();
        let mut account = MarginAccount::new(user, TS);
        account.used_margin = Decimal::from(500);
        account.equity = Decimal::from(200);

        // additional = 1000/10 = 100; required = (500+100) * 0.25 = 150
        assert!(check_margin(
            &account,
            Decimal::from(1_000),
            Decimal::from(10),
            Decimal::from_str_exact("0.25").unwrap(),
        )
        .is_ok());

        // required = (500+100) * 0.5 = 300 > 200
        assert!(check_margin(
            &account,
            Decimal::from(1_000),
            Decimal::from(10),
            Decimal::from_str_exact("0.5").unwrap(),
        )
        .is_err());
    }
}
