//! Risk configuration

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Pre-trade and margin thresholds
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Maximum deviation of a limit price from the last trade, in percent
    pub max_price_deviation_percent: Decimal,
    /// Maximum notional (price × quantity) for a single order
    pub max_notional_per_order: Decimal,
    /// Leverage divisor for the margin consumed by each order
    pub max_leverage: Decimal,
    /// Fraction of used margin that equity must cover
    pub maintenance_margin_req: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_price_deviation_percent: Decimal::from(10),
            max_notional_per_order: Decimal::from(1_000_000),
            max_leverage: Decimal::from(10),
            maintenance_margin_req: Decimal::from_str_exact("0.25").unwrap(),
        }
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Intra-window move (up or down, percent of window-first price) that halts the symbol
    pub move_percent: Decimal,
    /// Trailing observation window, nanoseconds
    pub window: i64,
    /// Halt duration once tripped, nanoseconds
    pub halt_duration: i64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            move_percent: Decimal::from(10),
            window: 60 * 1_000_000_000,
            halt_duration: 5 * 60 * 1_000_000_000,
        }
    }
}
