//! Circuit breaker
//!
//! Watches trade ticks per symbol over a trailing window and halts the
//! symbol when the move from the window's first price exceeds the
//! configured threshold in either direction. Ticks arriving during an
//! active halt are ignored, so a second qualifying tick never extends the
//! halt; the halt lifts exactly at its expiry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, warn};
use types::errors::ExchangeError;
use types::ids::Symbol;
use types::numeric::Price;

use crate::config::CircuitBreakerConfig;
use crate::events::{MarketStatus, RiskNotifier};
use crate::repository::MarketStatusRepository;

/// One observed trade price
#[derive(Debug, Clone, Copy)]
struct PriceTick {
    price: Decimal,
    timestamp: i64,
}

#[derive(Default)]
struct BreakerState {
    ticks: HashMap<Symbol, Vec<PriceTick>>,
    halts: HashMap<Symbol, i64>,
}

/// Per-symbol volatility halt
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    market_status: Arc<dyn MarketStatusRepository>,
    notifier: Arc<dyn RiskNotifier>,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(
        config: CircuitBreakerConfig,
        market_status: Arc<dyn MarketStatusRepository>,
        notifier: Arc<dyn RiskNotifier>,
    ) -> Self {
        Self {
            config,
            market_status,
            notifier,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Observe a trade tick, tripping the halt when the intra-window move
    /// reaches the threshold
    pub fn on_trade_tick(
        &self,
        symbol: &Symbol,
        price: Price,
        timestamp: i64,
    ) -> Result<(), ExchangeError> {
        let mut state = self.state.lock();

        if let Some(until) = state.halts.get(symbol) {
            if timestamp < *until {
                return Ok(());
            }
        }

        let ticks = state.ticks.entry(symbol.clone()).or_default();
        ticks.push(PriceTick {
            price: price.as_decimal(),
            timestamp,
        });

        let window_start = timestamp - self.config.window;
        ticks.retain(|tick| tick.timestamp > window_start);
        if ticks.is_empty() {
            return Ok(());
        }

        let first = ticks[0].price;
        if first == Decimal::ZERO {
            return Ok(());
        }
        let mut low = first;
        let mut high = first;
        for tick in ticks.iter() {
            if tick.price < low {
                low = tick.price;
            }
            if tick.price > high {
                high = tick.price;
            }
        }

        let hundred = Decimal::from(100);
        let move_up = (high - first) / first * hundred;
        let move_down = (first - low) / first * hundred;

        if move_up >= self.config.move_percent || move_down >= self.config.move_percent {
            let until = timestamp + self.config.halt_duration;
            state.halts.insert(symbol.clone(), until);
            drop(state);

            warn!(symbol = %symbol, %move_up, %move_down, "circuit breaker tripped");
            if let Err(err) = self.market_status.set(symbol, MarketStatus::Halted) {
                warn!(symbol = %symbol, error = %err, "failed to persist halt status");
            }
            self.notifier
                .notify_market_halt(symbol, "circuit breaker triggered");
        }

        Ok(())
    }

    /// Check whether the symbol may trade at `now`
    ///
    /// An expired halt is cleared here: market status flips back to Open
    /// and the resume notification fires.
    pub fn can_trade(&self, symbol: &Symbol, now: i64) -> bool {
        let mut state = self.state.lock();

        if let Some(until) = state.halts.get(symbol).copied() {
            if now < until {
                return false;
            }
            state.halts.remove(symbol);
            drop(state);

            info!(symbol = %symbol, "halt expired");
            if let Err(err) = self.market_status.set(symbol, MarketStatus::Open) {
                warn!(symbol = %symbol, error = %err, "failed to persist open status");
            }
            self.notifier.notify_market_resume(symbol);
        }
        true
    }

    /// Active halt expiry for a symbol, if any
    pub fn halt_until(&self, symbol: &Symbol) -> Option<i64> {
        self.state.lock().halts.get(symbol).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogNotifier;
    use crate::repository::InMemoryMarketStatusRepository;

    const T0: i64 = 1_708_123_456_000_000_000;
    const SECOND: i64 = 1_000_000_000;

    fn breaker() -> (CircuitBreaker, Arc<InMemoryMarketStatusRepository>) {
        let status = Arc::new(InMemoryMarketStatusRepository::new());
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig {
                move_percent: Decimal::from(10),
                window: 60 * SECOND,
                halt_duration: 300 * SECOND,
            },
            status.clone(),
            Arc::new(LogNotifier),
        );
        (breaker, status)
    }

    #[test]
    fn test_no_halt_below_threshold() {
        let (breaker, status) = breaker();
        let symbol = Symbol::new("AAPL");

        breaker.on_trade_tick(&symbol, Price::from_u64(100), T0).unwrap();
        breaker
            .on_trade_tick(&symbol, Price::from_u64(105), T0 + 10 * SECOND)
            .unwrap();

        assert!(breaker.can_trade(&symbol, T0 + 11 * SECOND));
        assert_eq!(status.get(&symbol).unwrap(), MarketStatus::Open);
    }

    #[test]
    fn test_upward_move_trips_halt() {
        let (breaker, status) = breaker();
        let symbol = Symbol::new("AAPL");

        breaker.on_trade_tick(&symbol, Price::from_u64(100), T0).unwrap();
        breaker
            .on_trade_tick(&symbol, Price::from_u64(105), T0 + 10 * SECOND)
            .unwrap();
        breaker
            .on_trade_tick(&symbol, Price::from_u64(111), T0 + 30 * SECOND)
            .unwrap();

        assert!(!breaker.can_trade(&symbol, T0 + 31 * SECOND));
        assert_eq!(status.get(&symbol).unwrap(), MarketStatus::Halted);
    }

    #[test]
    fn test_downward_move_trips_halt() {
        let (breaker, _status) = breaker();
        let symbol = Symbol::new("AAPL");

        breaker.on_trade_tick(&symbol, Price::from_u64(100), T0).unwrap();
        breaker
            .on_trade_tick(&symbol, Price::from_u64(89), T0 + 10 * SECOND)
            .unwrap();

        assert!(!breaker.can_trade(&symbol, T0 + 11 * SECOND));
    }

    #[test]
    fn test_halt_not_extended_by_ticks_inside_halt() {
        let (breaker, _status) = breaker();
        let symbol = Symbol::new("AAPL");

        breaker.on_trade_tick(&symbol, Price::from_u64(100), T0).unwrap();
        breaker
            .on_trade_tick(&symbol, Price::from_u64(120), T0 + SECOND)
            .unwrap();
        let until = breaker.halt_until(&symbol).unwrap();

        // Another qualifying tick inside the halt is ignored
        breaker
            .on_trade_tick(&symbol, Price::from_u64(150), T0 + 2 * SECOND)
            .unwrap();
        assert_eq!(breaker.halt_until(&symbol), Some(until));
    }

    #[test]
    fn test_halt_lifts_exactly_at_expiry() {
        let (breaker, status) = breaker();
        let symbol = Symbol::new("AAPL");

        breaker.on_trade_tick(&symbol, Price::from_u64(100), T0).unwrap();
        breaker
            .on_trade_tick(&symbol, Price::from_u64(120), T0 + SECOND)
            .unwrap();
        let until = breaker.halt_until(&symbol).unwrap();

        assert!(!breaker.can_trade(&symbol, until - 1));
        assert!(breaker.can_trade(&symbol, until));
        assert_eq!(status.get(&symbol).unwrap(), MarketStatus::Open);
        assert!(breaker.halt_until(&symbol).is_none());
    }

    #[test]
    fn test_old_ticks_evicted_from_window() {
        let (breaker, _status) = breaker();
        let symbol = Symbol::new("AAPL");

        breaker.on_trade_tick(&symbol, Price::from_u64(100), T0).unwrap();
        // Two minutes later the first tick has aged out; 111 alone is no move
        breaker
            .on_trade_tick(&symbol, Price::from_u64(111), T0 + 120 * SECOND)
            .unwrap();

        assert!(breaker.can_trade(&symbol, T0 + 121 * SECOND));
    }

    #[test]
    fn test_symbols_are_independent() {
        let (breaker, _status) = breaker();
        let halted = Symbol::new("AAPL");
        let open = Symbol::new("MSFT");

        breaker.on_trade_tick(&halted, Price::from_u64(100), T0).unwrap();
        breaker
            .on_trade_tick(&halted, Price::from_u64(120), T0 + SECOND)
            .unwrap();

        assert!(!breaker.can_trade(&halted, T0 + 2 * SECOND));
        assert!(breaker.can_trade(&open, T0 + 2 * SECOND));
    }
}
