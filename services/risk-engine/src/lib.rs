//! Risk Engine Service
//!
//! Pre-trade validation (price bands, notional caps, margin requirements),
//! post-trade position and margin-equity accounting with margin-call
//! events, and the per-symbol circuit breaker that halts trading under
//! abnormal volatility.
//!
//! The matching engine consults [`engine::RiskEngine::validate_new_order`]
//! and [`circuit_breaker::CircuitBreaker::can_trade`] before admitting an
//! order, and feeds every fill back through
//! [`engine::RiskEngine::on_trade`] and
//! [`circuit_breaker::CircuitBreaker::on_trade_tick`].

pub mod circuit_breaker;
pub mod config;
pub mod engine;
pub mod events;
pub mod repository;
pub mod validator;

pub use circuit_breaker::CircuitBreaker;
pub use config::{CircuitBreakerConfig, RiskConfig};
pub use engine::{PriceFeed, RiskEngine};
pub use events::{LogNotifier, MarketStatus, RiskEvent, RiskEventKind, RiskNotifier};
pub use repository::{
    InMemoryMarginRepository, InMemoryMarketStatusRepository, InMemoryPositionRepository,
    InMemoryRiskEventRepository, MarginRepository, MarketStatusRepository, PositionRepository,
    RiskEventRepository,
};
