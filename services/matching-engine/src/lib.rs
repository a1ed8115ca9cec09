//! Matching Engine Service
//!
//! The trading-pipeline orchestrator: a per-symbol price-time-priority
//! order book, the admission pipeline (validation → halt check → risk →
//! balance lock → persist), the match loop, stop-order triggering, and the
//! post-fill fan-out into clearing, risk, the circuit breaker, market
//! data, and the realtime event bus.
//!
//! ```text
//! PlaceOrder
//!     │ validate / can_trade / risk / lock
//!     ▼
//! ┌─────────┐   fills    ┌──────────────────────────────────┐
//! │  Book   ├───────────►│ repo · bus · risk · clearing ·   │
//! │ (mutex) │            │ breaker · market-data            │
//! └─────────┘            └──────────────────────────────────┘
//!     │
//!     ▼
//! depth-50 snapshot → event bus + market-data cache
//! ```

pub mod book;
pub mod bus;
pub mod engine;
pub mod feed;
pub mod matching;
pub mod repository;

pub use book::OrderBook;
pub use bus::{EventBus, LogEventBus};
pub use engine::{MatchingEngine, NewOrderRequest};
pub use feed::LastPriceFeed;
pub use repository::{InMemoryOrderRepository, OrderRepository};
