//! Shared domain types for the exchange trading core
//!
//! Entities cross service boundaries in exactly the shapes defined here:
//! fixed-point prices and quantities, uuid-v7 identifiers, orders and
//! trades, balances with ledger entries, positions and margin accounts,
//! and order-book snapshots. Wire-visible enums carry their JSON tags
//! (`"BUY"`, `"PARTIALLY_FILLED"`, `"DARK_POOL"`, …) on the types
//! themselves so every service serializes identically.

pub mod balance;
pub mod book;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod position;
pub mod trade;

pub use balance::{Balance, LedgerEntry, LedgerEntryKind};
pub use book::{BookLevel, OrderBookSnapshot};
pub use errors::{BalanceError, ClearingError, ExchangeError, OrderError, RiskError};
pub use ids::{OrderId, Symbol, TradeId, UserId};
pub use numeric::{Price, Quantity};
pub use order::{Order, OrderStatus, OrderType, Side};
pub use position::{MarginAccount, MarginHealth, Position};
pub use trade::{Trade, TradeEvent, TradeSource};
