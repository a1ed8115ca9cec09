//! Clearing Service
//!
//! Accumulates per-user base/quote deltas from matched trades into clearing
//! positions keyed by (user, symbol, settlement date), then drains due
//! positions in settlement batches that apply each position to custody —
//! the balance ledger — marking positions settled or failed individually.
//!
//! Settlement runs as a discrete scheduled task: the driver passes the
//! current time and a cancellation flag checked between positions.

pub mod engine;
pub mod models;
pub mod repository;

pub use engine::{CancelFlag, ClearingEngine, Custody, SettlementBridge};
pub use models::{
    ClearingConfig, ClearingPosition, SettlementBatch, SettlementMode, SettlementStatus,
};
pub use repository::{ClearingRepository, InMemoryClearingRepository};
