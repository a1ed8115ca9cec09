//! Market Data Service
//!
//! Consumes the trade-event stream and book snapshots from the matching
//! engine and derives the public market-data surface:
//!
//! - OHLCV candles per configured interval (upserted in place)
//! - A rolling 24h ticker per symbol with true window rotation
//! - Order-book snapshot rebroadcast with a read-mostly cache
//! - Trade history persistence and recent-trade queries
//!
//! All entry points take `&self` and accept concurrent callers; the ticker
//! state and the book cache sit behind separate locks. Everything derived
//! here fans out through the [`publisher::MarketDataPublisher`] sink, whose
//! failures are logged and never propagated.

pub mod candles;
pub mod engine;
pub mod publisher;
pub mod repository;
pub mod ticker;

pub use candles::{Candle, CandleInterval};
pub use engine::{MarketDataConfig, MarketDataEngine};
pub use publisher::{LogPublisher, MarketDataPublisher};
pub use repository::{
    CandleRepository, InMemoryCandleRepository, InMemoryTickerRepository,
    InMemoryTradeHistoryRepository, TickerRepository, TradeHistoryRepository,
};
pub use ticker::Ticker24h;
