//! Risk persistence seams
//!
//! Positions and margin accounts are updated in place; risk events are
//! append-only; market status is a per-symbol flag flipped by the circuit
//! breaker.

use dashmap::DashMap;
use parking_lot::Mutex;
use types::errors::ExchangeError;
use types::ids::{Symbol, UserId};
use types::position::{MarginAccount, Position};

use crate::events::{MarketStatus, RiskEvent};

/// Per-user, per-symbol position storage
pub trait PositionRepository: Send + Sync {
    fn get(&self, user_id: UserId, symbol: &Symbol) -> Result<Option<Position>, ExchangeError>;
    fn upsert(&self, position: Position) -> Result<(), ExchangeError>;
    fn list_for_user(&self, user_id: UserId) -> Result<Vec<Position>, ExchangeError>;
}

/// Per-user margin account storage
pub trait MarginRepository: Send + Sync {
    fn get(&self, user_id: UserId) -> Result<Option<MarginAccount>, ExchangeError>;
    fn upsert(&self, account: MarginAccount) -> Result<(), ExchangeError>;
}

/// Append-only risk event log
pub trait RiskEventRepository: Send + Sync {
    fn append(&self, event: RiskEvent) -> Result<(), ExchangeError>;
    fn recent(&self, limit: usize) -> Result<Vec<RiskEvent>, ExchangeError>;
}

/// Per-symbol market status flag
pub trait MarketStatusRepository: Send + Sync {
    fn get(&self, symbol: &Symbol) -> Result<MarketStatus, ExchangeError>;
    fn set(&self, symbol: &Symbol, status: MarketStatus) -> Result<(), ExchangeError>;
}

/// DashMap-backed position repository
#[derive(Default)]
pub struct InMemoryPositionRepository {
    positions: DashMap<(UserId, Symbol), Position>,
}

impl InMemoryPositionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionRepository for InMemoryPositionRepository {
    fn get(&self, user_id: UserId, symbol: &Symbol) -> Result<Option<Position>, ExchangeError> {
        Ok(self
            .positions
            .get(&(user_id, symbol.clone()))
            .map(|entry| entry.clone()))
    }

    fn upsert(&self, position: Position) -> Result<(), ExchangeError> {
        self.positions
            .insert((position.user_id, position.symbol.clone()), position);
        Ok(())
    }

    fn list_for_user(&self, user_id: UserId) -> Result<Vec<Position>, ExchangeError> {
        Ok(self
            .positions
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.clone())
            .collect())
    }
}

/// DashMap-backed margin repository
#[derive(Default)]
pub struct InMemoryMarginRepository {
    accounts: DashMap<UserId, MarginAccount>,
}

impl InMemoryMarginRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarginRepository for InMemoryMarginRepository {
    fn get(&self, user_id: UserId) -> Result<Option<MarginAccount>, ExchangeError> {
        Ok(self.accounts.get(&user_id).map(|entry| entry.clone()))
    }

    fn upsert(&self, account: MarginAccount) -> Result<(), ExchangeError> {
        self.accounts.insert(account.user_id, account);
        Ok(())
    }
}

/// Vec-backed risk event log
#[derive(Default)]
pub struct InMemoryRiskEventRepository {
    events: Mutex<Vec<RiskEvent>>,
}

impl InMemoryRiskEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RiskEventRepository for InMemoryRiskEventRepository {
    fn append(&self, event: RiskEvent) -> Result<(), ExchangeError> {
        self.events.lock().push(event);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<RiskEvent>, ExchangeError> {
        let events = self.events.lock();
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}

/// DashMap-backed market status repository; unknown symbols are Open
#[derive(Default)]
pub struct InMemoryMarketStatusRepository {
    status: DashMap<Symbol, MarketStatus>,
}

impl InMemoryMarketStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarketStatusRepository for InMemoryMarketStatusRepository {
    fn get(&self, symbol: &Symbol) -> Result<MarketStatus, ExchangeError> {
        Ok(self
            .status
            .get(symbol)
            .map(|entry| *entry)
            .unwrap_or(MarketStatus::Open))
    }

    fn set(&self, symbol: &Symbol, status: MarketStatus) -> Result<(), ExchangeError> {
        self.status.insert(symbol.clone(), status);
        Ok(())
    }
}
