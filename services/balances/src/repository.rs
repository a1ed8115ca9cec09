//! Balance persistence seam
//!
//! The service reads and writes balances through this trait; production
//! deployments back it with relational storage, tests and single-process
//! wiring use the in-memory implementation.

use dashmap::DashMap;
use parking_lot::Mutex;
use types::balance::{Balance, LedgerEntry};
use types::errors::ExchangeError;
use types::ids::UserId;

/// CRUD surface for balances and the append-only ledger
pub trait BalanceRepository: Send + Sync {
    /// Fetch the balance for (user, asset), creating an empty one if absent
    fn get_or_create(&self, user_id: UserId, asset: &str, now: i64) -> Result<Balance, ExchangeError>;

    /// Fetch the balance for (user, asset) without creating it
    fn get(&self, user_id: UserId, asset: &str) -> Result<Option<Balance>, ExchangeError>;

    /// Persist an updated balance
    fn update(&self, balance: Balance) -> Result<(), ExchangeError>;

    /// Append a ledger entry
    fn append_entry(&self, entry: LedgerEntry) -> Result<(), ExchangeError>;

    /// Recent ledger entries for a user, newest first
    fn entries_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<LedgerEntry>, ExchangeError>;

    /// All balances currently stored (conservation audits)
    fn all_balances(&self) -> Result<Vec<Balance>, ExchangeError>;
}

/// DashMap-backed repository for tests and single-process wiring
#[derive(Default)]
pub struct InMemoryBalanceRepository {
    balances: DashMap<(UserId, String), Balance>,
    ledger: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryBalanceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BalanceRepository for InMemoryBalanceRepository {
    fn get_or_create(&self, user_id: UserId, asset: &str, now: i64) -> Result<Balance, ExchangeError> {
        let key = (user_id, asset.to_string());
        let balance = self
            .balances
            .entry(key)
            .or_insert_with(|| Balance::new(user_id, asset, now));
        Ok(balance.clone())
    }

    fn get(&self, user_id: UserId, asset: &str) -> Result<Option<Balance>, ExchangeError> {
        Ok(self
            .balances
            .get(&(user_id, asset.to_string()))
            .map(|entry| entry.clone()))
    }

    fn update(&self, balance: Balance) -> Result<(), ExchangeError> {
        self.balances
            .insert((balance.user_id, balance.asset.clone()), balance);
        Ok(())
    }

    fn append_entry(&self, entry: LedgerEntry) -> Result<(), ExchangeError> {
        self.ledger.lock().push(entry);
        Ok(())
    }

    fn entries_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<LedgerEntry>, ExchangeError> {
        let ledger = self.ledger.lock();
        Ok(ledger
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn all_balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        Ok(self.balances.iter().map(|entry| entry.clone()).collect())
    }
}
