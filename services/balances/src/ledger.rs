//! Balance ledger service
//!
//! All mutations for one (user, asset) account run under that account's
//! mutex, held across the repository read-modify-write, so each operation
//! is atomic and all-or-nothing. Operations touching two accounts (the
//! settlement legs) run them sequentially; each leg stays atomic.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;
use types::balance::{Balance, LedgerEntry, LedgerEntryKind};
use types::errors::{BalanceError, ExchangeError};
use types::ids::{Symbol, UserId};

use crate::catalog::AssetCatalog;
use crate::repository::BalanceRepository;

/// The balance service gating order admission and drained by settlement
pub struct BalanceLedger {
    repo: Arc<dyn BalanceRepository>,
    catalog: AssetCatalog,
    account_locks: DashMap<(UserId, String), Arc<Mutex<()>>>,
}

impl BalanceLedger {
    pub fn new(repo: Arc<dyn BalanceRepository>, catalog: AssetCatalog) -> Self {
        Self {
            repo,
            catalog,
            account_locks: DashMap::new(),
        }
    }

    /// Base asset name for a symbol
    pub fn base_asset(&self, symbol: &Symbol) -> String {
        self.catalog.base_asset(symbol)
    }

    /// Quote asset name for a symbol
    pub fn quote_asset(&self, symbol: &Symbol) -> String {
        self.catalog.quote_asset(symbol)
    }

    /// Run `f` against the (user, asset) balance under its account mutex,
    /// persisting the result only when `f` succeeds
    fn with_account<R>(
        &self,
        user_id: UserId,
        asset: &str,
        now: i64,
        f: impl FnOnce(&mut Balance) -> Result<R, ExchangeError>,
    ) -> Result<R, ExchangeError> {
        let lock = self
            .account_locks
            .entry((user_id, asset.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock();

        let mut balance = self.repo.get_or_create(user_id, asset, now)?;
        let result = f(&mut balance)?;
        self.repo.update(balance)?;
        Ok(result)
    }

    /// Check whether `amount` of `asset` can be locked for the user
    pub fn can_lock(&self, user_id: UserId, asset: &str, amount: Decimal) -> bool {
        match self.repo.get(user_id, asset) {
            Ok(Some(balance)) => balance.can_lock(amount),
            _ => false,
        }
    }

    /// Reserve funds: available -> locked, failing without side-effects if
    /// available funds are insufficient
    pub fn lock(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError> {
        require_positive(amount)?;
        self.with_account(user_id, asset, now, |balance| {
            balance.lock(amount, now).map_err(ExchangeError::from)
        })
    }

    /// Release previously locked funds: locked -> available
    pub fn unlock(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError> {
        require_positive(amount)?;
        self.with_account(user_id, asset, now, |balance| {
            balance.unlock(amount, now).map_err(ExchangeError::from)
        })
    }

    /// Add funds to available and append a ledger entry
    pub fn credit(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        kind: LedgerEntryKind,
        reference: &str,
        now: i64,
    ) -> Result<(), ExchangeError> {
        require_positive(amount)?;
        self.with_account(user_id, asset, now, |balance| {
            balance.credit(amount, now);
            Ok(())
        })?;
        self.repo
            .append_entry(LedgerEntry::new(user_id, asset, kind, amount, reference, now))
    }

    /// Remove funds from available and append a negative ledger entry
    pub fn debit(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        kind: LedgerEntryKind,
        reference: &str,
        now: i64,
    ) -> Result<(), ExchangeError> {
        require_positive(amount)?;
        self.with_account(user_id, asset, now, |balance| {
            balance.debit_available(amount, now).map_err(ExchangeError::from)
        })?;
        self.repo
            .append_entry(LedgerEntry::new(user_id, asset, kind, -amount, reference, now))
    }

    /// Spend previously locked funds and append a negative ledger entry
    ///
    /// Used by withdrawal completion: the lock taken at request time is
    /// consumed without ever passing back through available.
    pub fn spend_locked(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        kind: LedgerEntryKind,
        reference: &str,
        now: i64,
    ) -> Result<(), ExchangeError> {
        require_positive(amount)?;
        self.with_account(user_id, asset, now, |balance| {
            balance.debit_locked(amount, now).map_err(ExchangeError::from)
        })?;
        self.repo
            .append_entry(LedgerEntry::new(user_id, asset, kind, -amount, reference, now))
    }

    /// Current balance for (user, asset), if the account exists
    pub fn balance(&self, user_id: UserId, asset: &str) -> Option<Balance> {
        self.repo.get(user_id, asset).ok().flatten()
    }

    /// Apply settled base/quote deltas for one user
    ///
    /// A positive delta means funds flow to the user: unlock the amount if a
    /// lock covers it, otherwise credit available (incoming funds were never
    /// locked on this side). A negative delta means funds leave the user:
    /// spend out of the admission lock, falling back to available, with a
    /// ledger-recorded debit either way.
    pub fn apply_settlement(
        &self,
        user_id: UserId,
        symbol: &Symbol,
        base_delta: Decimal,
        quote_delta: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError> {
        let base = self.base_asset(symbol);
        let quote = self.quote_asset(symbol);

        self.apply_delta(user_id, &base, base_delta, "SETTLEMENT_BASE", now)?;
        self.apply_delta(user_id, &quote, quote_delta, "SETTLEMENT_QUOTE", now)?;
        Ok(())
    }

    fn apply_delta(
        &self,
        user_id: UserId,
        asset: &str,
        delta: Decimal,
        reference: &str,
        now: i64,
    ) -> Result<(), ExchangeError> {
        if delta == Decimal::ZERO {
            return Ok(());
        }

        let amount = delta.abs();
        if delta > Decimal::ZERO {
            let unlocked = self.with_account(user_id, asset, now, |balance| {
                match balance.unlock(amount, now) {
                    Ok(()) => Ok(true),
                    Err(BalanceError::InsufficientLocked { .. }) => Ok(false),
                    Err(err) => Err(err.into()),
                }
            })?;
            if !unlocked {
                self.credit(user_id, asset, amount, LedgerEntryKind::Trade, reference, now)?;
            }
            debug!(user = %user_id, asset, %delta, unlocked, "settlement credit leg");
        } else {
            self.with_account(user_id, asset, now, |balance| {
                match balance.debit_locked(amount, now) {
                    Ok(()) => Ok(()),
                    Err(BalanceError::InsufficientLocked { .. }) => {
                        balance.debit_available(amount, now).map_err(ExchangeError::from)
                    }
                    Err(err) => Err(err.into()),
                }
            })?;
            self.repo.append_entry(LedgerEntry::new(
                user_id,
                asset,
                LedgerEntryKind::Trade,
                -amount,
                reference,
                now,
            ))?;
            debug!(user = %user_id, asset, %delta, "settlement debit leg");
        }
        Ok(())
    }
}

fn require_positive(amount: Decimal) -> Result<(), ExchangeError> {
    if amount <= Decimal::ZERO {
        return Err(BalanceError::NonPositiveAmount.into());
    }
    Ok(())
}
