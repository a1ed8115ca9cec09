//! Balance and ledger types

use crate::errors::BalanceError;
use crate::ids::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Funds held for one (user, asset) pair
///
/// Invariant: `available` and `locked` are both non-negative. Funds move
/// between the two buckets via lock/unlock; the combined total changes only
/// through credit/debit operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: UserId,
    pub asset: String,
    pub available: Decimal,
    pub locked: Decimal,
    pub updated_at: i64, // Unix nanos
}

impl Balance {
    /// Create an empty balance
    pub fn new(user_id: UserId, asset: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id,
            asset: asset.into(),
            available: Decimal::ZERO,
            locked: Decimal::ZERO,
            updated_at: timestamp,
        }
    }

    /// Check balance invariant: both buckets non-negative
    pub fn check_invariant(&self) -> bool {
        self.available >= Decimal::ZERO && self.locked >= Decimal::ZERO
    }

    /// Combined holdings (available + locked)
    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }

    /// Check whether `amount` can be locked
    pub fn can_lock(&self, amount: Decimal) -> bool {
        self.available >= amount
    }

    /// Move funds from available to locked
    pub fn lock(&mut self, amount: Decimal, timestamp: i64) -> Result<(), BalanceError> {
        if self.available < amount {
            return Err(BalanceError::InsufficientAvailable {
                asset: self.asset.clone(),
                requested: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        self.locked += amount;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Move funds from locked back to available
    pub fn unlock(&mut self, amount: Decimal, timestamp: i64) -> Result<(), BalanceError> {
        if self.locked < amount {
            return Err(BalanceError::InsufficientLocked {
                asset: self.asset.clone(),
                requested: amount,
                locked: self.locked,
            });
        }
        self.locked -= amount;
        self.available += amount;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Add funds to available
    pub fn credit(&mut self, amount: Decimal, timestamp: i64) {
        self.available += amount;
        self.updated_at = timestamp;
    }

    /// Remove funds from available
    pub fn debit_available(&mut self, amount: Decimal, timestamp: i64) -> Result<(), BalanceError> {
        if self.available < amount {
            return Err(BalanceError::InsufficientAvailable {
                asset: self.asset.clone(),
                requested: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Remove funds from locked (e.g. settlement spends locked collateral)
    pub fn debit_locked(&mut self, amount: Decimal, timestamp: i64) -> Result<(), BalanceError> {
        if self.locked < amount {
            return Err(BalanceError::InsufficientLocked {
                asset: self.asset.clone(),
                requested: amount,
                locked: self.locked,
            });
        }
        self.locked -= amount;
        self.updated_at = timestamp;
        Ok(())
    }
}

/// Ledger entry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    Deposit,
    Withdrawal,
    Trade,
    Fee,
    Adjustment,
}

/// Append-only record of every credit and debit
///
/// Amounts are signed: credits positive, debits negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub user_id: UserId,
    pub asset: String,
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub reference: String,
    pub created_at: i64, // Unix nanos
}

impl LedgerEntry {
    pub fn new(
        user_id: UserId,
        asset: impl Into<String>,
        kind: LedgerEntryKind,
        amount: Decimal,
        reference: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            user_id,
            asset: asset.into(),
            kind,
            amount,
            reference: reference.into(),
            created_at: timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn funded(amount: u64) -> Balance {
        let mut balance = Balance::new(UserId::new(), "AAPL_QUOTE", TS);
        balance.credit(Decimal::from(amount), TS);
        balance
    }

    #[test]
    fn test_balance_lock_unlock() {
        let mut balance = funded(1000);

        balance.lock(Decimal::from(300), TS).unwrap();
        assert_eq!(balance.available, Decimal::from(700));
        assert_eq!(balance.locked, Decimal::from(300));
        assert_eq!(balance.total(), Decimal::from(1000));

        balance.unlock(Decimal::from(100), TS).unwrap();
        assert_eq!(balance.available, Decimal::from(800));
        assert_eq!(balance.locked, Decimal::from(200));
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_lock_preserves_total() {
        let mut balance = funded(1000);
        balance.lock(Decimal::from(999), TS).unwrap();
        assert_eq!(balance.total(), Decimal::from(1000));
    }

    #[test]
    fn test_overlock_fails() {
        let mut balance = funded(100);
        let err = balance.lock(Decimal::from(150), TS).unwrap_err();
        assert!(matches!(err, BalanceError::InsufficientAvailable { .. }));
        // Untouched on failure
        assert_eq!(balance.available, Decimal::from(100));
        assert_eq!(balance.locked, Decimal::ZERO);
    }

    #[test]
    fn test_overunlock_fails() {
        let mut balance = funded(100);
        balance.lock(Decimal::from(40), TS).unwrap();
        let err = balance.unlock(Decimal::from(50), TS).unwrap_err();
        assert!(matches!(err, BalanceError::InsufficientLocked { .. }));
    }

    #[test]
    fn test_debit_locked() {
        let mut balance = funded(100);
        balance.lock(Decimal::from(60), TS).unwrap();
        balance.debit_locked(Decimal::from(60), TS).unwrap();

        assert_eq!(balance.locked, Decimal::ZERO);
        assert_eq!(balance.available, Decimal::from(40));
        assert_eq!(balance.total(), Decimal::from(40));
    }

    #[test]
    fn test_debit_available_insufficient() {
        let mut balance = funded(10);
        assert!(balance.debit_available(Decimal::from(20), TS).is_err());
    }

    #[test]
    fn test_ledger_entry_kinds_wire_tags() {
        assert_eq!(
            serde_json::to_string(&LedgerEntryKind::Deposit).unwrap(),
            "\"DEPOSIT\""
        );
        assert_eq!(
            serde_json::to_string(&LedgerEntryKind::Withdrawal).unwrap(),
            "\"WITHDRAWAL\""
        );
        assert_eq!(serde_json::to_string(&LedgerEntryKind::Trade).unwrap(), "\"TRADE\"");
    }
}
