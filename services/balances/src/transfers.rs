//! Deposit and withdrawal lifecycles
//!
//! A deposit is created pending and credits available funds once confirmed.
//! A withdrawal locks funds on request and debits the lock on completion,
//! so in-flight withdrawals can never be double-spent by trading.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use types::balance::LedgerEntryKind;
use types::errors::{BalanceError, ExchangeError};
use types::ids::UserId;
use uuid::Uuid;

use crate::ledger::BalanceLedger;

/// Deposit lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Pending,
    Confirmed,
    Canceled,
}

/// An external credit awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub deposit_id: Uuid,
    pub user_id: UserId,
    pub asset: String,
    pub amount: Decimal,
    pub status: DepositStatus,
    pub tx_hash: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Withdrawal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Requested,
    Processing,
    Completed,
    Rejected,
}

/// An outbound transfer holding a lock until completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub withdrawal_id: Uuid,
    pub user_id: UserId,
    pub asset: String,
    pub amount: Decimal,
    pub address: String,
    pub status: WithdrawalStatus,
    pub tx_hash: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Persistence seam for transfers
pub trait TransferRepository: Send + Sync {
    fn save_deposit(&self, deposit: Deposit) -> Result<(), ExchangeError>;
    fn update_deposit(&self, deposit: Deposit) -> Result<(), ExchangeError>;
    fn find_deposit(&self, deposit_id: Uuid) -> Result<Option<Deposit>, ExchangeError>;

    fn save_withdrawal(&self, withdrawal: Withdrawal) -> Result<(), ExchangeError>;
    fn update_withdrawal(&self, withdrawal: Withdrawal) -> Result<(), ExchangeError>;
    fn find_withdrawal(&self, withdrawal_id: Uuid) -> Result<Option<Withdrawal>, ExchangeError>;
}

/// DashMap-backed transfer repository
#[derive(Default)]
pub struct InMemoryTransferRepository {
    deposits: DashMap<Uuid, Deposit>,
    withdrawals: DashMap<Uuid, Withdrawal>,
}

impl InMemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferRepository for InMemoryTransferRepository {
    fn save_deposit(&self, deposit: Deposit) -> Result<(), ExchangeError> {
        self.deposits.insert(deposit.deposit_id, deposit);
        Ok(())
    }

    fn update_deposit(&self, deposit: Deposit) -> Result<(), ExchangeError> {
        self.deposits.insert(deposit.deposit_id, deposit);
        Ok(())
    }

    fn find_deposit(&self, deposit_id: Uuid) -> Result<Option<Deposit>, ExchangeError> {
        Ok(self.deposits.get(&deposit_id).map(|entry| entry.clone()))
    }

    fn save_withdrawal(&self, withdrawal: Withdrawal) -> Result<(), ExchangeError> {
        self.withdrawals.insert(withdrawal.withdrawal_id, withdrawal);
        Ok(())
    }

    fn update_withdrawal(&self, withdrawal: Withdrawal) -> Result<(), ExchangeError> {
        self.withdrawals.insert(withdrawal.withdrawal_id, withdrawal);
        Ok(())
    }

    fn find_withdrawal(&self, withdrawal_id: Uuid) -> Result<Option<Withdrawal>, ExchangeError> {
        Ok(self.withdrawals.get(&withdrawal_id).map(|entry| entry.clone()))
    }
}

/// Deposit/withdrawal workflows on top of the balance ledger
pub struct TransferDesk {
    ledger: Arc<BalanceLedger>,
    repo: Arc<dyn TransferRepository>,
}

impl TransferDesk {
    pub fn new(ledger: Arc<BalanceLedger>, repo: Arc<dyn TransferRepository>) -> Self {
        Self { ledger, repo }
    }

    /// Create a pending deposit
    pub fn create_deposit(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        now: i64,
    ) -> Result<Deposit, ExchangeError> {
        if amount <= Decimal::ZERO {
            return Err(BalanceError::NonPositiveAmount.into());
        }
        let deposit = Deposit {
            deposit_id: Uuid::now_v7(),
            user_id,
            asset: asset.to_string(),
            amount,
            status: DepositStatus::Pending,
            tx_hash: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.save_deposit(deposit.clone())?;
        Ok(deposit)
    }

    /// Confirm a pending deposit, crediting available funds
    pub fn confirm_deposit(
        &self,
        deposit_id: Uuid,
        tx_hash: Option<String>,
        now: i64,
    ) -> Result<Deposit, ExchangeError> {
        let mut deposit = self
            .repo
            .find_deposit(deposit_id)?
            .ok_or(BalanceError::DepositNotFound {
                deposit_id: deposit_id.to_string(),
            })?;
        if deposit.status != DepositStatus::Pending {
            return Err(BalanceError::DepositNotPending {
                deposit_id: deposit_id.to_string(),
            }
            .into());
        }

        self.ledger.credit(
            deposit.user_id,
            &deposit.asset,
            deposit.amount,
            LedgerEntryKind::Deposit,
            &deposit.deposit_id.to_string(),
            now,
        )?;

        deposit.status = DepositStatus::Confirmed;
        deposit.tx_hash = tx_hash;
        deposit.updated_at = now;
        self.repo.update_deposit(deposit.clone())?;
        info!(deposit = %deposit.deposit_id, asset = %deposit.asset, "deposit confirmed");
        Ok(deposit)
    }

    /// Request a withdrawal, locking the funds immediately
    pub fn request_withdrawal(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
        address: &str,
        now: i64,
    ) -> Result<Withdrawal, ExchangeError> {
        if amount <= Decimal::ZERO {
            return Err(BalanceError::NonPositiveAmount.into());
        }
        self.ledger.lock(user_id, asset, amount, now)?;

        let withdrawal = Withdrawal {
            withdrawal_id: Uuid::now_v7(),
            user_id,
            asset: asset.to_string(),
            amount,
            address: address.to_string(),
            status: WithdrawalStatus::Requested,
            tx_hash: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.save_withdrawal(withdrawal.clone())?;
        Ok(withdrawal)
    }

    /// Complete a withdrawal, spending the locked funds
    pub fn complete_withdrawal(
        &self,
        withdrawal_id: Uuid,
        tx_hash: Option<String>,
        now: i64,
    ) -> Result<Withdrawal, ExchangeError> {
        let mut withdrawal =
            self.repo
                .find_withdrawal(withdrawal_id)?
                .ok_or(BalanceError::WithdrawalNotFound {
                    withdrawal_id: withdrawal_id.to_string(),
                })?;
        if withdrawal.status != WithdrawalStatus::Requested
            && withdrawal.status != WithdrawalStatus::Processing
        {
            return Err(BalanceError::WithdrawalNotCompletable {
                withdrawal_id: withdrawal_id.to_string(),
            }
            .into());
        }

        self.ledger.spend_locked(
            withdrawal.user_id,
            &withdrawal.asset,
            withdrawal.amount,
            LedgerEntryKind::Withdrawal,
            &withdrawal.withdrawal_id.to_string(),
            now,
        )?;

        withdrawal.status = WithdrawalStatus::Completed;
        withdrawal.tx_hash = tx_hash;
        withdrawal.updated_at = now;
        self.repo.update_withdrawal(withdrawal.clone())?;
        info!(withdrawal = %withdrawal.withdrawal_id, asset = %withdrawal.asset, "withdrawal completed");
        Ok(withdrawal)
    }
}
