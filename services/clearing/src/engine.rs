//! Clearing engine
//!
//! Per-trade delta accumulation and the batch settlement drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use balances::BalanceLedger;
use rust_decimal::Decimal;
use tracing::{info, warn};
use types::errors::{ClearingError, ExchangeError};
use types::ids::{Symbol, UserId};
use types::trade::Trade;

use crate::models::{ClearingConfig, ClearingPosition, SettlementBatch, SettlementMode, SettlementStatus};
use crate::repository::ClearingRepository;

/// Terminal transfer of settled deltas into user balances
pub trait Custody: Send + Sync {
    fn apply_settlement(
        &self,
        user_id: UserId,
        symbol: &Symbol,
        base_delta: Decimal,
        quote_delta: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError>;
}

impl Custody for BalanceLedger {
    fn apply_settlement(
        &self,
        user_id: UserId,
        symbol: &Symbol,
        base_delta: Decimal,
        quote_delta: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError> {
        BalanceLedger::apply_settlement(self, user_id, symbol, base_delta, quote_delta, now)
    }
}

/// Optional on-chain leg for OnChain/Hybrid settlement modes
pub trait SettlementBridge: Send + Sync {
    fn transfer(
        &self,
        user_id: UserId,
        asset: &str,
        amount: Decimal,
    ) -> Result<(), ExchangeError>;
}

/// Cooperative cancellation for the settlement drain
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Accumulates trade deltas and drains them at settlement time
pub struct ClearingEngine {
    config: ClearingConfig,
    repo: Arc<dyn ClearingRepository>,
    custody: Arc<dyn Custody>,
    bridge: Option<Arc<dyn SettlementBridge>>,
}

impl ClearingEngine {
    pub fn new(
        config: ClearingConfig,
        repo: Arc<dyn ClearingRepository>,
        custody: Arc<dyn Custody>,
        bridge: Option<Arc<dyn SettlementBridge>>,
    ) -> Self {
        Self {
            config,
            repo,
            custody,
            bridge,
        }
    }

    /// Accumulate a matched trade into both parties' clearing positions
    ///
    /// The buyer gains base and owes quote; the seller the opposite.
    pub fn on_trade(
        &self,
        trade: &Trade,
        buy_user: UserId,
        sell_user: UserId,
        now: i64,
    ) -> Result<(), ExchangeError> {
        let settlement_date = trade.executed_at + self.config.settlement_delay;
        let base_qty = trade.quantity.as_decimal();
        let quote_qty = trade.trade_value();

        self.add_to_position(buy_user, &trade.symbol, settlement_date, base_qty, -quote_qty, now)?;
        self.add_to_position(sell_user, &trade.symbol, settlement_date, -base_qty, quote_qty, now)?;
        Ok(())
    }

    fn add_to_position(
        &self,
        user_id: UserId,
        symbol: &Symbol,
        settlement_date: i64,
        base_delta: Decimal,
        quote_delta: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError> {
        match self.repo.find_position(user_id, symbol, settlement_date)? {
            Some(mut position) => {
                position.accumulate(base_delta, quote_delta, now);
                self.repo.update_position(position)
            }
            None => self.repo.save_position(ClearingPosition::new(
                user_id,
                symbol.clone(),
                settlement_date,
                base_delta,
                quote_delta,
                now,
            )),
        }
    }

    /// Drain all positions due at `now` into a settlement batch
    ///
    /// Each position settles independently: a custody failure marks that
    /// position failed and the drain continues. The cancellation flag is
    /// checked between positions. Returns the completed batch, or None when
    /// nothing was due.
    pub fn run_settlement(
        &self,
        now: i64,
        cancel: &CancelFlag,
    ) -> Result<Option<SettlementBatch>, ExchangeError> {
        let due = self.repo.list_due(now)?;
        if due.is_empty() {
            return Ok(None);
        }

        let mut batch = SettlementBatch::new(now, self.config.mode, now);
        self.repo.save_batch(batch.clone())?;
        info!(batch = %batch.batch_id, positions = due.len(), "settlement started");

        for mut position in due {
            if cancel.is_cancelled() {
                warn!(batch = %batch.batch_id, "settlement cancelled");
                return Err(ClearingError::Cancelled.into());
            }

            match self.settle_position(&position, now) {
                Ok(()) => {
                    position.status = SettlementStatus::Settled;
                    batch.settled_count += 1;
                }
                Err(err) => {
                    warn!(
                        position = %position.position_id,
                        user = %position.user_id,
                        error = %err,
                        "settlement failed for position"
                    );
                    position.status = SettlementStatus::Failed;
                    batch.failed_count += 1;
                }
            }
            position.updated_at = now;
            self.repo.update_position(position)?;
        }

        batch.status = SettlementStatus::Settled;
        batch.completed_at = Some(now);
        self.repo.update_batch(batch.clone())?;
        info!(
            batch = %batch.batch_id,
            settled = batch.settled_count,
            failed = batch.failed_count,
            "settlement completed"
        );
        Ok(Some(batch))
    }

    fn settle_position(&self, position: &ClearingPosition, now: i64) -> Result<(), ExchangeError> {
        self.custody.apply_settlement(
            position.user_id,
            &position.symbol,
            position.base_delta,
            position.quote_delta,
            now,
        )?;

        if self.config.mode != SettlementMode::OffChain {
            if let Some(bridge) = &self.bridge {
                if position.base_delta != Decimal::ZERO {
                    bridge.transfer(
                        position.user_id,
                        position.symbol.as_str(),
                        position.base_delta,
                    )?;
                }
                if position.quote_delta != Decimal::ZERO {
                    let quote_asset = format!("{}_QUOTE", position.symbol.as_str());
                    bridge.transfer(position.user_id, &quote_asset, position.quote_delta)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balances::{AssetCatalog, InMemoryBalanceRepository};
    use crate::repository::InMemoryClearingRepository;
    use types::balance::LedgerEntryKind;
    use types::ids::OrderId;
    use types::numeric::{Price, Quantity};

    const TS: i64 = 1_708_123_456_789_000_000;
    const DAY: i64 = 24 * 3600 * 1_000_000_000;

    struct Harness {
        engine: ClearingEngine,
        repo: Arc<InMemoryClearingRepository>,
        ledger: Arc<BalanceLedger>,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(BalanceLedger::new(
            Arc::new(InMemoryBalanceRepository::new()),
            AssetCatalog::new(),
        ));
        let repo = Arc::new(InMemoryClearingRepository::new());
        let engine = ClearingEngine::new(
            ClearingConfig::default(),
            repo.clone(),
            ledger.clone(),
            None,
        );
        Harness { engine, repo, ledger }
    }

    fn trade(price: u64, qty: u64) -> Trade {
        Trade::new(
            Symbol::new("AAPL"),
            OrderId::new(),
            OrderId::new(),
            Price::from_u64(price),
            Quantity::from_u64(qty),
            TS,
        )
    }

    fn fund_and_lock(ledger: &BalanceLedger, user: UserId, asset: &str, amount: u64) {
        ledger
            .credit(
                user,
                asset,
                Decimal::from(amount),
                LedgerEntryKind::Deposit,
                "test-funding",
                TS,
            )
            .unwrap();
        ledger.lock(user, asset, Decimal::from(amount), TS).unwrap();
    }

    #[test]
    fn test_on_trade_accumulates_deltas() {
        let h = harness();
        let buyer = UserId::new();
        let seller = UserId::new();

        h.engine.on_trade(&trade(100, 10), buyer, seller, TS).unwrap();
        h.engine.on_trade(&trade(100, 5), buyer, seller, TS).unwrap();

        let settlement_date = TS + DAY;
        let buy_pos = h
            .repo
            .find_position(buyer, &Symbol::new("AAPL"), settlement_date)
            .unwrap()
            .unwrap();
        assert_eq!(buy_pos.base_delta, Decimal::from(15));
        assert_eq!(buy_pos.quote_delta, Decimal::from(-1500));

        let sell_pos = h
            .repo
            .find_position(seller, &Symbol::new("AAPL"), settlement_date)
            .unwrap()
            .unwrap();
        assert_eq!(sell_pos.base_delta, Decimal::from(-15));
        assert_eq!(sell_pos.quote_delta, Decimal::from(1500));
    }

    #[test]
    fn test_settlement_moves_funds() {
        let h = harness();
        let buyer = UserId::new();
        let seller = UserId::new();

        fund_and_lock(&h.ledger, buyer, "AAPL_QUOTE", 1000);
        fund_and_lock(&h.ledger, seller, "AAPL", 10);

        h.engine.on_trade(&trade(100, 10), buyer, seller, TS).unwrap();

        let batch = h
            .engine
            .run_settlement(TS + DAY, &CancelFlag::new())
            .unwrap()
            .unwrap();
        assert_eq!(batch.status, SettlementStatus::Settled);
        assert_eq!(batch.settled_count, 2);
        assert_eq!(batch.failed_count, 0);

        assert_eq!(
            h.ledger.balance(buyer, "AAPL").unwrap().available,
            Decimal::from(10)
        );
        assert_eq!(
            h.ledger.balance(seller, "AAPL_QUOTE").unwrap().available,
            Decimal::from(1000)
        );
    }

    #[test]
    fn test_nothing_due_returns_none() {
        let h = harness();
        let buyer = UserId::new();
        let seller = UserId::new();

        h.engine.on_trade(&trade(100, 1), buyer, seller, TS).unwrap();

        // Settlement date not reached yet
        assert!(h
            .engine
            .run_settlement(TS + DAY - 1, &CancelFlag::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_failed_position_does_not_stop_batch() {
        let h = harness();
        let funded_buyer = UserId::new();
        let broke_seller = UserId::new();

        // Seller has no base to deliver: their leg fails, buyer's settles
        fund_and_lock(&h.ledger, funded_buyer, "AAPL_QUOTE", 1000);
        h.engine
            .on_trade(&trade(100, 10), funded_buyer, broke_seller, TS)
            .unwrap();

        let batch = h
            .engine
            .run_settlement(TS + DAY, &CancelFlag::new())
            .unwrap()
            .unwrap();
        assert_eq!(batch.settled_count, 1);
        assert_eq!(batch.failed_count, 1);
        assert_eq!(batch.status, SettlementStatus::Settled);
    }

    #[test]
    fn test_cancellation_aborts_cleanly() {
        let h = harness();
        let buyer = UserId::new();
        let seller = UserId::new();

        h.engine.on_trade(&trade(100, 1), buyer, seller, TS).unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = h.engine.run_settlement(TS + DAY, &cancel).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Clearing(ClearingError::Cancelled)
        ));
    }
}
