//! Clearing persistence seam

use dashmap::DashMap;
use types::errors::ExchangeError;
use types::ids::{Symbol, UserId};
use uuid::Uuid;

use crate::models::{ClearingPosition, SettlementBatch, SettlementStatus};

/// Storage for clearing positions and settlement batches
pub trait ClearingRepository: Send + Sync {
    fn find_position(
        &self,
        user_id: UserId,
        symbol: &Symbol,
        settlement_date: i64,
    ) -> Result<Option<ClearingPosition>, ExchangeError>;

    fn save_position(&self, position: ClearingPosition) -> Result<(), ExchangeError>;

    fn update_position(&self, position: ClearingPosition) -> Result<(), ExchangeError>;

    /// Pending positions with settlement_date <= `now`
    fn list_due(&self, now: i64) -> Result<Vec<ClearingPosition>, ExchangeError>;

    fn save_batch(&self, batch: SettlementBatch) -> Result<(), ExchangeError>;

    fn update_batch(&self, batch: SettlementBatch) -> Result<(), ExchangeError>;
}

/// DashMap-backed clearing repository
#[derive(Default)]
pub struct InMemoryClearingRepository {
    positions: DashMap<(UserId, Symbol, i64), ClearingPosition>,
    batches: DashMap<Uuid, SettlementBatch>,
}

impl InMemoryClearingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored batches (test inspection)
    pub fn batches(&self) -> Vec<SettlementBatch> {
        self.batches.iter().map(|entry| entry.clone()).collect()
    }
}

impl ClearingRepository for InMemoryClearingRepository {
    fn find_position(
        &self,
        user_id: UserId,
        symbol: &Symbol,
        settlement_date: i64,
    ) -> Result<Option<ClearingPosition>, ExchangeError> {
        Ok(self
            .positions
            .get(&(user_id, symbol.clone(), settlement_date))
            .map(|entry| entry.clone()))
    }

    fn save_position(&self, position: ClearingPosition) -> Result<(), ExchangeError> {
        self.positions.insert(
            (
                position.user_id,
                position.symbol.clone(),
                position.settlement_date,
            ),
            position,
        );
        Ok(())
    }

    fn update_position(&self, position: ClearingPosition) -> Result<(), ExchangeError> {
        self.save_position(position)
    }

    fn list_due(&self, now: i64) -> Result<Vec<ClearingPosition>, ExchangeError> {
        let mut due: Vec<ClearingPosition> = self
            .positions
            .iter()
            .filter(|entry| {
                entry.status == SettlementStatus::Pending && entry.settlement_date <= now
            })
            .map(|entry| entry.clone())
            .collect();
        due.sort_by_key(|position| position.settlement_date);
        Ok(due)
    }

    fn save_batch(&self, batch: SettlementBatch) -> Result<(), ExchangeError> {
        self.batches.insert(batch.batch_id, batch);
        Ok(())
    }

    fn update_batch(&self, batch: SettlementBatch) -> Result<(), ExchangeError> {
        self.batches.insert(batch.batch_id, batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn position(settlement_date: i64) -> ClearingPosition {
        ClearingPosition::new(
            UserId::new(),
            Symbol::new("AAPL"),
            settlement_date,
            Decimal::from(1),
            Decimal::from(-100),
            TS,
        )
    }

    #[test]
    fn test_find_by_key() {
        let repo = InMemoryClearingRepository::new();
        let pos = position(TS + 100);
        let user = pos.user_id;
        repo.save_position(pos).unwrap();

        assert!(repo
            .find_position(user, &Symbol::new("AAPL"), TS + 100)
            .unwrap()
            .is_some());
        assert!(repo
            .find_position(user, &Symbol::new("AAPL"), TS + 101)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_due_filters_and_sorts() {
        let repo = InMemoryClearingRepository::new();
        repo.save_position(position(TS + 300)).unwrap();
        repo.save_position(position(TS + 100)).unwrap();
        repo.save_position(position(TS + 900)).unwrap();

        let mut settled = position(TS + 50);
        settled.status = SettlementStatus::Settled;
        repo.save_position(settled).unwrap();

        let due = repo.list_due(TS + 300).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].settlement_date, TS + 100);
        assert_eq!(due[1].settlement_date, TS + 300);
    }
}
