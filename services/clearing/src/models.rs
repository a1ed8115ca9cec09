//! Clearing data model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{Symbol, UserId};
use uuid::Uuid;

/// Where settled funds ultimately move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementMode {
    OffChain,
    OnChain,
    Hybrid,
}

/// Lifecycle of clearing positions and batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Processing,
    Settled,
    Failed,
}

/// Clearing configuration
#[derive(Debug, Clone)]
pub struct ClearingConfig {
    pub mode: SettlementMode,
    /// Delay from trade time to settlement date, nanoseconds
    pub settlement_delay: i64,
}

impl Default for ClearingConfig {
    fn default() -> Self {
        Self {
            mode: SettlementMode::OffChain,
            // T+1
            settlement_delay: 24 * 3600 * 1_000_000_000,
        }
    }
}

/// Accumulated base/quote deltas for one (user, symbol, settlement date)
///
/// Upsert semantics: trades landing on the same key sum their deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingPosition {
    pub position_id: Uuid,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub settlement_date: i64, // Unix nanos
    pub base_delta: Decimal,
    pub quote_delta: Decimal,
    pub status: SettlementStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ClearingPosition {
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        settlement_date: i64,
        base_delta: Decimal,
        quote_delta: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            position_id: Uuid::now_v7(),
            user_id,
            symbol,
            settlement_date,
            base_delta,
            quote_delta,
            status: SettlementStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Sum further deltas into this position
    pub fn accumulate(&mut self, base_delta: Decimal, quote_delta: Decimal, timestamp: i64) {
        self.base_delta += base_delta;
        self.quote_delta += quote_delta;
        self.updated_at = timestamp;
    }
}

/// One settlement run over all due positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub batch_id: Uuid,
    pub settlement_date: i64,
    pub mode: SettlementMode,
    pub status: SettlementStatus,
    pub settled_count: u64,
    pub failed_count: u64,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl SettlementBatch {
    pub fn new(settlement_date: i64, mode: SettlementMode, timestamp: i64) -> Self {
        Self {
            batch_id: Uuid::now_v7(),
            settlement_date,
            mode,
            status: SettlementStatus::Processing,
            settled_count: 0,
            failed_count: 0,
            created_at: timestamp,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1_708_123_456_789_000_000;

    #[test]
    fn test_position_accumulate() {
        let mut position = ClearingPosition::new(
            UserId::new(),
            Symbol::new("AAPL"),
            TS + 1_000,
            Decimal::from(10),
            Decimal::from(-1000),
            TS,
        );

        position.accumulate(Decimal::from(5), Decimal::from(-450), TS + 1);
        assert_eq!(position.base_delta, Decimal::from(15));
        assert_eq!(position.quote_delta, Decimal::from(-1450));
        assert_eq!(position.status, SettlementStatus::Pending);
    }

    #[test]
    fn test_status_wire_tags() {
        assert_eq!(
            serde_json::to_string(&SettlementStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&SettlementMode::OffChain).unwrap(),
            "\"OFF_CHAIN\""
        );
    }

    #[test]
    fn test_default_config_is_t_plus_one() {
        let config = ClearingConfig::default();
        assert_eq!(config.settlement_delay, 86_400_000_000_000);
        assert_eq!(config.mode, SettlementMode::OffChain);
    }
}
