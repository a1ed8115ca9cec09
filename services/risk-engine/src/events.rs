//! Risk events and collaborator seams

use serde::{Deserialize, Serialize};
use types::ids::{Symbol, UserId};

/// Classification of a logged risk event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskEventKind {
    PriceBand,
    MaxNotional,
    MarginPreTrade,
    MarginCall,
}

/// A rejection or margin event, logged and forwarded to the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub user_id: UserId,
    pub symbol: Option<Symbol>,
    pub kind: RiskEventKind,
    pub message: String,
    pub occurred_at: i64, // Unix nanos
}

/// Per-symbol trading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Open,
    Halted,
}

/// Outbound notification seam
///
/// Failures are the notifier's problem; callers log and continue.
pub trait RiskNotifier: Send + Sync {
    fn notify_risk_event(&self, event: &RiskEvent);
    fn notify_market_halt(&self, symbol: &Symbol, reason: &str);
    fn notify_market_resume(&self, symbol: &Symbol);
}

/// Notifier that only emits tracing output
#[derive(Debug, Default)]
pub struct LogNotifier;

impl RiskNotifier for LogNotifier {
    fn notify_risk_event(&self, event: &RiskEvent) {
        tracing::warn!(
            user = %event.user_id,
            kind = ?event.kind,
            message = %event.message,
            "risk event"
        );
    }

    fn notify_market_halt(&self, symbol: &Symbol, reason: &str) {
        tracing::warn!(symbol = %symbol, reason, "market halted");
    }

    fn notify_market_resume(&self, symbol: &Symbol) {
        tracing::info!(symbol = %symbol, "market resumed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_tags() {
        assert_eq!(
            serde_json::to_string(&RiskEventKind::PriceBand).unwrap(),
            "\"PRICE_BAND\""
        );
        assert_eq!(
            serde_json::to_string(&RiskEventKind::MarginCall).unwrap(),
            "\"MARGIN_CALL\""
        );
    }

    #[test]
    fn test_market_status_wire_tags() {
        assert_eq!(serde_json::to_string(&MarketStatus::Open).unwrap(), "\"OPEN\"");
        assert_eq!(
            serde_json::to_string(&MarketStatus::Halted).unwrap(),
            "\"HALTED\""
        );
    }
}
