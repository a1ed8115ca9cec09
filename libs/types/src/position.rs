//! Position and margin account types

use crate::ids::{Symbol, UserId};
use crate::numeric::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Net position for one (user, symbol) pair
///
/// Quantity is signed: positive long, negative short. The entry price is a
/// volume-weighted average that re-weights on size-increasing buys, is
/// preserved on reductions, and resets to zero when the position goes flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub avg_price: Decimal,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Position {
    /// Create a new flat position
    pub fn new(user_id: UserId, symbol: Symbol, timestamp: i64) -> Self {
        Self {
            position_id: Uuid::now_v7(),
            user_id,
            symbol,
            quantity: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Check whether the position is flat
    pub fn is_flat(&self) -> bool {
        self.quantity == Decimal::ZERO
    }

    /// Apply a buy fill: re-weight the average entry price
    pub fn apply_buy(&mut self, quantity: Decimal, price: Decimal, timestamp: i64) {
        let total_cost = self.avg_price * self.quantity + price * quantity;
        let new_quantity = self.quantity + quantity;
        if new_quantity != Decimal::ZERO {
            self.avg_price = total_cost / new_quantity;
        } else {
            self.avg_price = Decimal::ZERO;
        }
        self.quantity = new_quantity;
        self.updated_at = timestamp;
    }

    /// Apply a sell fill: reduce quantity, preserving the entry price
    /// until the position returns to flat
    pub fn apply_sell(&mut self, quantity: Decimal, timestamp: i64) {
        self.quantity -= quantity;
        if self.quantity == Decimal::ZERO {
            self.avg_price = Decimal::ZERO;
        }
        self.updated_at = timestamp;
    }

    /// Unrealized profit at the given mark price
    pub fn unrealized_pnl(&self, mark: Price) -> Decimal {
        (mark.as_decimal() - self.avg_price) * self.quantity
    }
}

/// Margin account health state
///
/// Transitions are driven by post-trade recomputation: an account in margin
/// call recovers to healthy when equity climbs back above the requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginHealth {
    Healthy,
    MarginCall,
    Liquidatable,
}

/// Margin state for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginAccount {
    pub user_id: UserId,
    /// Sum of open-position unrealized P&L at mark prices
    pub equity: Decimal,
    /// Accumulated notional / max-leverage across fills
    pub used_margin: Decimal,
    /// used_margin × maintenance ratio, recomputed post-trade
    pub maintenance_req: Decimal,
    pub health: MarginHealth,
    pub updated_at: i64, // Unix nanos
}

impl MarginAccount {
    /// Create a fresh account with no exposure
    pub fn new(user_id: UserId, timestamp: i64) -> Self {
        Self {
            user_id,
            equity: Decimal::ZERO,
            used_margin: Decimal::ZERO,
            maintenance_req: Decimal::ZERO,
            health: MarginHealth::Healthy,
            updated_at: timestamp,
        }
    }

    /// A margin call fires when equity drops below the maintenance
    /// requirement on a margined account
    pub fn is_under_maintenance(&self) -> bool {
        self.used_margin > Decimal::ZERO && self.equity < self.maintenance_req
    }
}
