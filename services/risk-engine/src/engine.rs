//! Risk engine orchestrator
//!
//! Sequences the pre-trade checks, applies fills to positions, and
//! recomputes margin equity after every trade.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};
use types::errors::{ExchangeError, RiskError};
use types::ids::{Symbol, UserId};
use types::numeric::Price;
use types::order::{Order, Side};
use types::position::{MarginAccount, MarginHealth, Position};
use types::trade::Trade;

use crate::config::RiskConfig;
use crate::events::{RiskEvent, RiskEventKind, RiskNotifier};
use crate::repository::{MarginRepository, PositionRepository, RiskEventRepository};
use crate::validator;

/// Source of last trade prices, served by the market-data engine
pub trait PriceFeed: Send + Sync {
    fn last_price(&self, symbol: &Symbol) -> Option<Price>;
}

/// Pre-trade validation and post-trade position/margin accounting
pub struct RiskEngine {
    config: RiskConfig,
    positions: Arc<dyn PositionRepository>,
    margins: Arc<dyn MarginRepository>,
    price_feed: Arc<dyn PriceFeed>,
    risk_events: Arc<dyn RiskEventRepository>,
    notifier: Arc<dyn RiskNotifier>,
}

impl RiskEngine {
    pub fn new(
        config: RiskConfig,
        positions: Arc<dyn PositionRepository>,
        margins: Arc<dyn MarginRepository>,
        price_feed: Arc<dyn PriceFeed>,
        risk_events: Arc<dyn RiskEventRepository>,
        notifier: Arc<dyn RiskNotifier>,
    ) -> Self {
        Self {
            config,
            positions,
            margins,
            price_feed,
            risk_events,
            notifier,
        }
    }

    /// Validate an incoming order, failing on the first rejected check
    ///
    /// Every rejection is appended to the risk event log and forwarded to
    /// the notifier before being returned to the caller.
    pub fn validate_new_order(
        &self,
        user_id: UserId,
        order: &Order,
        now: i64,
    ) -> Result<(), ExchangeError> {
        let last_price = self.price_feed.last_price(&order.symbol);

        if let Err(err) = validator::check_price_band(
            order,
            last_price,
            self.config.max_price_deviation_percent,
        ) {
            self.log_and_notify(user_id, Some(&order.symbol), RiskEventKind::PriceBand, &err, now);
            return Err(err.into());
        }

        if let Err(err) =
            validator::check_max_notional(order, last_price, self.config.max_notional_per_order)
        {
            self.log_and_notify(user_id, Some(&order.symbol), RiskEventKind::MaxNotional, &err, now);
            return Err(err.into());
        }

        let account = self.ensure_margin_account(user_id, now)?;
        let notional = validator::reference_price(order, last_price)
            .map(|p| p.as_decimal() * order.quantity.as_decimal())
            .unwrap_or(Decimal::ZERO);
        if let Err(err) = validator::check_margin(
            &account,
            notional,
            self.config.max_leverage,
            self.config.maintenance_margin_req,
        ) {
            self.log_and_notify(
                user_id,
                Some(&order.symbol),
                RiskEventKind::MarginPreTrade,
                &err,
                now,
            );
            return Err(err.into());
        }

        Ok(())
    }

    /// Apply a trade to both parties' positions and recompute their margin
    pub fn on_trade(
        &self,
        trade: &Trade,
        buy_user: UserId,
        sell_user: UserId,
        now: i64,
    ) -> Result<(), ExchangeError> {
        self.apply_trade_to_position(buy_user, trade, Side::BUY, now)?;
        self.apply_trade_to_position(sell_user, trade, Side::SELL, now)?;

        let margin_delta = trade.trade_value() / self.config.max_leverage;
        self.recalc_margin(buy_user, margin_delta, now)?;
        self.recalc_margin(sell_user, margin_delta, now)?;
        Ok(())
    }

    /// Current margin account for a user, if one exists
    pub fn margin_account(&self, user_id: UserId) -> Option<MarginAccount> {
        self.margins.get(user_id).ok().flatten()
    }

    /// Current position for (user, symbol), if one exists
    pub fn position(&self, user_id: UserId, symbol: &Symbol) -> Option<Position> {
        self.positions.get(user_id, symbol).ok().flatten()
    }

    fn ensure_margin_account(
        &self,
        user_id: UserId,
        now: i64,
    ) -> Result<MarginAccount, ExchangeError> {
        if let Some(account) = self.margins.get(user_id)? {
            return Ok(account);
        }
        let account = MarginAccount::new(user_id, now);
        self.margins.upsert(account.clone())?;
        Ok(account)
    }

    fn apply_trade_to_position(
        &self,
        user_id: UserId,
        trade: &Trade,
        side: Side,
        now: i64,
    ) -> Result<(), ExchangeError> {
        let mut position = match self.positions.get(user_id, &trade.symbol)? {
            Some(position) => position,
            None => Position::new(user_id, trade.symbol.clone(), now),
        };

        match side {
            Side::BUY => position.apply_buy(
                trade.quantity.as_decimal(),
                trade.price.as_decimal(),
                now,
            ),
            Side::SELL => position.apply_sell(trade.quantity.as_decimal(), now),
        }

        debug!(
            user = %user_id,
            symbol = %trade.symbol,
            quantity = %position.quantity,
            avg_price = %position.avg_price,
            "position updated"
        );
        self.positions.upsert(position)
    }

    /// Recompute margin equity as the sum of open-position unrealized P&L
    /// at current marks, accumulate the trade's margin consumption, and
    /// fire a margin call when equity falls below the requirement.
    fn recalc_margin(
        &self,
        user_id: UserId,
        margin_delta: Decimal,
        now: i64,
    ) -> Result<(), ExchangeError> {
        let mut account = self.ensure_margin_account(user_id, now)?;
        account.used_margin += margin_delta;

        let mut equity = Decimal::ZERO;
        for position in self.positions.list_for_user(user_id)? {
            if position.is_flat() {
                continue;
            }
            let mark = match self.price_feed.last_price(&position.symbol) {
                Some(mark) if !mark.is_zero() => mark,
                _ => continue,
            };
            equity += position.unrealized_pnl(mark);
        }
        account.equity = equity;

        if account.used_margin > Decimal::ZERO {
            account.maintenance_req = account.used_margin * self.config.maintenance_margin_req;
            if account.is_under_maintenance() {
                account.health = MarginHealth::MarginCall;
                let err = RiskError::InsufficientMargin {
                    required_equity: account.maintenance_req,
                    equity: account.equity,
                };
                self.log_and_notify(user_id, None, RiskEventKind::MarginCall, &err, now);
            } else {
                account.health = MarginHealth::Healthy;
            }
        }

        account.updated_at = now;
        self.margins.upsert(account)
    }

    fn log_and_notify(
        &self,
        user_id: UserId,
        symbol: Option<&Symbol>,
        kind: RiskEventKind,
        err: &RiskError,
        now: i64,
    ) {
        let event = RiskEvent {
            user_id,
            symbol: symbol.cloned(),
            kind,
            message: err.to_string(),
            occurred_at: now,
        };
        if let Err(log_err) = self.risk_events.append(event.clone()) {
            warn!(error = %log_err, "failed to append risk event");
        }
        self.notifier.notify_risk_event(&event);
    }
}
