//! Matching engine orchestrator
//!
//! Owns the per-symbol books and drives the full admission pipeline:
//! input validation, halt check, risk validation, balance locking,
//! persistence, matching, and the post-fill fan-out into clearing, risk,
//! the circuit breaker, market data, and the event bus.
//!
//! Matching for one symbol runs entirely under that book's mutex; fills
//! are collected into a local buffer and all side-effects are emitted
//! after the lock is released, so no I/O ever happens inside the critical
//! section and distinct symbols match in parallel.

use std::sync::Arc;

use balances::BalanceLedger;
use clearing::ClearingEngine;
use dashmap::DashMap;
use market_data::MarketDataEngine;
use parking_lot::Mutex;
use risk_engine::{CircuitBreaker, RiskEngine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::{ExchangeError, OrderError, RiskError};
use types::ids::{OrderId, Symbol, UserId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side};

use crate::book::OrderBook;
use crate::bus::EventBus;
use crate::matching::{crossing, executor};
use crate::repository::OrderRepository;

/// Depth of the snapshot published after each admission
const SNAPSHOT_DEPTH: usize = 50;

/// Client request to place an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; `Price::zero()` for market orders
    pub price: Price,
    pub stop_price: Option<Price>,
    pub quantity: Quantity,
}

/// A parked stop order together with the funds locked at admission
#[derive(Debug, Clone)]
struct StopOrder {
    order: Order,
    locked_asset: String,
    locked_amount: Decimal,
}

/// One fill plus the resolved parties
struct FillRecord {
    fill: executor::Fill,
    buyer: UserId,
    seller: UserId,
}

/// The trading-pipeline orchestrator
pub struct MatchingEngine {
    books: DashMap<Symbol, Arc<Mutex<OrderBook>>>,
    stop_orders: Mutex<Vec<StopOrder>>,

    repo: Arc<dyn OrderRepository>,
    balances: Arc<BalanceLedger>,
    risk: Arc<RiskEngine>,
    breaker: Arc<CircuitBreaker>,
    clearing: Arc<ClearingEngine>,
    market_data: Arc<MarketDataEngine>,
    events: Arc<dyn EventBus>,
}

impl MatchingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        balances: Arc<BalanceLedger>,
        risk: Arc<RiskEngine>,
        breaker: Arc<CircuitBreaker>,
        clearing: Arc<ClearingEngine>,
        market_data: Arc<MarketDataEngine>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            books: DashMap::new(),
            stop_orders: Mutex::new(Vec::new()),
            repo,
            balances,
            risk,
            breaker,
            clearing,
            market_data,
            events,
        }
    }

    /// Admission pipeline entry point
    ///
    /// Fails on the first error and releases any partial locks. Stop
    /// orders park in the stop set without matching; everything else runs
    /// through the match loop and a fresh depth-50 snapshot is published.
    pub fn place_order(&self, req: NewOrderRequest, now: i64) -> Result<Order, ExchangeError> {
        if req.quantity.is_zero() {
            return Err(OrderError::InvalidQuantity.into());
        }
        if req.order_type == OrderType::LIMIT && req.price.is_zero() {
            return Err(OrderError::MissingLimitPrice.into());
        }
        if req.order_type == OrderType::STOP && req.stop_price.is_none() {
            return Err(OrderError::MissingStopPrice.into());
        }

        if !self.breaker.can_trade(&req.symbol, now) {
            return Err(RiskError::MarketHalted {
                symbol: req.symbol.as_str().to_string(),
            }
            .into());
        }

        let order = Order::new(
            req.user_id,
            req.symbol,
            req.side,
            req.order_type,
            req.price,
            req.stop_price,
            req.quantity,
            now,
        );

        self.risk.validate_new_order(order.user_id, &order, now)?;

        let (locked_asset, locked_amount) = self.lock_requirement(&order);
        self.balances
            .lock(order.user_id, &locked_asset, locked_amount, now)?;

        if let Err(err) = self.repo.save_order(order.clone()) {
            if let Err(unlock_err) =
                self.balances
                    .unlock(order.user_id, &locked_asset, locked_amount, now)
            {
                warn!(order = %order.order_id, error = %unlock_err, "admission rollback failed");
            }
            return Err(err);
        }

        if order.order_type == OrderType::STOP {
            self.stop_orders.lock().push(StopOrder {
                order: order.clone(),
                locked_asset,
                locked_amount,
            });
            debug!(order = %order.order_id, symbol = %order.symbol, "stop order parked");
            return Ok(order);
        }

        let order = self.match_order(order, &locked_asset, locked_amount, now)?;
        self.publish_snapshot(&order.symbol);
        Ok(order)
    }

    /// Cancel a resting or parked order
    ///
    /// Cancelling an order already in a terminal status is a state
    /// conflict. The residual admission lock is released.
    pub fn cancel_order(&self, order_id: &OrderId, now: i64) -> Result<Order, ExchangeError> {
        let stored = self
            .repo
            .find_order(order_id)?
            .ok_or(OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;
        if stored.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                status: format!("{:?}", stored.status),
            }
            .into());
        }

        // Parked stop orders release their full admission lock
        {
            let mut stops = self.stop_orders.lock();
            if let Some(index) = stops.iter().position(|stop| &stop.order.order_id == order_id) {
                let stop = stops.remove(index);
                drop(stops);

                let mut order = stop.order;
                order.cancel(now);
                if let Err(err) = self.balances.unlock(
                    order.user_id,
                    &stop.locked_asset,
                    stop.locked_amount,
                    now,
                ) {
                    warn!(order = %order.order_id, error = %err, "stop lock release failed");
                }
                self.repo.update_order(order.clone())?;
                info!(order = %order.order_id, "stop order cancelled");
                return Ok(order);
            }
        }

        let removed = {
            let book = self.book(&stored.symbol);
            let mut book = book.lock();
            book.remove(order_id)
        };
        let mut order = removed.ok_or(OrderError::NotFound {
            order_id: order_id.to_string(),
        })?;

        order.cancel(now);
        self.release_resting_lock(&order, now);
        self.repo.update_order(order.clone())?;
        self.publish_snapshot(&order.symbol);
        info!(order = %order.order_id, symbol = %order.symbol, "order cancelled");
        Ok(order)
    }

    /// Rescan the stop set against a new last price
    ///
    /// Triggered stops convert to market orders and match in insertion
    /// order; the rest are retained. A halted symbol retains all its
    /// stops. Risk checks are not re-run: the admission-time lock is still
    /// in force.
    pub fn trigger_stops(&self, symbol: &Symbol, last_price: Price, now: i64) -> Vec<Order> {
        if !self.breaker.can_trade(symbol, now) {
            return Vec::new();
        }

        let triggered: Vec<StopOrder> = {
            let mut stops = self.stop_orders.lock();
            let drained = std::mem::take(&mut *stops);
            let mut triggered = Vec::new();
            for stop in drained {
                if self.stop_triggers(&stop.order, symbol, last_price) {
                    triggered.push(stop);
                } else {
                    stops.push(stop);
                }
            }
            triggered
        };

        let mut results = Vec::new();
        for stop in triggered {
            let mut order = stop.order;
            order.order_type = OrderType::MARKET;
            order.updated_at = now;
            info!(order = %order.order_id, symbol = %symbol, "stop triggered");

            match self.match_order(order, &stop.locked_asset, stop.locked_amount, now) {
                Ok(order) => results.push(order),
                Err(err) => warn!(symbol = %symbol, error = %err, "stop match failed"),
            }
        }

        if !results.is_empty() {
            self.publish_snapshot(symbol);
        }
        results
    }

    /// Point-in-time book snapshot; `depth == 0` means all levels
    pub fn order_book_snapshot(&self, symbol: &Symbol, depth: usize) -> types::book::OrderBookSnapshot {
        self.book(symbol).lock().snapshot(depth)
    }

    /// Rebuild a symbol's book from the repository's resting orders
    ///
    /// Cold-start path: levels are reconstructed in created-at order so
    /// time priority within each price survives the restart.
    pub fn restore_book(&self, symbol: &Symbol) -> Result<usize, ExchangeError> {
        let resting = self.repo.resting_orders(symbol)?;
        let count = resting.len();

        let book = self.book(symbol);
        let mut book = book.lock();
        for order in resting {
            book.add(order);
        }
        info!(symbol = %symbol, orders = count, "book restored");
        Ok(count)
    }

    fn book(&self, symbol: &Symbol) -> Arc<Mutex<OrderBook>> {
        self.books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(OrderBook::new(symbol.clone()))))
            .clone()
    }

    /// Asset and amount to lock at admission
    ///
    /// Sells lock the base quantity. Buys lock price × quantity of quote;
    /// a market buy falls back to last-price × quantity, then to the raw
    /// quantity as a notional estimate when no price exists yet.
    fn lock_requirement(&self, order: &Order) -> (String, Decimal) {
        match order.side {
            Side::SELL => (
                self.balances.base_asset(&order.symbol),
                order.quantity.as_decimal(),
            ),
            Side::BUY => {
                let quote = self.balances.quote_asset(&order.symbol);
                let notional = if !order.price.is_zero() {
                    order.quantity * order.price
                } else if let Some(last) = self.market_data.last_price(&order.symbol) {
                    order.quantity * last
                } else {
                    order.quantity.as_decimal()
                };
                (quote, notional)
            }
        }
    }

    /// Run the price-time-priority match loop for one order
    ///
    /// The book mutex is held across the whole pass; fills and self-trade
    /// cancellations accumulate in local buffers and every side-effect
    /// happens after release.
    fn match_order(
        &self,
        mut order: Order,
        locked_asset: &str,
        locked_amount: Decimal,
        now: i64,
    ) -> Result<Order, ExchangeError> {
        let book_arc = self.book(&order.symbol);
        let mut fills: Vec<FillRecord> = Vec::new();
        let mut self_trade_cancels: Vec<Order> = Vec::new();

        {
            let mut book = book_arc.lock();
            while !order.remaining().is_zero() {
                let (level_price, level) = match order.side {
                    Side::BUY => match book.asks.best_level_mut() {
                        Some(best) => best,
                        None => break,
                    },
                    Side::SELL => match book.bids.best_level_mut() {
                        Some(best) => best,
                        None => break,
                    },
                };

                if !crossing::crosses(&order, level_price) {
                    break;
                }

                // Self-trade policy: cancel the oldest (resting) order
                let head_is_own = matches!(
                    level.front(),
                    Some(head) if head.user_id == order.user_id
                );
                if head_is_own {
                    if let Some(mut maker) = level.pop_front() {
                        maker.cancel(now);
                        self_trade_cancels.push(maker);
                    }
                    Self::drop_level_if_empty(&mut book, order.side, level_price);
                    continue;
                }

                let head = match level.front_mut() {
                    Some(head) => head,
                    None => {
                        // Drained level left in the map: erase lazily
                        Self::drop_level_if_empty(&mut book, order.side, level_price);
                        continue;
                    }
                };

                let quantity = order.remaining().min(head.remaining());
                let fill = executor::execute_fill(&mut order, head, level_price, quantity, now);
                let maker_filled = fill.maker.is_filled();
                let (buyer, seller) = match order.side {
                    Side::BUY => (order.user_id, fill.maker.user_id),
                    Side::SELL => (fill.maker.user_id, order.user_id),
                };
                fills.push(FillRecord { fill, buyer, seller });

                if maker_filled {
                    level.pop_front();
                }
                Self::drop_level_if_empty(&mut book, order.side, level_price);
            }

            // Unfilled limit remainder rests at its price
            if !order.remaining().is_zero() && order.order_type == OrderType::LIMIT {
                book.add(order.clone());
            }
        }

        // Market remainder is cancelled and its residual lock released
        if !order.remaining().is_zero() && order.order_type != OrderType::LIMIT {
            order.cancel(now);
            self.release_market_residual(&order, locked_asset, locked_amount, &fills, now);
        }

        if let Err(err) = self.repo.update_order(order.clone()) {
            warn!(order = %order.order_id, error = %err, "order update failed");
        }

        self.emit_fills(&fills, now);
        self.finalize_self_trade_cancels(self_trade_cancels, now);

        Ok(order)
    }

    fn drop_level_if_empty(book: &mut OrderBook, incoming_side: Side, price: Price) {
        match incoming_side {
            Side::BUY => book.asks.remove_if_empty(price),
            Side::SELL => book.bids.remove_if_empty(price),
        }
    }

    /// Fan a match pass's fills out to every consumer
    ///
    /// Trades are ledger-recorded first; each remaining write is
    /// best-effort per fill, logged and skipped on failure so one slow or
    /// broken collaborator never stalls the stream.
    fn emit_fills(&self, fills: &[FillRecord], now: i64) {
        for record in fills {
            let trade = &record.fill.trade;

            if let Err(err) = self.repo.save_trade(trade.clone()) {
                warn!(trade = %trade.trade_id, error = %err, "trade save failed");
            }
            if let Err(err) = self.repo.update_order(record.fill.maker.clone()) {
                warn!(order = %record.fill.maker.order_id, error = %err, "maker update failed");
            }
            if let Err(err) = self.events.publish_trade(trade) {
                warn!(trade = %trade.trade_id, error = %err, "trade publish failed");
            }
            if let Err(err) = self.risk.on_trade(trade, record.buyer, record.seller, now) {
                warn!(trade = %trade.trade_id, error = %err, "risk update failed");
            }
            if let Err(err) = self.clearing.on_trade(trade, record.buyer, record.seller, now) {
                warn!(trade = %trade.trade_id, error = %err, "clearing update failed");
            }
            if let Err(err) =
                self.breaker
                    .on_trade_tick(&trade.symbol, trade.price, trade.executed_at)
            {
                warn!(trade = %trade.trade_id, error = %err, "breaker tick failed");
            }
            if let Err(err) = self.market_data.on_trade_event(record.fill.event.clone()) {
                warn!(trade = %trade.trade_id, error = %err, "market data update failed");
            }
        }
    }

    fn finalize_self_trade_cancels(&self, cancelled: Vec<Order>, now: i64) {
        for maker in cancelled {
            self.release_resting_lock(&maker, now);
            if let Err(err) = self.repo.update_order(maker.clone()) {
                warn!(order = %maker.order_id, error = %err, "cancelled maker update failed");
            }
            info!(
                order = %maker.order_id,
                user = %maker.user_id,
                "resting order cancelled on self-trade"
            );
        }
    }

    /// Release the lock still backing a resting order's open remainder
    fn release_resting_lock(&self, order: &Order, now: i64) {
        let (asset, amount) = match order.side {
            Side::SELL => (
                self.balances.base_asset(&order.symbol),
                order.remaining().as_decimal(),
            ),
            Side::BUY => (
                self.balances.quote_asset(&order.symbol),
                order.remaining() * order.price,
            ),
        };
        if amount <= Decimal::ZERO {
            return;
        }
        if let Err(err) = self.balances.unlock(order.user_id, &asset, amount, now) {
            warn!(order = %order.order_id, error = %err, "resting lock release failed");
        }
    }

    /// Release whatever the cancelled market remainder no longer needs
    ///
    /// Consumed funds stay locked for settlement: fill notional on the
    /// quote side for buys, filled quantity on the base side for sells.
    fn release_market_residual(
        &self,
        order: &Order,
        locked_asset: &str,
        locked_amount: Decimal,
        fills: &[FillRecord],
        now: i64,
    ) {
        let consumed = match order.side {
            Side::BUY => fills
                .iter()
                .map(|record| record.fill.trade.trade_value())
                .sum::<Decimal>(),
            Side::SELL => order.filled_quantity.as_decimal(),
        };
        let residual = locked_amount - consumed;
        if residual <= Decimal::ZERO {
            return;
        }
        if let Err(err) = self
            .balances
            .unlock(order.user_id, locked_asset, residual, now)
        {
            warn!(order = %order.order_id, error = %err, "market residual release failed");
        }
    }

    fn stop_triggers(&self, order: &Order, symbol: &Symbol, last_price: Price) -> bool {
        if &order.symbol != symbol {
            return false;
        }
        let stop_price = match order.stop_price {
            Some(price) => price,
            None => return false,
        };
        match order.side {
            Side::BUY => last_price >= stop_price,
            Side::SELL => last_price <= stop_price,
        }
    }

    fn publish_snapshot(&self, symbol: &Symbol) {
        let snapshot = self.book(symbol).lock().snapshot(SNAPSHOT_DEPTH);
        if let Err(err) = self.events.publish_order_book_update(symbol, &snapshot) {
            warn!(symbol = %symbol, error = %err, "book update publish failed");
        }
        self.market_data.on_order_book_snapshot(snapshot);
    }
}
