//! Rolling 24h ticker
//!
//! Each symbol keeps the deque of trade contributions still inside the
//! trailing window. Every update evicts aged contributions first and then
//! re-derives open/high/low/volume/trade-count from what survives, so the
//! open price really is the first trade of the trailing window rather than
//! the first trade ever observed.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::Symbol;
use types::numeric::{Price, Quantity};
use types::trade::TradeEvent;

/// Rolling summary statistics for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker24h {
    pub symbol: Symbol,
    pub last_price: Price,
    pub open_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub volume: Quantity,
    pub quote_volume: Decimal,
    pub trades: u64,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub open_time: i64,
    pub close_time: i64,
    pub updated_at: i64,
}

/// One in-window trade contribution
#[derive(Debug, Clone, Copy)]
struct Contribution {
    price: Decimal,
    quantity: Decimal,
    timestamp: i64,
}

/// Per-symbol window state feeding the ticker
#[derive(Debug)]
pub struct TickerWindow {
    symbol: Symbol,
    window: i64,
    contributions: VecDeque<Contribution>,
}

impl TickerWindow {
    pub fn new(symbol: Symbol, window: i64) -> Self {
        Self {
            symbol,
            window,
            contributions: VecDeque::new(),
        }
    }

    /// Fold a trade event in and derive the current ticker
    pub fn apply(&mut self, event: &TradeEvent) -> Ticker24h {
        self.contributions.push_back(Contribution {
            price: event.price.as_decimal(),
            quantity: event.quantity.as_decimal(),
            timestamp: event.timestamp,
        });

        let window_start = event.timestamp - self.window;
        while let Some(front) = self.contributions.front() {
            if front.timestamp <= window_start {
                self.contributions.pop_front();
            } else {
                break;
            }
        }

        self.derive(event.timestamp)
    }

    /// Derive the ticker view from the surviving contributions
    ///
    /// The deque is never empty here: apply() always pushes the current
    /// event before evicting, and the current event is inside its own window.
    fn derive(&self, now: i64) -> Ticker24h {
        let first = self.contributions.front().expect("window never empty");
        let last = self.contributions.back().expect("window never empty");

        let open = first.price;
        let mut high = open;
        let mut low = open;
        let mut volume = Decimal::ZERO;
        let mut quote_volume = Decimal::ZERO;
        for contribution in &self.contributions {
            if contribution.price > high {
                high = contribution.price;
            }
            if contribution.price < low {
                low = contribution.price;
            }
            volume += contribution.quantity;
            quote_volume += contribution.price * contribution.quantity;
        }

        let price_change = last.price - open;
        let price_change_percent = if open == Decimal::ZERO {
            Decimal::ZERO
        } else {
            price_change / open * Decimal::from(100)
        };

        Ticker24h {
            symbol: self.symbol.clone(),
            last_price: Price::new(last.price),
            open_price: Price::new(open),
            high_price: Price::new(high),
            low_price: Price::new(low),
            volume: Quantity::new(volume),
            quote_volume,
            trades: self.contributions.len() as u64,
            price_change,
            price_change_percent,
            open_time: now - self.window,
            close_time: now,
            updated_at: now,
        }
    }
}
