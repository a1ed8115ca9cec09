//! Error taxonomy for the trading core
//!
//! Input validation, risk rejections, balance insufficiencies, and state
//! conflicts are first-class errors surfaced to callers. Downstream
//! publisher/event-bus failures are logged and swallowed by the engines and
//! never appear here.

use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error for the trading pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Risk rejection: {0}")]
    Risk(#[from] RiskError),

    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    #[error("Clearing error: {0}")]
    Clearing(#[from] ClearingError),

    #[error("Repository error: {0}")]
    Repository(String),
}

/// Input-validation and order-state errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("limit order requires a positive price")]
    MissingLimitPrice,

    #[error("stop order requires a stop price")]
    MissingStopPrice,

    #[error("order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("order already in terminal status {status}")]
    AlreadyTerminal { status: String },
}

/// Pre-trade risk rejections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("order price deviates {deviation_percent}% from reference, max {max_percent}%")]
    PriceBand {
        deviation_percent: Decimal,
        max_percent: Decimal,
    },

    #[error("order notional {notional} exceeds per-order limit {max_notional}")]
    MaxNotional {
        notional: Decimal,
        max_notional: Decimal,
    },

    #[error("insufficient margin: equity {equity} below required {required_equity}")]
    InsufficientMargin {
        required_equity: Decimal,
        equity: Decimal,
    },

    #[error("market halted: {symbol}")]
    MarketHalted { symbol: String },
}

/// Balance insufficiencies and invalid amounts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalanceError {
    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("insufficient available {asset}: requested {requested}, available {available}")]
    InsufficientAvailable {
        asset: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("insufficient locked {asset}: requested {requested}, locked {locked}")]
    InsufficientLocked {
        asset: String,
        requested: Decimal,
        locked: Decimal,
    },

    #[error("deposit {deposit_id} not pending")]
    DepositNotPending { deposit_id: String },

    #[error("withdrawal {withdrawal_id} not in a completable status")]
    WithdrawalNotCompletable { withdrawal_id: String },

    #[error("deposit not found: {deposit_id}")]
    DepositNotFound { deposit_id: String },

    #[error("withdrawal not found: {withdrawal_id}")]
    WithdrawalNotFound { withdrawal_id: String },
}

/// Clearing and settlement state conflicts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClearingError {
    #[error("settlement cancelled before completion")]
    Cancelled,

    #[error("clearing position modified concurrently: {position_id}")]
    ConcurrentModification { position_id: String },
}
