//! Price feed adapter
//!
//! The risk engine consumes last trade prices through its `PriceFeed`
//! seam; the market-data engine is where those prices live. This adapter
//! binds the two at wiring time.

use std::sync::Arc;

use market_data::MarketDataEngine;
use risk_engine::PriceFeed;
use types::ids::Symbol;
use types::numeric::Price;

/// `PriceFeed` backed by the market-data engine's ticker cache
pub struct LastPriceFeed {
    market_data: Arc<MarketDataEngine>,
}

impl LastPriceFeed {
    pub fn new(market_data: Arc<MarketDataEngine>) -> Self {
        Self { market_data }
    }
}

impl PriceFeed for LastPriceFeed {
    fn last_price(&self, symbol: &Symbol) -> Option<Price> {
        self.market_data.last_price(symbol)
    }
}
