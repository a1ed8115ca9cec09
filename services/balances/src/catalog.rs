//! Symbol-to-asset naming
//!
//! For a symbol `S` the base asset is `S` and the quote asset is
//! `S_QUOTE`, unless an override is registered for the market.

use std::collections::HashMap;
use types::ids::Symbol;

/// Per-market base/quote asset overrides with convention fallback
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    base: HashMap<Symbol, String>,
    quote: HashMap<Symbol, String>,
}

impl AssetCatalog {
    /// Create a catalog with no overrides (pure convention)
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base-asset override for a symbol
    pub fn set_base(&mut self, symbol: Symbol, asset: impl Into<String>) {
        self.base.insert(symbol, asset.into());
    }

    /// Register a quote-asset override for a symbol
    pub fn set_quote(&mut self, symbol: Symbol, asset: impl Into<String>) {
        self.quote.insert(symbol, asset.into());
    }

    /// Base asset for a symbol
    pub fn base_asset(&self, symbol: &Symbol) -> String {
        self.base
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| symbol.as_str().to_string())
    }

    /// Quote asset for a symbol
    pub fn quote_asset(&self, symbol: &Symbol) -> String {
        self.quote
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| format!("{}_QUOTE", symbol.as_str()))
    }
}
