use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::coingecko::CoinGeckoProvider;
use super::coinstats::CoinStatsProvider;
use super::traits::PriceProvider;
use crate::models::price::Currency;

/// Enumerated provider identifier, passed explicitly through the call
/// chain — never ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderChoice {
    CoinGecko,
    CoinStats,
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderChoice::CoinGecko => f.write_str("CoinGecko"),
            ProviderChoice::CoinStats => f.write_str("CoinStats"),
        }
    }
}

/// Registry of the configured price providers, keyed by [`ProviderChoice`].
pub struct ProviderRegistry {
    providers: Vec<(ProviderChoice, Box<dyn PriceProvider>)>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // CoinGecko — ranged queries, no API key needed
        registry.register(ProviderChoice::CoinGecko, Box::new(CoinGeckoProvider::new()));

        // CoinStats — bucketed queries, requires API key
        if let Some(key) = api_keys.get("coinstats") {
            registry.register(
                ProviderChoice::CoinStats,
                Box::new(CoinStatsProvider::new(key.clone())),
            );
        }

        registry
    }

    /// Register a provider under a choice, replacing any previous entry.
    pub fn register(&mut self, choice: ProviderChoice, provider: Box<dyn PriceProvider>) {
        self.providers.retain(|(c, _)| *c != choice);
        self.providers.push((choice, provider));
    }

    /// The provider registered for `choice`, if any.
    pub fn select(&self, choice: ProviderChoice) -> Option<&dyn PriceProvider> {
        self.providers
            .iter()
            .find(|(c, _)| *c == choice)
            .map(|(_, p)| p.as_ref())
    }

    /// A provider other than `exclude` able to quote `currency`.
    /// Used when the selected provider does not serve that currency.
    pub fn fallback_for(
        &self,
        currency: Currency,
        exclude: ProviderChoice,
    ) -> Option<&dyn PriceProvider> {
        self.providers
            .iter()
            .find(|(c, p)| *c != exclude && p.supports(currency))
            .map(|(_, p)| p.as_ref())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
