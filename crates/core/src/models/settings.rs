use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default time-to-live for memoized reconciliations, in seconds.
/// Historical daily prices never change once fetched, so an hour is safe.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// User-configurable settings for the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "coinstats"). Values: the API key string.
    pub api_keys: HashMap<String, String>,

    /// How long a reconciliation result is reused before the store and
    /// providers are consulted again.
    pub cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}
