pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod store;

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::debug;

use errors::CoreError;
use models::settings::Settings;
use models::transaction::{ReportRow, Transaction};
use providers::registry::ProviderRegistry;
use providers::traits::PriceProvider;
use services::ledger;
use services::reconcile_cache::ReconcileCache;
use services::reconciler::Reconciler;
use store::price_store::PriceStore;

pub use models::price::{Currency, DateRange, PricePoint, ProviderQuote};
pub use providers::registry::ProviderChoice;
pub use services::reconciler::{Notice, Reconciliation};

/// A full per-address report: the balance ledger valued against the
/// reconciled price history, plus any reconciliation notices.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressReport {
    pub address: String,
    pub rows: Vec<ReportRow>,
    pub notices: Vec<Notice>,
}

/// Main entry point for the Kaspa Tracker core library.
///
/// Owns the price store, the provider registry and the reconciliation
/// memo cache. One tracker serves any number of addresses; reports for
/// multiple addresses run sequentially against the shared store.
#[must_use]
pub struct KaspaTracker {
    store: PriceStore,
    registry: ProviderRegistry,
    cache: ReconcileCache,
    settings: Settings,
}

impl std::fmt::Debug for KaspaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaspaTracker")
            .field("settings", &self.settings)
            .field("memoized", &self.cache.len())
            .finish()
    }
}

impl KaspaTracker {
    /// Open (or create) the price database at `path`. Schema setup and
    /// migration run here, idempotently, on every startup.
    pub async fn open(path: impl AsRef<Path>, settings: Settings) -> Result<Self, CoreError> {
        let store = PriceStore::open(path).await?;
        Ok(Self::build(store, settings))
    }

    /// Tracker backed by an in-memory database. Nothing survives drop.
    pub async fn open_in_memory(settings: Settings) -> Result<Self, CoreError> {
        let store = PriceStore::open_in_memory().await?;
        Ok(Self::build(store, settings))
    }

    fn build(store: PriceStore, settings: Settings) -> Self {
        let registry = ProviderRegistry::new_with_defaults(&settings.api_keys);
        let cache = ReconcileCache::new(Duration::from_secs(settings.cache_ttl_secs));
        Self {
            store,
            registry,
            cache,
            settings,
        }
    }

    // ── Price reconciliation ────────────────────────────────────────

    /// Reconcile the stored price history for [start, end] and the given
    /// currencies against the chosen provider, fetching only what is
    /// missing. Returns the canonical merged series plus notices.
    ///
    /// Results are memoized for the configured TTL, so a repeat call
    /// within the window performs no upstream fetches at all.
    pub async fn reconcile_prices(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        currencies: &[Currency],
        choice: ProviderChoice,
    ) -> Result<Reconciliation, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "start date ({start}) must not be after end date ({end})"
            )));
        }
        let range = DateRange::new(start, end);
        if let Some(hit) = self.cache.get(range, currencies, choice) {
            debug!(%range, "reconciliation served from memo cache");
            return Ok(hit);
        }
        let result = Reconciler::new(&self.store, &self.registry)
            .reconcile(range, currencies, choice)
            .await?;
        self.cache.put(range, currencies, choice, &result);
        Ok(result)
    }

    /// Direct read of the stored series, no fetching.
    pub async fn stored_prices(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.store.range_read(start, end).await
    }

    // ── Reports ─────────────────────────────────────────────────────

    /// Build the balance-and-value report for one address from its
    /// already-fetched transaction list: derive the tracked date range,
    /// reconcile prices for it, fold the ledger and join the two.
    pub async fn report_for_address(
        &mut self,
        transactions: &[Transaction],
        address: &str,
        choice: ProviderChoice,
    ) -> Result<AddressReport, CoreError> {
        let Some(range) = ledger::tracked_range(transactions) else {
            return Ok(AddressReport {
                address: address.to_string(),
                rows: Vec::new(),
                notices: Vec::new(),
            });
        };
        let reconciliation = self
            .reconcile_prices(range.start, range.end, &Currency::ALL, choice)
            .await?;
        let entries = ledger::build_ledger(transactions, address);
        let rows = ledger::build_report(&entries, &reconciliation.points);
        Ok(AddressReport {
            address: address.to_string(),
            rows,
            notices: reconciliation.notices,
        })
    }

    /// Parse a `full-transactions` API response body.
    pub fn parse_transactions(json: &str) -> Result<Vec<Transaction>, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    // ── Settings & providers ────────────────────────────────────────

    /// Set an API key for a provider (e.g., "coinstats").
    /// Rebuilds the provider registry so the new key takes effect
    /// immediately, and drops memoized results made without it.
    pub fn set_api_key(&mut self, provider: impl Into<String>, key: impl Into<String>) {
        self.settings.api_keys.insert(provider.into(), key.into());
        self.registry = ProviderRegistry::new_with_defaults(&self.settings.api_keys);
        self.cache.clear();
    }

    /// Remove an API key and rebuild the registry. Returns whether a key
    /// was present.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.settings.api_keys.remove(provider).is_some();
        if removed {
            self.registry = ProviderRegistry::new_with_defaults(&self.settings.api_keys);
            self.cache.clear();
        }
        removed
    }

    /// Register (or replace) a provider implementation directly.
    /// Useful for tests and for custom sources.
    pub fn register_provider(&mut self, choice: ProviderChoice, provider: Box<dyn PriceProvider>) {
        self.registry.register(choice, provider);
        self.cache.clear();
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Memo cache ──────────────────────────────────────────────────

    #[must_use]
    pub fn memoized_count(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_memo_cache(&mut self) {
        self.cache.clear();
    }
}
