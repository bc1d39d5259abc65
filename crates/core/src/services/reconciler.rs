use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::price::{Currency, DateRange, PricePoint, ProviderQuote};
use crate::providers::registry::{ProviderChoice, ProviderRegistry};
use crate::providers::traits::PriceProvider;
use crate::services::gaps::currency_gaps;
use crate::store::price_store::PriceStore;

/// Non-fatal outcomes of a reconciliation, surfaced alongside the data.
///
/// A notice never aborts the run — the stored data is still returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Part of the requested history predates what the provider serves;
    /// the fetch proceeded on the narrowed range.
    HistoryClamped {
        provider: String,
        currency: Currency,
        requested_start: NaiveDate,
        effective_start: NaiveDate,
    },
    /// The whole gap predates the provider's depth ceiling; nothing was
    /// fetched for this currency.
    HistoryUnavailable {
        provider: String,
        currency: Currency,
        oldest_served: NaiveDate,
    },
    /// The provider answered with a rate limit. Not retried — the caller
    /// should back off and reconcile again later.
    RateLimited { provider: String, currency: Currency },
    /// The provider call failed; stored data was used as-is and this
    /// currency stays incomplete for this invocation.
    ProviderFailed {
        provider: String,
        currency: Currency,
        message: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::HistoryClamped {
                provider,
                currency,
                requested_start,
                effective_start,
            } => write!(
                f,
                "{provider}: {currency} history before {effective_start} is unavailable; \
                 fetching from {effective_start} instead of {requested_start}"
            ),
            Notice::HistoryUnavailable {
                provider,
                currency,
                oldest_served,
            } => write!(
                f,
                "{provider}: all missing {currency} dates are older than {oldest_served}; \
                 skipping the fetch"
            ),
            Notice::RateLimited { provider, currency } => write!(
                f,
                "{provider}: rate limit exceeded while fetching {currency}; wait and retry"
            ),
            Notice::ProviderFailed {
                provider,
                currency,
                message,
            } => write!(f, "{provider}: {currency} fetch failed: {message}"),
        }
    }
}

/// Result of one reconciliation: the canonical merged series for the
/// requested range, plus any notices.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub points: Vec<PricePoint>,
    pub notices: Vec<Notice>,
}

/// Orchestrates one reconciliation pass over the price store.
///
/// Flow per invocation: read the stored snapshot → compute per-currency
/// gaps → bound each gap into a contiguous fetch range → clamp against
/// the provider's depth ceiling → fetch → fill-only upsert → re-read the
/// store for the canonical answer. Provider failures become notices;
/// storage failures propagate.
pub struct Reconciler<'a> {
    store: &'a PriceStore,
    registry: &'a ProviderRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a PriceStore, registry: &'a ProviderRegistry) -> Self {
        Self { store, registry }
    }

    pub async fn reconcile(
        &self,
        range: DateRange,
        currencies: &[Currency],
        choice: ProviderChoice,
    ) -> Result<Reconciliation, CoreError> {
        if range.is_empty() {
            return Ok(Reconciliation {
                points: Vec::new(),
                notices: Vec::new(),
            });
        }
        let selected = self
            .registry
            .select(choice)
            .ok_or_else(|| CoreError::NoProvider(choice.to_string()))?;

        let snapshot = self.store.range_read(range.start, range.end).await?;
        let today = Utc::now().date_naive();

        let mut notices = Vec::new();
        let mut fetched: Vec<ProviderQuote> = Vec::new();

        let mut wanted: Vec<Currency> = currencies.to_vec();
        wanted.sort();
        wanted.dedup();

        for currency in wanted {
            let gaps = currency_gaps(range, &snapshot, currency);
            let Some(bounds) = gaps.fetch_bounds() else {
                debug!(%currency, %range, "no gaps, nothing to fetch");
                continue;
            };

            // Route to a provider that actually quotes this currency.
            let provider: &dyn PriceProvider = if selected.supports(currency) {
                selected
            } else {
                match self.registry.fallback_for(currency, choice) {
                    Some(fallback) => {
                        debug!(
                            %currency,
                            from = selected.name(),
                            to = fallback.name(),
                            "currency not served, falling back"
                        );
                        fallback
                    }
                    None => {
                        notices.push(Notice::ProviderFailed {
                            provider: selected.name().to_string(),
                            currency,
                            message: "no configured provider quotes this currency".into(),
                        });
                        continue;
                    }
                }
            };

            // Clamp the fetch range against the provider's depth ceiling.
            let effective = match provider.max_history_days() {
                Some(days) => {
                    let oldest_served = today - Duration::days(days);
                    if bounds.end < oldest_served {
                        info!(
                            %currency,
                            provider = provider.name(),
                            %oldest_served,
                            "entire gap predates the depth ceiling, skipping fetch"
                        );
                        notices.push(Notice::HistoryUnavailable {
                            provider: provider.name().to_string(),
                            currency,
                            oldest_served,
                        });
                        continue;
                    }
                    let clamped = bounds.clamp_start(oldest_served);
                    if clamped.start > bounds.start {
                        notices.push(Notice::HistoryClamped {
                            provider: provider.name().to_string(),
                            currency,
                            requested_start: bounds.start,
                            effective_start: clamped.start,
                        });
                    }
                    clamped
                }
                None => bounds,
            };

            info!(
                %currency,
                provider = provider.name(),
                range = %effective,
                "fetching missing price data"
            );
            match provider.fetch_range(effective, currency).await {
                Ok(quotes) => {
                    debug!(%currency, count = quotes.len(), "provider returned quotes");
                    fetched.extend(quotes);
                }
                Err(CoreError::RateLimited { provider }) => {
                    warn!(%currency, %provider, "rate limited");
                    notices.push(Notice::RateLimited { provider, currency });
                }
                Err(e) => {
                    warn!(%currency, provider = provider.name(), error = %e, "fetch failed");
                    notices.push(Notice::ProviderFailed {
                        provider: provider.name().to_string(),
                        currency,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !fetched.is_empty() {
            let points = points_from_quotes(&fetched);
            self.store.upsert(&points).await?;
        }

        // Re-read for the canonical merged view, including values filled
        // by earlier invocations.
        let points = self.store.range_read(range.start, range.end).await?;
        Ok(Reconciliation { points, notices })
    }
}

/// Collapse quotes into one point per date, populating whichever
/// currency columns were fetched. The first quote for a date/currency
/// wins; zero or non-finite prices are never turned into points.
fn points_from_quotes(quotes: &[ProviderQuote]) -> Vec<PricePoint> {
    let mut by_date: BTreeMap<NaiveDate, PricePoint> = BTreeMap::new();
    for quote in quotes {
        if !quote.price.is_finite() || quote.price <= 0.0 {
            continue;
        }
        by_date
            .entry(quote.date)
            .or_insert_with(|| PricePoint::empty(quote.date))
            .fill_missing(quote.currency, quote.price);
    }
    by_date.into_values().collect()
}
