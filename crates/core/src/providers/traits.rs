use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::{Currency, DateRange, ProviderQuote};

/// Trait abstraction for upstream price sources.
///
/// Each provider translates a (date range, currency) request into its own
/// native query shape — explicit from/to timestamps or coarse period
/// buckets — and normalizes the response into daily quotes. If an API
/// stops working or changes, only that one implementation is replaced.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors/notices).
    fn name(&self) -> &str;

    /// Oldest history the provider serves, in days back from today.
    /// `None` means unlimited depth.
    fn max_history_days(&self) -> Option<i64>;

    /// Whether the provider can quote in this currency directly.
    fn supports(&self, currency: Currency) -> bool;

    /// Fetch daily quotes covering `range`, at most one per date, all
    /// inside the range. Quotes with zero or non-finite prices are
    /// dropped at this boundary — "no data" is an empty vec, not an
    /// error and never a zero price.
    async fn fetch_range(
        &self,
        range: DateRange,
        currency: Currency,
    ) -> Result<Vec<ProviderQuote>, CoreError>;
}
