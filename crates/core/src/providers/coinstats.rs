use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::price::{Currency, DateRange, ProviderQuote};

const BASE_URL: &str = "https://openapiv1.coinstats.app";
const COIN_ID: &str = "kaspa";

/// Coarse period selector accepted by the charts endpoint.
///
/// The API cannot take explicit timestamps; the adapter picks the
/// smallest bucket covering the requested range's age and discards
/// samples outside the range afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    All,
}

impl ChartPeriod {
    /// Query-string value for the bucket.
    pub fn as_query(&self) -> &'static str {
        match self {
            ChartPeriod::OneMonth => "1m",
            ChartPeriod::ThreeMonths => "3m",
            ChartPeriod::SixMonths => "6m",
            ChartPeriod::OneYear => "1y",
            ChartPeriod::All => "all",
        }
    }

    /// Smallest bucket whose window reaches back `age_days` from today.
    pub fn covering(age_days: i64) -> Self {
        match age_days {
            d if d <= 30 => ChartPeriod::OneMonth,
            d if d <= 90 => ChartPeriod::ThreeMonths,
            d if d <= 180 => ChartPeriod::SixMonths,
            d if d <= 365 => ChartPeriod::OneYear,
            _ => ChartPeriod::All,
        }
    }
}

/// CoinStats API provider — the bucketed source.
///
/// - **Requires**: API key (set via settings as "coinstats").
/// - **Query shape**: coarse period bucket, no explicit timestamps.
/// - **Endpoint**: `/coins/{id}/charts?period=...`
/// - **Currencies**: charts are USD-denominated only; EUR requests are
///   routed to the ranged provider by the reconciler.
/// - **Depth**: the `all` bucket reaches the full listed history.
pub struct CoinStatsProvider {
    client: Client,
    api_key: String,
}

impl CoinStatsProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    /// Bucket used for a requested range, measured from its start to today.
    pub fn period_for(range: DateRange) -> ChartPeriod {
        let age_days = (Utc::now().date_naive() - range.start).num_days();
        ChartPeriod::covering(age_days)
    }
}

// ── CoinStats API response types ────────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    /// Rows are `[timestamp_seconds, price_usd, ...]` tuples of varying
    /// arity; only the first two positions matter here.
    #[serde(default)]
    chart: Vec<Vec<f64>>,
}

#[async_trait]
impl PriceProvider for CoinStatsProvider {
    fn name(&self) -> &str {
        "CoinStats"
    }

    fn max_history_days(&self) -> Option<i64> {
        None
    }

    fn supports(&self, currency: Currency) -> bool {
        currency == Currency::Usd
    }

    async fn fetch_range(
        &self,
        range: DateRange,
        currency: Currency,
    ) -> Result<Vec<ProviderQuote>, CoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        if !self.supports(currency) {
            return Err(CoreError::Api {
                provider: "CoinStats".into(),
                message: format!("charts are not denominated in {currency}"),
            });
        }

        let period = Self::period_for(range);
        let url = format!("{BASE_URL}/coins/{COIN_ID}/charts");
        let resp = self
            .client
            .get(&url)
            .query(&[("period", period.as_query())])
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(CoreError::RateLimited {
                    provider: "CoinStats".into(),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let status = resp.status();
                return Err(CoreError::Api {
                    provider: "CoinStats".into(),
                    message: format!("request rejected with HTTP {status}; check the API key"),
                });
            }
            _ => {}
        }
        let resp = resp.error_for_status()?;

        let body: ChartResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("CoinStats returned an unparseable chart: {e}");
                return Ok(Vec::new());
            }
        };

        // The bucket usually reaches further back than requested; samples
        // outside the range are discarded here, one quote per date.
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for row in &body.chart {
            let (Some(&ts_sec), Some(&price)) = (row.first(), row.get(1)) else {
                continue;
            };
            if !price.is_finite() || price <= 0.0 {
                continue;
            }
            let Some(dt) = DateTime::from_timestamp(ts_sec as i64, 0) else {
                continue;
            };
            let date = dt.date_naive();
            if range.contains(date) {
                by_date.entry(date).or_insert(price);
            }
        }

        Ok(by_date
            .into_iter()
            .map(|(date, price)| ProviderQuote {
                date,
                price,
                currency,
            })
            .collect())
    }
}
