use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::price::{Currency, DateRange, ProviderQuote};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const COIN_ID: &str = "kaspa";

/// Historical depth of the free tier, days back from today.
const FREE_TIER_HISTORY_DAYS: i64 = 365;

/// CoinGecko API provider — the ranged source.
///
/// - **Free**: no API key; historical data capped at 365 days back.
/// - **Query shape**: explicit from/to Unix-second timestamps per currency.
/// - **Endpoint**: `/coins/{id}/market_chart/range`
/// - **Currencies**: any `vs_currency`, so both USD and EUR directly.
pub struct CoinGeckoProvider {
    client: Client,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── CoinGecko API response types ────────────────────────────────────

#[derive(Deserialize)]
struct MarketChartResponse {
    /// Rows are `[timestamp_ms, price]` pairs.
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    fn max_history_days(&self) -> Option<i64> {
        Some(FREE_TIER_HISTORY_DAYS)
    }

    fn supports(&self, _currency: Currency) -> bool {
        true
    }

    async fn fetch_range(
        &self,
        range: DateRange,
        currency: Currency,
    ) -> Result<Vec<ProviderQuote>, CoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let from_ts = range.start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        // One extra day so the final date's sample is inside the window.
        let to_day = range.end.succ_opt().unwrap_or(range.end);
        let to_ts = to_day.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();

        let url = format!("{BASE_URL}/coins/{COIN_ID}/market_chart/range");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", currency.vs_currency().to_string()),
                ("from", from_ts.to_string()),
                ("to", to_ts.to_string()),
            ])
            .send()
            .await?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(CoreError::RateLimited {
                    provider: "CoinGecko".into(),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let message = resp
                    .json::<ApiErrorBody>()
                    .await
                    .ok()
                    .and_then(|b| b.error)
                    .unwrap_or_else(|| "unknown error".into());
                return Err(CoreError::Api {
                    provider: "CoinGecko".into(),
                    message,
                });
            }
            _ => {}
        }
        let resp = resp.error_for_status()?;

        // A body we cannot parse means no data, not a failed reconciliation.
        let body: MarketChartResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("CoinGecko returned an unparseable market chart: {e}");
                return Ok(Vec::new());
            }
        };

        // Sub-daily samples collapse to one quote per date; the first
        // sample of a day wins, matching the store's first-value-is-
        // permanent rule.
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for &(ts_ms, price) in &body.prices {
            if !price.is_finite() || price <= 0.0 {
                continue;
            }
            let Some(dt) = DateTime::from_timestamp_millis(ts_ms as i64) else {
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
