// ═══════════════════════════════════════════════════════════════════
// Provider Tests — adapters, period buckets, registry wiring
// ═══════════════════════════════════════════════════════════════════

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use kaspa_tracker_core::errors::CoreError;
use kaspa_tracker_core::models::price::{Currency, DateRange, ProviderQuote};
use kaspa_tracker_core::providers::coingecko::CoinGeckoProvider;
use kaspa_tracker_core::providers::coinstats::{ChartPeriod, CoinStatsProvider};
use kaspa_tracker_core::providers::registry::{ProviderChoice, ProviderRegistry};
use kaspa_tracker_core::providers::traits::PriceProvider;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Chart periods
// ═══════════════════════════════════════════════════════════════════

mod chart_periods {
    use super::*;

    #[test]
    fn covering_picks_the_smallest_sufficient_bucket() {
        assert_eq!(ChartPeriod::covering(0), ChartPeriod::OneMonth);
        assert_eq!(ChartPeriod::covering(30), ChartPeriod::OneMonth);
        assert_eq!(ChartPeriod::covering(31), ChartPeriod::ThreeMonths);
        assert_eq!(ChartPeriod::covering(90), ChartPeriod::ThreeMonths);
        assert_eq!(ChartPeriod::covering(91), ChartPeriod::SixMonths);
        assert_eq!(ChartPeriod::covering(180), ChartPeriod::SixMonths);
        assert_eq!(ChartPeriod::covering(181), ChartPeriod::OneYear);
        assert_eq!(ChartPeriod::covering(365), ChartPeriod::OneYear);
        assert_eq!(ChartPeriod::covering(366), ChartPeriod::All);
        assert_eq!(ChartPeriod::covering(4000), ChartPeriod::All);
    }

    #[test]
    fn query_values_match_the_api() {
        assert_eq!(ChartPeriod::OneMonth.as_query(), "1m");
        assert_eq!(ChartPeriod::ThreeMonths.as_query(), "3m");
        assert_eq!(ChartPeriod::SixMonths.as_query(), "6m");
        assert_eq!(ChartPeriod::OneYear.as_query(), "1y");
        assert_eq!(ChartPeriod::All.as_query(), "all");
    }

    #[test]
    fn period_for_a_recent_range_is_small() {
        let today = chrono::Utc::now().date_naive();
        let range = DateRange::new(today - chrono::Duration::days(7), today);
        assert_eq!(CoinStatsProvider::period_for(range), ChartPeriod::OneMonth);

        let range = DateRange::new(today - chrono::Duration::days(500), today);
        assert_eq!(CoinStatsProvider::period_for(range), ChartPeriod::All);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Adapter capabilities (no network involved)
// ═══════════════════════════════════════════════════════════════════

mod capabilities {
    use super::*;

    #[test]
    fn coingecko_serves_both_currencies_with_a_depth_ceiling() {
        let p = CoinGeckoProvider::new();
        assert_eq!(p.name(), "CoinGecko");
        assert_eq!(p.max_history_days(), Some(365));
        assert!(p.supports(Currency::Usd));
        assert!(p.supports(Currency::Eur));
    }

    #[test]
    fn coinstats_serves_usd_only_with_full_depth() {
        let p = CoinStatsProvider::new("test-key".into());
        assert_eq!(p.name(), "CoinStats");
        assert_eq!(p.max_history_days(), None);
        assert!(p.supports(Currency::Usd));
        assert!(!p.supports(Currency::Eur));
    }

    #[tokio::test]
    async fn empty_range_short_circuits_before_any_request() {
        let range = DateRange::new(d(2024, 1, 5), d(2024, 1, 1));
        let gecko = CoinGeckoProvider::new();
        let quotes = gecko.fetch_range(range, Currency::Usd).await.unwrap();
        assert!(quotes.is_empty());

        let stats = CoinStatsProvider::new("test-key".into());
        let quotes = stats.fetch_range(range, Currency::Usd).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn coinstats_rejects_eur_before_any_request() {
        let stats = CoinStatsProvider::new("test-key".into());
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 5));
        let err = stats.fetch_range(range, Currency::Eur).await.unwrap_err();
        match err {
            CoreError::Api { provider, message } => {
                assert_eq!(provider, "CoinStats");
                assert!(message.contains("EUR"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════

struct StubProvider {
    name: &'static str,
    currencies: Vec<Currency>,
}

#[async_trait]
impl PriceProvider for StubProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn max_history_days(&self) -> Option<i64> {
        None
    }

    fn supports(&self, currency: Currency) -> bool {
        self.currencies.contains(&currency)
    }

    async fn fetch_range(
        &self,
        _range: DateRange,
        _currency: Currency,
    ) -> Result<Vec<ProviderQuote>, CoreError> {
        Ok(Vec::new())
    }
}

mod registry {
    use super::*;

    #[test]
    fn defaults_always_include_coingecko() {
        let registry = ProviderRegistry::new_with_defaults(&HashMap::new());
        assert!(registry.select(ProviderChoice::CoinGecko).is_some());
        assert!(registry.select(ProviderChoice::CoinStats).is_none());
    }

    #[test]
    fn coinstats_appears_only_with_its_key() {
        let mut keys = HashMap::new();
        keys.insert("coinstats".to_string(), "k".to_string());
        let registry = ProviderRegistry::new_with_defaults(&keys);
        let p = registry.select(ProviderChoice::CoinStats).unwrap();
        assert_eq!(p.name(), "CoinStats");
    }

    #[test]
    fn unrelated_keys_do_not_enable_coinstats() {
        let mut keys = HashMap::new();
        keys.insert("somethingelse".to_string(), "k".to_string());
        let registry = ProviderRegistry::new_with_defaults(&keys);
        assert!(registry.select(ProviderChoice::CoinStats).is_none());
    }

    #[test]
    fn register_replaces_an_existing_entry() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            ProviderChoice::CoinGecko,
            Box::new(StubProvider {
                name: "first",
                currencies: vec![Currency::Usd],
            }),
        );
        registry.register(
            ProviderChoice::CoinGecko,
            Box::new(StubProvider {
                name: "second",
                currencies: vec![Currency::Usd],
            }),
        );
        let p = registry.select(ProviderChoice::CoinGecko).unwrap();
        assert_eq!(p.name(), "second");
    }

    #[test]
    fn fallback_finds_another_provider_for_the_currency() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            ProviderChoice::CoinStats,
            Box::new(StubProvider {
                name: "usd-only",
                currencies: vec![Currency::Usd],
            }),
        );
        registry.register(
            ProviderChoice::CoinGecko,
            Box::new(StubProvider {
                name: "both",
                currencies: vec![Currency::Usd, Currency::Eur],
            }),
        );

        let fallback = registry
            .fallback_for(Currency::Eur, ProviderChoice::CoinStats)
            .unwrap();
        assert_eq!(fallback.name(), "both");

        // Nobody else quotes EUR once the capable provider is excluded.
        let mut lone = ProviderRegistry::new();
        lone.register(
            ProviderChoice::CoinStats,
            Box::new(StubProvider {
                name: "usd-only",
                currencies: vec![Currency::Usd],
            }),
        );
        assert!(lone
            .fallback_for(Currency::Eur, ProviderChoice::CoinStats)
            .is_none());
    }

    #[test]
    fn choice_display_names() {
        assert_eq!(ProviderChoice::CoinGecko.to_string(), "CoinGecko");
        assert_eq!(ProviderChoice::CoinStats.to_string(), "CoinStats");
    }
}
