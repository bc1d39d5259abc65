// ═══════════════════════════════════════════════════════════════════
// Store Tests — PriceStore schema, fill-only upsert, gap queries
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use kaspa_tracker_core::models::price::{Currency, PricePoint};
use kaspa_tracker_core::store::price_store::PriceStore;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn point(date: NaiveDate, usd: Option<f64>, eur: Option<f64>) -> PricePoint {
    PricePoint { date, usd, eur }
}

// ═══════════════════════════════════════════════════════════════════
// Schema & init
// ═══════════════════════════════════════════════════════════════════

mod schema {
    use super::*;

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = PriceStore::open_in_memory().await.unwrap();
        // open() already ran init; running it again must be harmless
        store.init().await.unwrap();
        store.init().await.unwrap();
    }

    #[tokio::test]
    async fn init_survives_existing_data() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store
            .upsert(&[point(d(2024, 1, 1), Some(0.12), Some(0.11))])
            .await
            .unwrap();
        store.init().await.unwrap();
        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 1)).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].usd, Some(0.12));
    }

    #[tokio::test]
    async fn migrates_single_currency_table_without_losing_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.db");

        // Simulate a database created before the EUR column existed.
        {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(
                    SqliteConnectOptions::new()
                        .filename(&path)
                        .create_if_missing(true),
                )
                .await
                .unwrap();
            sqlx::query("CREATE TABLE kas_prices (date TEXT PRIMARY KEY, price REAL)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO kas_prices (date, price) VALUES ('2024-01-01', 0.12)")
                .execute(&pool)
                .await
                .unwrap();
            pool.close().await;
        }

        let store = PriceStore::open(&path).await.unwrap();
        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 1)).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].usd, Some(0.12));
        assert_eq!(points[0].eur, None);

        // The migrated column is writable and the old value is kept.
        store
            .upsert(&[point(d(2024, 1, 1), None, Some(0.11))])
            .await
            .unwrap();
        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 1)).await.unwrap();
        assert_eq!(points[0].usd, Some(0.12));
        assert_eq!(points[0].eur, Some(0.11));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Upsert — fill-only merge
// ═══════════════════════════════════════════════════════════════════

mod upsert {
    use super::*;

    #[tokio::test]
    async fn insert_then_read_round_trips() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store
            .upsert(&[
                point(d(2024, 1, 2), Some(0.11), None),
                point(d(2024, 1, 1), Some(0.10), Some(0.09)),
            ])
            .await
            .unwrap();

        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 2)).await.unwrap();
        assert_eq!(points.len(), 2);
        // Ordered by date regardless of insertion order.
        assert_eq!(points[0].date, d(2024, 1, 1));
        assert_eq!(points[0].eur, Some(0.09));
        assert_eq!(points[1].date, d(2024, 1, 2));
        assert_eq!(points[1].eur, None);
    }

    #[tokio::test]
    async fn incoming_null_never_erases_a_value() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store
            .upsert(&[point(d(2024, 1, 1), Some(5.0), None)])
            .await
            .unwrap();
        store
            .upsert(&[point(d(2024, 1, 1), None, Some(3.0))])
            .await
            .unwrap();

        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 1)).await.unwrap();
        assert_eq!(points[0].usd, Some(5.0));
        assert_eq!(points[0].eur, Some(3.0));
    }

    #[tokio::test]
    async fn first_fetched_value_is_permanent() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store
            .upsert(&[point(d(2024, 1, 1), Some(5.0), None)])
            .await
            .unwrap();
        // A later fetch returning a different number must not win.
        store
            .upsert(&[point(d(2024, 1, 1), Some(9.0), None)])
            .await
            .unwrap();

        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 1)).await.unwrap();
        assert_eq!(points[0].usd, Some(5.0));
    }

    #[tokio::test]
    async fn repeated_upserts_leave_one_row_per_date() {
        let store = PriceStore::open_in_memory().await.unwrap();
        for _ in 0..3 {
            store
                .upsert(&[point(d(2024, 1, 1), Some(0.10), Some(0.09))])
                .await
                .unwrap();
        }
        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 1)).await.unwrap();
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn empty_upsert_is_a_no_op() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store.upsert(&[]).await.unwrap();
        let points = store.range_read(d(2024, 1, 1), d(2024, 12, 31)).await.unwrap();
        assert!(points.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Range reads
// ═══════════════════════════════════════════════════════════════════

mod range_read {
    use super::*;

    #[tokio::test]
    async fn bounds_are_inclusive() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store
            .upsert(&[
                point(d(2024, 1, 1), Some(1.0), None),
                point(d(2024, 1, 2), Some(2.0), None),
                point(d(2024, 1, 3), Some(3.0), None),
            ])
            .await
            .unwrap();
        let points = store.range_read(d(2024, 1, 1), d(2024, 1, 2)).await.unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn empty_range_returns_empty_not_error() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let points = store.range_read(d(2024, 1, 5), d(2024, 1, 1)).await.unwrap();
        assert!(points.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Gap queries
// ═══════════════════════════════════════════════════════════════════

mod gap_queries {
    use super::*;

    #[tokio::test]
    async fn missing_dates_reports_exactly_the_rowless_dates() {
        let store = PriceStore::open_in_memory().await.unwrap();
        // D1, D3, D5 present; D2, D4 absent.
        store
            .upsert(&[
                point(d(2024, 1, 1), Some(1.0), None),
                point(d(2024, 1, 3), Some(3.0), None),
                point(d(2024, 1, 5), Some(5.0), None),
            ])
            .await
            .unwrap();

        let missing = store.missing_dates(d(2024, 1, 1), d(2024, 1, 5)).await.unwrap();
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec![d(2024, 1, 2), d(2024, 1, 4)]
        );
    }

    #[tokio::test]
    async fn missing_dates_on_empty_store_is_the_whole_range() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let missing = store.missing_dates(d(2024, 1, 1), d(2024, 1, 3)).await.unwrap();
        assert_eq!(missing.len(), 3);
    }

    #[tokio::test]
    async fn missing_dates_on_empty_range_is_empty() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let missing = store.missing_dates(d(2024, 1, 5), d(2024, 1, 1)).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn missing_currency_dates_inspects_existing_rows_only() {
        let store = PriceStore::open_in_memory().await.unwrap();
        store
            .upsert(&[
                point(d(2024, 1, 1), Some(1.0), None),       // EUR null
                point(d(2024, 1, 2), Some(2.0), Some(1.8)),  // complete
                // 2024-01-03 has no row at all
            ])
            .await
            .unwrap();

        let missing_eur = store
            .missing_currency_dates(d(2024, 1, 1), d(2024, 1, 3), Currency::Eur)
            .await
            .unwrap();
        // The rowless date is missing_dates territory, not reported here.
        assert_eq!(
            missing_eur.into_iter().collect::<Vec<_>>(),
            vec![d(2024, 1, 1)]
        );

        let missing_usd = store
            .missing_currency_dates(d(2024, 1, 1), d(2024, 1, 3), Currency::Usd)
            .await
            .unwrap();
        assert!(missing_usd.is_empty());
    }
}
