use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::errors::CoreError;
use crate::models::price::{Currency, DateRange, PricePoint};

/// SQLite-backed price table: one row per calendar date, one nullable
/// REAL column per currency.
///
/// Rows are only ever enriched. The upsert merge rule is fill-only:
/// a column is written exactly once — the first successfully fetched
/// value for a date/currency is permanent.
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open (or create) the price database at `path` and ensure the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        // A single connection: SQLite is the only writer here and the
        // fill-only merge must see one serialized row state.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// In-memory database, mainly for tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Idempotently ensure the table and both currency columns exist.
    ///
    /// Databases created before the EUR column existed are migrated
    /// additively — existing USD prices are kept.
    pub async fn init(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kas_prices (
                date TEXT PRIMARY KEY,
                price REAL,
                price_eur REAL
            )",
        )
        .execute(&self.pool)
        .await?;

        let columns = sqlx::query("PRAGMA table_info(kas_prices)")
            .fetch_all(&self.pool)
            .await?;
        let mut has_eur = false;
        for column in &columns {
            if column.try_get::<String, _>("name")? == "price_eur" {
                has_eur = true;
                break;
            }
        }
        if !has_eur {
            info!("migrating kas_prices: adding price_eur column");
            sqlx::query("ALTER TABLE kas_prices ADD COLUMN price_eur REAL")
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// All stored points in the inclusive [start, end] range, ordered by
    /// date. Points carry whichever currencies are populated. An empty
    /// range yields an empty vec, not an error.
    pub async fn range_read(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        if start > end {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT date, price, price_eur FROM kas_prices
             WHERE date >= ? AND date <= ? ORDER BY date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            points.push(PricePoint {
                date: row.try_get("date")?,
                usd: row.try_get("price")?,
                eur: row.try_get("price_eur")?,
            });
        }
        Ok(points)
    }

    /// Insert or enrich rows, one statement per date.
    ///
    /// For an existing row each column is set only if currently NULL:
    /// an incoming null never erases a value and an incoming number never
    /// replaces a different stored number. Re-upserting fully populated
    /// dates is a no-op, so the call is idempotent.
    pub async fn upsert(&self, points: &[PricePoint]) -> Result<(), CoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(
                "INSERT INTO kas_prices (date, price, price_eur) VALUES (?, ?, ?)
                 ON CONFLICT(date) DO UPDATE SET
                     price = COALESCE(price, excluded.price),
                     price_eur = COALESCE(price_eur, excluded.price_eur)",
            )
            .bind(point.date)
            .bind(point.usd)
            .bind(point.eur)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Every date in the inclusive range with no row at all.
    pub async fn missing_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>, CoreError> {
        if start > end {
            return Ok(BTreeSet::new());
        }
        let rows = sqlx::query("SELECT date FROM kas_prices WHERE date >= ? AND date <= ?")
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        let mut existing = BTreeSet::new();
        for row in &rows {
            existing.insert(row.try_get::<NaiveDate, _>("date")?);
        }
        Ok(DateRange::new(start, end)
            .iter()
            .filter(|d| !existing.contains(d))
            .collect())
    }

    /// Every date in range whose row exists but lacks `currency`.
    /// Dates with no row at all are reported only by [`missing_dates`],
    /// never here — there is no row to inspect.
    ///
    /// [`missing_dates`]: PriceStore::missing_dates
    pub async fn missing_currency_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        currency: Currency,
    ) -> Result<BTreeSet<NaiveDate>, CoreError> {
        if start > end {
            return Ok(BTreeSet::new());
        }
        // column() yields a fixed identifier, never user input.
        let sql = format!(
            "SELECT date FROM kas_prices WHERE date >= ? AND date <= ? AND {} IS NULL",
            currency.column()
        );
        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        let mut dates = BTreeSet::new();
        for row in &rows {
            dates.insert(row.try_get::<NaiveDate, _>("date")?);
        }
        Ok(dates)
    }
}
