use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::price::{Currency, DateRange, PricePoint};

/// Dates inside a requested range that still need a fetch for one
/// currency, partitioned by why.
///
/// Both partitions are fetched the same way; the split only matters for
/// diagnostics and because "absent" is shared by all currencies while
/// "unpriced" is currency-specific.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapSet {
    /// No row exists for the date at all.
    pub absent: BTreeSet<NaiveDate>,
    /// A row exists but this currency's column is null.
    pub unpriced: BTreeSet<NaiveDate>,
}

impl GapSet {
    pub fn is_empty(&self) -> bool {
        self.absent.is_empty() && self.unpriced.is_empty()
    }

    /// All dates needing a fetch, in ascending order.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.absent.union(&self.unpriced).copied().collect()
    }

    /// Minimal contiguous [min, max] range covering every needed date.
    /// Providers fetch contiguous ranges, not sparse date sets — any
    /// date inside the bounds gets re-fetched, which is harmless under
    /// the store's fill-only merge.
    pub fn fetch_bounds(&self) -> Option<DateRange> {
        let dates = self.dates();
        let first = *dates.first()?;
        let last = *dates.last()?;
        Some(DateRange::new(first, last))
    }
}

/// Compute the gap set for one currency over a range-read snapshot.
///
/// Pure: equivalent to the store's `missing_dates` ∪
/// `missing_currency_dates`, but computed from the snapshot the
/// reconciler already holds.
pub fn currency_gaps(range: DateRange, snapshot: &[PricePoint], currency: Currency) -> GapSet {
    let by_date: BTreeMap<NaiveDate, &PricePoint> =
        snapshot.iter().map(|p| (p.date, p)).collect();

    let mut gaps = GapSet::default();
    for date in range.iter() {
        match by_date.get(&date) {
            None => {
                gaps.absent.insert(date);
            }
            Some(point) if point.get(currency).is_none() => {
                gaps.unpriced.insert(date);
            }
            Some(_) => {}
        }
    }
    gaps
}
