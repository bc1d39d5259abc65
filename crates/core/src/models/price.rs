use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote currencies tracked by the price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
}

impl Currency {
    /// All tracked currencies, in column order.
    pub const ALL: [Currency; 2] = [Currency::Usd, Currency::Eur];

    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Lowercase form used by provider query parameters.
    pub fn vs_currency(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
        }
    }

    /// Column holding this currency's value in the price table.
    pub fn column(&self) -> &'static str {
        match self {
            Currency::Usd => "price",
            Currency::Eur => "price_eur",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One calendar date's known price(s).
///
/// At most one point exists per date. A point may carry only one currency;
/// it is never deleted, only enriched — `None` means "not fetched yet",
/// never "zero". A zero price is not a valid value in this domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub usd: Option<f64>,
    pub eur: Option<f64>,
}

impl PricePoint {
    /// A point for `date` with no currency populated yet.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            usd: None,
            eur: None,
        }
    }

    pub fn get(&self, currency: Currency) -> Option<f64> {
        match currency {
            Currency::Usd => self.usd,
            Currency::Eur => self.eur,
        }
    }

    pub fn set(&mut self, currency: Currency, value: Option<f64>) {
        match currency {
            Currency::Usd => self.usd = value,
            Currency::Eur => self.eur = value,
        }
    }

    /// Populate `currency` only if it is currently absent.
    pub fn fill_missing(&mut self, currency: Currency, price: f64) {
        if self.get(currency).is_none() {
            self.set(currency, Some(price));
        }
    }

    /// Whether every tracked currency is populated.
    pub fn is_complete(&self) -> bool {
        Currency::ALL.iter().all(|&c| self.get(c).is_some())
    }
}

/// A (date, price, currency) triple as returned by a provider adapter.
/// Knows nothing about persisted state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderQuote {
    pub date: NaiveDate,
    pub price: f64,
    pub currency: Currency,
}

/// An inclusive [start, end] pair of calendar dates.
///
/// The range may be empty (start > end), e.g. after clamping against a
/// provider's depth ceiling; an empty range fetches and iterates nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, inclusive. Zero when empty.
    pub fn num_days(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() + 1
        }
    }

    /// Narrow the range so it starts no earlier than `floor`.
    /// May produce an empty range when the whole range predates `floor`.
    pub fn clamp_start(&self, floor: NaiveDate) -> DateRange {
        DateRange {
            start: self.start.max(floor),
            end: self.end,
        }
    }

    /// Iterate every date in the range in ascending order.
    pub fn iter(&self) -> DateRangeIter {
        DateRangeIter {
            next: if self.is_empty() { None } else { Some(self.start) },
            end: self.end,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

pub struct DateRangeIter {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DateRangeIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        if current > self.end {
            self.next = None;
            return None;
        }
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }
}
