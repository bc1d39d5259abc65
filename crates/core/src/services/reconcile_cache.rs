use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::price::{Currency, DateRange};
use crate::providers::registry::ProviderChoice;
use crate::services::reconciler::Reconciliation;

type CacheKey = (DateRange, Vec<Currency>, ProviderChoice);

/// Short-lived memo of reconciliation results, keyed by
/// (range, currency set, provider).
///
/// A repeat invocation inside the TTL window performs zero upstream
/// fetches and zero store reads. Purely an optimization: correctness
/// never depends on it, since the reconciler itself is idempotent.
pub struct ReconcileCache {
    ttl: Duration,
    entries: HashMap<CacheKey, (Instant, Reconciliation)>,
}

impl ReconcileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn key(range: DateRange, currencies: &[Currency], choice: ProviderChoice) -> CacheKey {
        let mut set = currencies.to_vec();
        set.sort();
        set.dedup();
        (range, set, choice)
    }

    /// A still-fresh result for this exact request, if any.
    pub fn get(
        &self,
        range: DateRange,
        currencies: &[Currency],
        choice: ProviderChoice,
    ) -> Option<Reconciliation> {
        let (stored_at, result) = self.entries.get(&Self::key(range, currencies, choice))?;
        if stored_at.elapsed() < self.ttl {
            Some(result.clone())
        } else {
            None
        }
    }

    pub fn put(
        &mut self,
        range: DateRange,
        currencies: &[Currency],
        choice: ProviderChoice,
        result: &Reconciliation,
    ) {
        let ttl = self.ttl;
        self.entries.retain(|_, (at, _)| at.elapsed() < ttl);
        self.entries.insert(
            Self::key(range, currencies, choice),
            (Instant::now(), result.clone()),
        );
    }

    /// Number of memoized results, including any not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
