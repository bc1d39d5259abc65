pub mod gaps;
pub mod ledger;
pub mod reconcile_cache;
pub mod reconciler;
