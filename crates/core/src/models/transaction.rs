use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Smallest Kaspa unit: 1 KAS = 100,000,000 sompi.
pub const SOMPI_PER_KAS: f64 = 100_000_000.0;

// ── Kaspa REST API wire types ───────────────────────────────────────
//
// Shape of one entry in the `/addresses/{address}/full-transactions`
// response. Only the fields the ledger fold needs are kept.

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub transaction_id: Option<String>,
    /// Block timestamp in milliseconds. Transactions without one are
    /// not yet accepted and are skipped.
    pub block_time: Option<i64>,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxInput {
    pub previous_outpoint_address: Option<String>,
    /// Sompi spent from the outpoint. Absent when outpoints were not resolved.
    #[serde(default)]
    pub previous_outpoint_amount: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxOutput {
    pub script_public_key_address: Option<String>,
    #[serde(default)]
    pub amount: u64,
}

impl Transaction {
    /// Calendar date of the block timestamp (UTC), if accepted.
    pub fn block_date(&self) -> Option<NaiveDate> {
        self.block_time
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive())
    }
}

// ── Ledger rows ─────────────────────────────────────────────────────

/// One balance-affecting transaction after the ledger fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub timestamp_ms: i64,
    pub transaction_id: Option<String>,
    /// Signed balance change in KAS.
    pub net_kas: f64,
    /// Populated when the net change is negative.
    pub sent_kas: Option<f64>,
    /// Populated when the net change is positive.
    pub received_kas: Option<f64>,
    /// Running balance after this transaction.
    pub balance_kas: f64,
}

/// A ledger entry joined with the nearest known price point.
/// Missing prices stay absent — a value is never reported as zero
/// just because the price was unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub timestamp_ms: i64,
    pub transaction_id: Option<String>,
    pub sent_kas: Option<f64>,
    pub received_kas: Option<f64>,
    pub balance_kas: f64,
    pub price_usd: Option<f64>,
    pub price_eur: Option<f64>,
    pub value_usd: Option<f64>,
    pub value_eur: Option<f64>,
}
