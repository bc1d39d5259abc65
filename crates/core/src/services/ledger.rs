use chrono::{DateTime, NaiveDate, Utc};

use crate::models::price::{DateRange, PricePoint};
use crate::models::transaction::{LedgerEntry, ReportRow, Transaction, SOMPI_PER_KAS};

/// Net balance change of `tx` for `address`, in sompi.
///
/// Outputs paying the address count as received; inputs spending its
/// previous outpoints count as sent.
pub fn net_amount_sompi(tx: &Transaction, address: &str) -> i64 {
    let sent: u64 = tx
        .inputs
        .iter()
        .filter(|i| i.previous_outpoint_address.as_deref() == Some(address))
        .map(|i| i.previous_outpoint_amount.unwrap_or(0))
        .sum();
    let received: u64 = tx
        .outputs
        .iter()
        .filter(|o| o.script_public_key_address.as_deref() == Some(address))
        .map(|o| o.amount)
        .sum();
    received as i64 - sent as i64
}

/// Same, converted to KAS.
pub fn net_amount_kas(tx: &Transaction, address: &str) -> f64 {
    net_amount_sompi(tx, address) as f64 / SOMPI_PER_KAS
}

/// Fold transactions into a running-balance ledger for one address.
///
/// Entries are ordered by block time ascending. Transactions without a
/// block time are not yet accepted and are skipped. Zero-net
/// transactions (the address only paying itself change) move no balance
/// and are skipped as well.
pub fn build_ledger(transactions: &[Transaction], address: &str) -> Vec<LedgerEntry> {
    let mut raw: Vec<(i64, Option<String>, i64)> = transactions
        .iter()
        .filter_map(|tx| {
            let ts = tx.block_time?;
            let net = net_amount_sompi(tx, address);
            if net == 0 {
                return None;
            }
            Some((ts, tx.transaction_id.clone(), net))
        })
        .collect();
    raw.sort_by_key(|(ts, _, _)| *ts);

    let mut balance = 0.0;
    let mut entries = Vec::with_capacity(raw.len());
    for (ts, transaction_id, net_sompi) in raw {
        let net_kas = net_sompi as f64 / SOMPI_PER_KAS;
        balance += net_kas;
        let Some(date) = DateTime::from_timestamp_millis(ts).map(|dt| dt.date_naive()) else {
            continue;
        };
        entries.push(LedgerEntry {
            date,
            timestamp_ms: ts,
            transaction_id,
            net_kas,
            sent_kas: (net_kas < 0.0).then(|| -net_kas),
            received_kas: (net_kas > 0.0).then_some(net_kas),
            balance_kas: balance,
        });
    }
    entries
}

/// Date range the price history must cover for these transactions:
/// first accepted transaction's date through today. `None` when no
/// transaction carries a block time.
pub fn tracked_range(transactions: &[Transaction]) -> Option<DateRange> {
    let first = transactions
        .iter()
        .filter_map(Transaction::block_date)
        .min()?;
    Some(DateRange::new(first, Utc::now().date_naive()))
}

/// Join each ledger entry with the nearest-dated price point and value
/// the balance in each currency where a price is known.
///
/// `points` must be sorted by date ascending, as the store returns them.
pub fn build_report(ledger: &[LedgerEntry], points: &[PricePoint]) -> Vec<ReportRow> {
    ledger
        .iter()
        .map(|entry| {
            let point = nearest_point(points, entry.date);
            let price_usd = point.and_then(|p| p.usd);
            let price_eur = point.and_then(|p| p.eur);
            ReportRow {
                date: entry.date,
                timestamp_ms: entry.timestamp_ms,
                transaction_id: entry.transaction_id.clone(),
                sent_kas: entry.sent_kas,
                received_kas: entry.received_kas,
                balance_kas: entry.balance_kas,
                price_usd,
                price_eur,
                value_usd: price_usd.map(|p| p * entry.balance_kas),
                value_eur: price_eur.map(|p| p * entry.balance_kas),
            }
        })
        .collect()
}

/// The point dated closest to `date`; the earlier one wins a tie.
fn nearest_point(points: &[PricePoint], date: NaiveDate) -> Option<&PricePoint> {
    if points.is_empty() {
        return None;
    }
    match points.binary_search_by_key(&date, |p| p.date) {
        Ok(idx) => Some(&points[idx]),
        Err(idx) => {
            let before = idx.checked_sub(1).map(|i| &points[i]);
            let after = points.get(idx);
            match (before, after) {
                (Some(b), Some(a)) => {
                    let to_before = (date - b.date).num_days();
                    let to_after = (a.date - date).num_days();
                    if to_before <= to_after {
                        Some(b)
                    } else {
                        Some(a)
                    }
                }
                (Some(b), None) => Some(b),
                (None, Some(a)) => Some(a),
                (None, None) => None,
            }
        }
    }
}
