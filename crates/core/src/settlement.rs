//! Inventory settlement for terminal completion reports.
//!
//! A device reports one execution log entry per job item. Settlement sums
//! dispensed grams per reservoir slot over entries that actually completed
//! ("done"); failed entries contribute nothing. Arrival order is irrelevant
//! to the sums. Stock is clamped at a floor of zero so an over-reporting
//! device can never drive inventory negative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-item execution outcome as reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    Running,
    Done,
    Failed,
}

/// One entry of a device's execution log: which reservoir ran, what it
/// dispensed, for how long, and how it ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub reservoir_slot: i16,
    pub label: String,
    pub quantity_grams: f64,
    pub seconds: f64,
    pub status: ItemOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sum dispensed grams per reservoir slot over "done" entries only.
///
/// The result is ordered by slot; entries with other outcomes contribute
/// zero regardless of their reported quantity.
pub fn deduct_per_slot(log: &[ExecutionLogEntry]) -> BTreeMap<i16, f64> {
    let mut totals = BTreeMap::new();
    for entry in log {
        if entry.status == ItemOutcome::Done {
            *totals.entry(entry.reservoir_slot).or_insert(0.0) += entry.quantity_grams;
        }
    }
    totals
}

/// New stock level after deducting `grams`, clamped at zero.
pub fn clamp_stock(stock_grams: f64, grams: f64) -> f64 {
    (stock_grams - grams).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(slot: i16, grams: f64, status: ItemOutcome) -> ExecutionLogEntry {
        ExecutionLogEntry {
            reservoir_slot: slot,
            label: "sal".into(),
            quantity_grams: grams,
            seconds: 1.0,
            status,
            error: None,
        }
    }

    #[test]
    fn failed_entries_contribute_zero() {
        let log = vec![
            entry(1, 10.0, ItemOutcome::Done),
            entry(2, 99.0, ItemOutcome::Failed),
        ];

        let totals = deduct_per_slot(&log);

        assert!((totals[&1] - 10.0).abs() < 1e-9);
        assert!(!totals.contains_key(&2));
    }

    #[test]
    fn sums_are_independent_of_entry_order() {
        let forward = vec![
            entry(1, 5.0, ItemOutcome::Done),
            entry(2, 3.0, ItemOutcome::Done),
            entry(1, 2.5, ItemOutcome::Done),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(deduct_per_slot(&forward), deduct_per_slot(&reversed));
    }

    #[test]
    fn same_slot_entries_accumulate() {
        let log = vec![
            entry(3, 4.0, ItemOutcome::Done),
            entry(3, 6.0, ItemOutcome::Done),
        ];

        let totals = deduct_per_slot(&log);

        assert!((totals[&3] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_never_goes_negative() {
        assert_eq!(clamp_stock(5.0, 20.0), 0.0);
        assert!((clamp_stock(20.0, 5.0) - 15.0).abs() < 1e-9);
        assert_eq!(clamp_stock(0.0, 1.0), 0.0);
    }

    #[test]
    fn two_done_one_failed_deducts_only_done_grams() {
        // Mirrors the partial-completion flow: 2 done + 1 failed.
        let log = vec![
            entry(1, 10.0, ItemOutcome::Done),
            entry(2, 20.0, ItemOutcome::Done),
            entry(3, 30.0, ItemOutcome::Failed),
        ];

        let totals = deduct_per_slot(&log);

        let deducted: f64 = totals.values().sum();
        assert!((deducted - 30.0).abs() < 1e-9);
        assert!(!totals.contains_key(&3));
    }

    #[test]
    fn wire_format_round_trips_lowercase_status() {
        let json = r#"{"reservoir_slot":1,"label":"sal","quantity_grams":5.0,"seconds":1.0,"status":"done"}"#;
        let parsed: ExecutionLogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.status, ItemOutcome::Done);
        assert!(parsed.error.is_none());

        let failed = ExecutionLogEntry {
            error: Some("timeout".into()),
            status: ItemOutcome::Failed,
            ..parsed
        };
        let out = serde_json::to_value(&failed).unwrap();
        assert_eq!(out["status"], "failed");
        assert_eq!(out["error"], "timeout");
    }
}
