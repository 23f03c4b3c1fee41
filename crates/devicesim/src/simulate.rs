//! Job execution simulation with injectable failures.

use std::time::Duration;

use tempero_core::settlement::{ExecutionLogEntry, ItemOutcome};

use crate::client::AssignedItem;

/// Knobs for one simulated execution run.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Fixed "dispense" time per item. Zero in tests.
    pub item_delay: Duration,
    /// Item sequences that fail with a simulated motor timeout.
    pub fail_sequences: Vec<i16>,
    /// When true, no incremental reports are sent — the run behaves like
    /// a device that lost connectivity and only delivers the final report.
    pub offline: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(2000),
            fail_sequences: Vec::new(),
            offline: false,
        }
    }
}

/// Outcome of a simulated run: the execution log plus outcome counters.
#[derive(Debug)]
pub struct SimRun {
    pub items_completed: usize,
    pub items_failed: usize,
    pub log: Vec<ExecutionLogEntry>,
}

/// Execute every item in sequence order, sleeping `item_delay` per item
/// and failing the configured sequences.
pub async fn run_items(items: &[AssignedItem], options: &SimOptions) -> SimRun {
    let mut log = Vec::with_capacity(items.len());

    for item in items {
        if !options.item_delay.is_zero() {
            tokio::time::sleep(options.item_delay).await;
        }

        let failed = options.fail_sequences.contains(&item.sequence);
        let (status, error) = if failed {
            (
                ItemOutcome::Failed,
                Some("Motor timeout: dispense exceeded 180s".to_string()),
            )
        } else {
            (ItemOutcome::Done, None)
        };

        tracing::info!(
            sequence = item.sequence,
            slot = item.reservoir_slot,
            label = %item.label,
            grams = item.quantity_grams,
            outcome = if failed { "failed" } else { "done" },
            "Simulated dispense",
        );

        log.push(ExecutionLogEntry {
            reservoir_slot: item.reservoir_slot,
            label: item.label.clone(),
            quantity_grams: item.quantity_grams,
            seconds: item.duration_seconds,
            status,
            error,
        });
    }

    let items_failed = log
        .iter()
        .filter(|e| e.status == ItemOutcome::Failed)
        .count();
    SimRun {
        items_completed: log.len() - items_failed,
        items_failed,
        log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sequence: i16, slot: i16, grams: f64) -> AssignedItem {
        AssignedItem {
            sequence,
            reservoir_slot: slot,
            label: "sal".into(),
            quantity_grams: grams,
            duration_seconds: grams / 5.0,
        }
    }

    fn instant_options(fail_sequences: Vec<i16>) -> SimOptions {
        SimOptions {
            item_delay: Duration::ZERO,
            fail_sequences,
            offline: false,
        }
    }

    #[tokio::test]
    async fn all_items_succeed_by_default() {
        let items = vec![item(1, 1, 10.0), item(2, 2, 20.0)];

        let run = run_items(&items, &instant_options(vec![])).await;

        assert_eq!(run.items_completed, 2);
        assert_eq!(run.items_failed, 0);
        assert!(run.log.iter().all(|e| e.status == ItemOutcome::Done));
    }

    #[tokio::test]
    async fn injected_failures_show_up_in_log_and_counters() {
        let items = vec![item(1, 1, 10.0), item(2, 2, 20.0), item(3, 3, 30.0)];

        let run = run_items(&items, &instant_options(vec![2])).await;

        assert_eq!(run.items_completed, 2);
        assert_eq!(run.items_failed, 1);
        assert_eq!(run.log[1].status, ItemOutcome::Failed);
        assert!(run.log[1].error.as_deref().unwrap().contains("timeout"));
        assert_eq!(run.log[0].status, ItemOutcome::Done);
        assert_eq!(run.log[2].status, ItemOutcome::Done);
    }

    #[tokio::test]
    async fn log_preserves_item_order_and_quantities() {
        let items = vec![item(1, 4, 7.5), item(2, 1, 2.5)];

        let run = run_items(&items, &instant_options(vec![])).await;

        assert_eq!(run.log.len(), 2);
        assert_eq!(run.log[0].reservoir_slot, 4);
        assert!((run.log[0].quantity_grams - 7.5).abs() < 1e-9);
        assert_eq!(run.log[1].reservoir_slot, 1);
        assert!((run.log[1].quantity_grams - 2.5).abs() < 1e-9);
    }
}
