//! `tempero-devicesim` -- development dispenser simulator.
//!
//! Claims itself against the backend (or reuses a saved credential),
//! heartbeats, polls for jobs, simulates execution, and delivers the
//! terminal completion report with retries — the same offline-first
//! behavior as the firmware.
//!
//! # Environment variables
//!
//! | Variable              | Required | Default                  | Description                                   |
//! |-----------------------|----------|--------------------------|-----------------------------------------------|
//! | `API_BASE_URL`        | no       | `http://localhost:3000`  | Backend base URL                              |
//! | `DEVICE_TOKEN`        | no       | --                       | Reuse an existing device credential           |
//! | `CLAIM_CODE`          | yes*     | --                       | Pairing code (*unless `DEVICE_TOKEN` is set)  |
//! | `HARDWARE_UID`        | no       | `sim-<uuid>`             | Simulated hardware identifier                 |
//! | `POLL_INTERVAL_SECS`  | no       | `5`                      | Seconds between job polls                     |
//! | `SIM_ITEM_DELAY_MS`   | no       | `2000`                   | Simulated dispense time per item              |
//! | `SIM_FAIL_SEQUENCES`  | no       | (empty)                  | Comma-separated item sequences that fail      |
//! | `SIM_OFFLINE`         | no       | `false`                  | Skip incremental reports (report only at end) |

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tempero_devicesim::client::ApiClient;
use tempero_devicesim::simulate::{run_items, SimOptions};

/// Default interval between job polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Delay between completion-report retries after a failure.
const REPORT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How many times to retry the completion report before giving up. The
/// backend's idempotency gate makes re-sends safe.
const REPORT_RETRY_ATTEMPTS: usize = 10;

/// Firmware version string advertised by the simulator.
const SIM_FW_VERSION: &str = concat!("sim-", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempero_devicesim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url =
        std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());

    let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

    let options = sim_options_from_env();

    // --- Credential: reuse a token or redeem a claim code ---
    let client = match std::env::var("DEVICE_TOKEN") {
        Ok(token) => ApiClient::new(&base_url).with_token(token),
        Err(_) => {
            let code = std::env::var("CLAIM_CODE").unwrap_or_else(|_| {
                tracing::error!("Either DEVICE_TOKEN or CLAIM_CODE must be set");
                std::process::exit(1);
            });
            let hardware_uid = std::env::var("HARDWARE_UID")
                .unwrap_or_else(|_| format!("sim-{}", uuid::Uuid::new_v4()));

            let mut client = ApiClient::new(&base_url);
            let grant = client
                .redeem_claim(code.trim(), &hardware_uid, SIM_FW_VERSION)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Claim redemption failed");
                    std::process::exit(1);
                });

            tracing::info!(
                device_id = grant.device_id,
                hardware_uid = %hardware_uid,
                heartbeat_interval_secs = grant.heartbeat_interval_secs,
                "Device claimed; set DEVICE_TOKEN to skip claiming next run",
            );
            tracing::info!(device_token = %grant.device_token, "Issued credential");
            client
        }
    };

    tracing::info!(
        base_url = %base_url,
        poll_interval_secs,
        offline = options.offline,
        "Simulator running",
    );

    run_loop(&client, poll_interval_secs, &options).await;
}

/// Parse the simulation knobs from the environment.
fn sim_options_from_env() -> SimOptions {
    let item_delay_ms: u64 = std::env::var("SIM_ITEM_DELAY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2000);

    let fail_sequences: Vec<i16> = std::env::var("SIM_FAIL_SEQUENCES")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let offline = std::env::var("SIM_OFFLINE")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    SimOptions {
        item_delay: Duration::from_millis(item_delay_ms),
        fail_sequences,
        offline,
    }
}

/// Main poll/execute/report loop. Runs until the process is killed.
async fn run_loop(client: &ApiClient, poll_interval_secs: u64, options: &SimOptions) {
    let mut poll = tokio::time::interval(Duration::from_secs(poll_interval_secs));

    loop {
        poll.tick().await;

        if let Err(e) = client
            .heartbeat(serde_json::json!({ "state": "idle", "fw": SIM_FW_VERSION }))
            .await
        {
            tracing::warn!(error = %e, "Heartbeat failed");
            continue;
        }

        let job = match client.next_job().await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Job poll failed");
                continue;
            }
        };

        tracing::info!(job_id = job.id, items = job.items.len(), "Executing job");
        execute_job(client, &job, options).await;
    }
}

/// Execute one job: incremental reports while "connected", then the
/// terminal completion report with retries.
async fn execute_job(
    client: &ApiClient,
    job: &tempero_devicesim::client::AssignedJob,
    options: &SimOptions,
) {
    use tempero_core::settlement::ItemOutcome;

    if options.offline {
        tracing::info!(job_id = job.id, "Offline mode: executing without incremental reports");
        let run = run_items(&job.items, options).await;
        deliver_completion(client, job.id, &run).await;
        return;
    }

    // Connected mode: report each item as it runs, like the firmware does
    // when WiFi holds up. Report failures are tolerated — the completion
    // report is the authoritative settlement either way.
    let mut log = Vec::with_capacity(job.items.len());
    for item in &job.items {
        if let Err(e) = client
            .report_item(job.id, item.sequence, ItemOutcome::Running, None)
            .await
        {
            tracing::warn!(job_id = job.id, sequence = item.sequence, error = %e, "Running report failed");
        }

        let run = run_items(std::slice::from_ref(item), options).await;
        let Some(entry) = run.log.into_iter().next() else {
            continue;
        };

        if let Err(e) = client
            .report_item(job.id, item.sequence, entry.status, entry.error.as_deref())
            .await
        {
            tracing::warn!(job_id = job.id, sequence = item.sequence, error = %e, "Item report failed");
        }

        log.push(entry);
    }

    let items_failed = log
        .iter()
        .filter(|e| e.status == ItemOutcome::Failed)
        .count();
    let run = tempero_devicesim::simulate::SimRun {
        items_completed: log.len() - items_failed,
        items_failed,
        log,
    };
    deliver_completion(client, job.id, &run).await;
}

/// Deliver the completion report, retrying on failure. Duplicate delivery
/// is safe: the backend acknowledges with `already_completed`.
async fn deliver_completion(
    client: &ApiClient,
    job_id: tempero_core::types::DbId,
    run: &tempero_devicesim::simulate::SimRun,
) {
    for attempt in 1..=REPORT_RETRY_ATTEMPTS {
        match client
            .complete_job(job_id, run.items_completed, run.items_failed, &run.log)
            .await
        {
            Ok(ack) => {
                tracing::info!(
                    job_id,
                    status = %ack.status,
                    already_completed = ack.already_completed,
                    "Completion report accepted",
                );
                return;
            }
            Err(e) => {
                tracing::warn!(job_id, attempt, error = %e, "Completion report failed, retrying");
                tokio::time::sleep(REPORT_RETRY_DELAY).await;
            }
        }
    }

    tracing::error!(job_id, "Completion report abandoned after retries");
}
