//! Minimal HTTP client for the device-facing API surface.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::json;
use tempero_core::settlement::{ExecutionLogEntry, ItemOutcome};
use tempero_core::types::DbId;

/// `{ "data": ... }` envelope used by every API response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Claim redemption payload returned by `POST /devices/claim`.
#[derive(Debug, Deserialize)]
pub struct ClaimGrant {
    pub device_token: String,
    pub device_id: DbId,
    pub heartbeat_interval_secs: u64,
}

/// One dispense step of an assigned job.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignedItem {
    pub sequence: i16,
    pub reservoir_slot: i16,
    pub label: String,
    pub quantity_grams: f64,
    pub duration_seconds: f64,
}

/// A job as handed out by `GET /devices/me/jobs/next`.
#[derive(Debug, Deserialize)]
pub struct AssignedJob {
    pub id: DbId,
    pub items: Vec<AssignedItem>,
}

/// Acknowledgment of a terminal completion report.
#[derive(Debug, Deserialize)]
pub struct CompletionAck {
    pub already_completed: bool,
    pub status: String,
}

/// Device-side API client holding the base URL and device credential.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client without a credential (pre-claim).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Use an already-issued device credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> anyhow::Result<&str> {
        self.token
            .as_deref()
            .context("No device credential; redeem a claim code first")
    }

    /// Redeem a pairing code. On success the credential is stored on the
    /// client and also returned for persistence.
    pub async fn redeem_claim(
        &mut self,
        code: &str,
        hardware_uid: &str,
        fw_version: &str,
    ) -> anyhow::Result<ClaimGrant> {
        let response = self
            .http
            .post(self.url("/devices/claim"))
            .json(&json!({
                "code": code,
                "hardware_uid": hardware_uid,
                "fw_version": fw_version,
            }))
            .send()
            .await
            .context("Claim request failed")?;

        if !response.status().is_success() {
            bail!("Claim rejected: HTTP {}", response.status());
        }

        let grant: Envelope<ClaimGrant> =
            response.json().await.context("Malformed claim response")?;
        self.token = Some(grant.data.device_token.clone());
        Ok(grant.data)
    }

    /// Send a heartbeat with the current simulator status.
    pub async fn heartbeat(&self, status: serde_json::Value) -> anyhow::Result<()> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url("/devices/me/heartbeat"))
            .bearer_auth(token)
            .json(&json!({ "status": status }))
            .send()
            .await
            .context("Heartbeat request failed")?;

        if !response.status().is_success() {
            bail!("Heartbeat rejected: HTTP {}", response.status());
        }
        Ok(())
    }

    /// Poll for the next queued job; `None` when the queue is empty.
    pub async fn next_job(&self) -> anyhow::Result<Option<AssignedJob>> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url("/devices/me/jobs/next"))
            .bearer_auth(token)
            .send()
            .await
            .context("Job poll failed")?;

        if !response.status().is_success() {
            bail!("Job poll rejected: HTTP {}", response.status());
        }

        let job: Envelope<Option<AssignedJob>> =
            response.json().await.context("Malformed job response")?;
        Ok(job.data)
    }

    /// Send one incremental per-item status report.
    pub async fn report_item(
        &self,
        job_id: DbId,
        sequence: i16,
        status: ItemOutcome,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url(&format!("/devices/me/jobs/{job_id}/report")))
            .bearer_auth(token)
            .json(&json!({
                "sequence": sequence,
                "status": status,
                "error": error,
            }))
            .send()
            .await
            .context("Item report failed")?;

        if !response.status().is_success() {
            bail!("Item report rejected: HTTP {}", response.status());
        }
        Ok(())
    }

    /// Deliver the terminal completion report.
    pub async fn complete_job(
        &self,
        job_id: DbId,
        items_completed: usize,
        items_failed: usize,
        log: &[ExecutionLogEntry],
    ) -> anyhow::Result<CompletionAck> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url(&format!("/devices/me/jobs/{job_id}/complete")))
            .bearer_auth(token)
            .json(&json!({
                "items_completed": items_completed,
                "items_failed": items_failed,
                "execution_log": log,
            }))
            .send()
            .await
            .context("Completion report failed")?;

        if !response.status().is_success() {
            bail!("Completion report rejected: HTTP {}", response.status());
        }

        let ack: Envelope<CompletionAck> = response
            .json()
            .await
            .context("Malformed completion response")?;
        Ok(ack.data)
    }
}
