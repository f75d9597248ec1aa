//! Discord-compatible webhook reporter

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rejoin_api::{InstanceStatus, StatusSnapshot};
use rejoin_host_api::{ReportError, ReportResult, Reporter};
use rejoin_util::{format_clock_time, format_datetime_full};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::metrics::HostMetrics;
use crate::screenshot::capture_screenshot;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Discord rejects field values longer than this
const FIELD_VALUE_LIMIT: usize = 1024;

const COLOR_HEALTHY: u32 = 0x2ECC71;
const COLOR_DEGRADED: u32 = 0xE67E22;
const COLOR_DOWN: u32 = 0xE74C3C;

/// Posts status snapshots to a webhook as an embed
pub struct WebhookReporter {
    client: Client,
    url: String,
    device_name: String,
    screenshot_path: Option<PathBuf>,
}

impl WebhookReporter {
    /// `screenshot_path` enables best-effort screenshot attachments.
    pub fn new(
        url: impl Into<String>,
        device_name: impl Into<String>,
        screenshot_path: Option<PathBuf>,
    ) -> ReportResult<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            device_name: device_name.into(),
            screenshot_path,
        })
    }

    async fn send(&self, payload: &Value, screenshot: Option<&PathBuf>) -> ReportResult<()> {
        let request = match screenshot {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ReportError::Serialization(format!("screenshot: {}", e)))?;
                let file = Part::bytes(bytes)
                    .file_name("screenshot.png")
                    .mime_str("image/png")
                    .map_err(|e| ReportError::Serialization(e.to_string()))?;
                let form = Form::new()
                    .text("payload_json", payload.to_string())
                    .part("file", file);
                self.client.post(&self.url).multipart(form)
            }
            None => self.client.post(&self.url).json(payload),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        match resp.status().as_u16() {
            200 | 204 => Ok(()),
            status => Err(ReportError::Server { status }),
        }
    }
}

#[async_trait]
impl Reporter for WebhookReporter {
    async fn report(&self, snapshot: &StatusSnapshot) -> ReportResult<()> {
        let metrics = HostMetrics::collect().await;
        let payload = build_payload(snapshot, &metrics, &self.device_name);

        let screenshot = match &self.screenshot_path {
            Some(path) => capture_screenshot(path).await,
            None => None,
        };

        let result = match self.send(&payload, screenshot.as_ref()).await {
            Err(ReportError::Serialization(message)) if screenshot.is_some() => {
                warn!(error = %message, "Screenshot unusable, sending report without it");
                self.send(&payload, None).await
            }
            other => other,
        };

        if let Some(path) = &screenshot
            && let Err(e) = tokio::fs::remove_file(path).await
        {
            debug!(path = %path.display(), error = %e, "Failed to remove screenshot");
        }

        result?;
        info!(
            instances = snapshot.instances.len(),
            healthy = snapshot.healthy_count(),
            "Status report sent"
        );
        Ok(())
    }
}

/// Embed color for a snapshot
pub fn snapshot_color(snapshot: &StatusSnapshot) -> u32 {
    if snapshot.all_healthy() {
        COLOR_HEALTHY
    } else if snapshot.healthy_count() > 0 {
        COLOR_DEGRADED
    } else {
        COLOR_DOWN
    }
}

/// One report line for an instance
pub fn instance_line(index: usize, status: &InstanceStatus) -> String {
    let checked = status
        .last_checked_at
        .as_ref()
        .map(format_clock_time)
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "{}. {} ({}) - {} | {} | {}",
        index,
        status.label,
        status.masked_account,
        status.status,
        status.detail,
        checked
    )
}

fn truncate_field(value: String) -> String {
    // Leave room for the code fence
    let limit = FIELD_VALUE_LIMIT - 6;
    if value.chars().count() <= limit {
        return value;
    }
    let keep = limit - 4;
    let mut out: String = value.chars().take(keep).collect();
    out.push_str("\n...");
    out
}

fn code_block(value: &str) -> String {
    format!("```{}```", value)
}

/// Build the webhook JSON payload
pub fn build_payload(snapshot: &StatusSnapshot, metrics: &HostMetrics, device_name: &str) -> Value {
    let instances = if snapshot.instances.is_empty() {
        "No instances".to_string()
    } else {
        snapshot
            .instances
            .iter()
            .enumerate()
            .map(|(i, s)| instance_line(i + 1, s))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let running_name = format!(
        "Running Instances ({}/{})",
        snapshot.healthy_count(),
        snapshot.instances.len()
    );

    json!({
        "username": "rejoind",
        "embeds": [{
            "title": "System Status",
            "description": format!("Report for **{}**", device_name),
            "color": snapshot_color(snapshot),
            "fields": [
                { "name": "CPU Usage", "value": code_block(&metrics.cpu_line()), "inline": true },
                { "name": "Memory Usage", "value": code_block(&metrics.memory_line()), "inline": true },
                { "name": "Disk Usage", "value": code_block(&metrics.disk_line()), "inline": true },
                { "name": "Uptime", "value": code_block(&metrics.uptime_line()), "inline": true },
                {
                    "name": "Last Update",
                    "value": code_block(&format_datetime_full(&snapshot.taken_at)),
                    "inline": true
                },
                { "name": running_name, "value": code_block(&truncate_field(instances)), "inline": false },
            ],
            "footer": { "text": format!("run {}", snapshot.run_id) },
            "timestamp": snapshot
                .taken_at
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }],
    })
}
