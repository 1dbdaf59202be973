//! One-way notifications between the overlay and the surrounding shell.

use crate::send_event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const CONFIG_UPDATED_EVENT: &str = "config_updated";
pub const HOST_LOG_EVENT: &str = "host_log";
pub const ELEMENT_INSPECTED_EVENT: &str = "element_inspected";
pub const PRESENTATION_ALERT_EVENT: &str = "presentation_alert";
pub const FULLSCREEN_EVENT: &str = "fullscreen_requested";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostLog {
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSignal {
    Started,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullscreenRequest {
    pub enabled: bool,
}

/// Fire-and-forget log line for the shell. Never fails, never blocks.
pub fn emit_host_log(message: impl Into<String>) {
    let log = HostLog {
        message: message.into(),
        at: Utc::now(),
    };
    if let Err(err) = send_event(HOST_LOG_EVENT, log) {
        debug!(error = %err, "failed to emit host log");
    }
}

pub fn emit_alert_signal(signal: AlertSignal) {
    if let Err(err) = send_event(PRESENTATION_ALERT_EVENT, signal) {
        debug!(error = %err, "failed to emit alert signal");
    }
}

pub fn request_fullscreen(enabled: bool) {
    if let Err(err) = send_event(FULLSCREEN_EVENT, FullscreenRequest { enabled }) {
        debug!(error = %err, "failed to emit fullscreen request");
    }
}

pub fn emit_element_inspected(info: Value) {
    if let Err(err) = send_event(ELEMENT_INSPECTED_EVENT, info) {
        debug!(error = %err, "failed to emit element inspection");
    }
}

/// Push a full configuration snapshot to every subscriber.
pub fn publish_config<T: Serialize>(config: &T) -> anyhow::Result<()> {
    send_event(CONFIG_UPDATED_EVENT, config)
}
