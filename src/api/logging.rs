use crate::error::FrameDecodeError;
use crate::util::{env_flag, non_empty_env};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PATH: &str = "/tmp/panelstream.log";
const DEBUG_PAYLOAD_ENV: &str = "PANELSTREAM_DEBUG_PAYLOAD";
const LOG_PATH_ENV: &str = "PANELSTREAM_LOG_PATH";
const LOG_FILTER_ENV: &str = "PANELSTREAM_LOG";

pub fn debug_payload_enabled() -> bool {
    env_flag(DEBUG_PAYLOAD_ENV)
}

pub fn emit_debug_payload<T: Serialize>(request_url: &str, payload: &T) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(
        target: "panelstream::api",
        url = request_url,
        payload = %formatted_payload,
        "generation request"
    );
}

pub fn emit_frame_decode_error(error: &FrameDecodeError) {
    let data = error.payload();
    match error {
        FrameDecodeError::InvalidJson { .. } => {
            tracing::warn!(target: "panelstream::api", %error, data, "skipping frame");
        }
        FrameDecodeError::MissingContent { .. } => {
            tracing::debug!(target: "panelstream::api", data, "frame carries no content");
        }
    }
}

/// Installs the global subscriber. The TUI owns the terminal, so output goes
/// to a file whenever stderr is interactive.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true);

    let installed = match resolve_log_path() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}

fn resolve_log_path() -> Option<String> {
    non_empty_env(LOG_PATH_ENV).or_else(|| {
        if std::io::stderr().is_terminal() {
            Some(DEFAULT_LOG_PATH.to_string())
        } else {
            None
        }
    })
}
