use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::HandshakeTimings;
use serde::Deserialize;
use shared::domain::ConnectionConfig;

pub const DEFAULT_SETTINGS_FILE: &str = "desktop.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mcp_endpoint: String,
    pub api_key: String,
    pub auto_connect: bool,
    /// Compact status output; flipped at runtime by the `mode` command.
    pub minimal_mode: bool,
    pub auto_connect_delay_ms: u64,
    pub stage_timeout_ms: Option<u64>,
    pub validate_ms: u64,
    pub establish_ms: u64,
    pub register_ms: u64,
    pub heartbeat_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let timings = HandshakeTimings::default();
        Self {
            mcp_endpoint: "http://localhost:8080/mcp/v3".into(),
            api_key: String::new(),
            auto_connect: true,
            minimal_mode: false,
            auto_connect_delay_ms: 2000,
            stage_timeout_ms: Some(10_000),
            validate_ms: timings.validate.as_millis() as u64,
            establish_ms: timings.establish.as_millis() as u64,
            register_ms: timings.register.as_millis() as u64,
            heartbeat_ms: timings.heartbeat.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.mcp_endpoint.trim(), self.api_key.trim())
    }

    pub fn timings(&self) -> HandshakeTimings {
        HandshakeTimings {
            validate: Duration::from_millis(self.validate_ms),
            establish: Duration::from_millis(self.establish_ms),
            register: Duration::from_millis(self.register_ms),
            heartbeat: Duration::from_millis(self.heartbeat_ms),
        }
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn auto_connect_delay(&self) -> Duration {
        Duration::from_millis(self.auto_connect_delay_ms)
    }
}

/// Reads `path` if it exists, then applies environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MCP_ENDPOINT") {
        settings.mcp_endpoint = v;
    }
    if let Some(v) = lookup("APP__MCP_ENDPOINT") {
        settings.mcp_endpoint = v;
    }

    if let Some(v) = lookup("MCP_API_KEY") {
        settings.api_key = v;
    }
    if let Some(v) = lookup("APP__API_KEY") {
        settings.api_key = v;
    }

    if let Some(v) = lookup("APP__AUTO_CONNECT") {
        if let Some(parsed) = parse_bool(&v) {
            settings.auto_connect = parsed;
        }
    }

    if let Some(v) = lookup("APP__MINIMAL_MODE") {
        if let Some(parsed) = parse_bool(&v) {
            settings.minimal_mode = parsed;
        }
    }

    if let Some(v) = lookup("APP__STAGE_TIMEOUT_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.stage_timeout_ms = (parsed > 0).then_some(parsed);
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
