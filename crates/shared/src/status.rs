//! Status bar presentation of the connection state.

use serde::Serialize;

use crate::domain::ConnectionState;

pub const PRODUCT_LABEL: &str = "PowerAutomation v3.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusIndicator {
    pub icon: &'static str,
    pub color: &'static str,
    pub label: &'static str,
    pub text: String,
    pub tooltip: String,
}

impl StatusIndicator {
    pub fn for_state(state: &ConnectionState) -> Self {
        let (icon, color, label) = match state {
            ConnectionState::Disconnected => ("$(circle-outline)", "#888888", "Disconnected"),
            ConnectionState::Connecting => ("$(sync~spin)", "#ffcc00", "Connecting"),
            ConnectionState::Connected => ("$(check)", "#00ff00", "Connected"),
            ConnectionState::Error(_) => ("$(error)", "#ff0000", "Connection error"),
        };

        let tooltip = match state.error_reason() {
            Some(reason) => format!("{PRODUCT_LABEL} - MCP status: {label}: {reason}"),
            None => format!("{PRODUCT_LABEL} - MCP status: {label}"),
        };

        Self {
            icon,
            color,
            label,
            text: format!("{icon} {PRODUCT_LABEL}"),
            tooltip,
        }
    }
}
