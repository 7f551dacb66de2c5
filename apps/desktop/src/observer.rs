//! Terminal stand-in for the editor's status bar and output channel.

use std::sync::Mutex;

use client_core::ConnectionObserver;
use shared::{domain::ConnectionState, status::StatusIndicator};
use tracing::{error, info};

pub fn render_status_line(state: &ConnectionState) -> String {
    let indicator = StatusIndicator::for_state(state);
    format!("[{}] {} | {}", indicator.color, indicator.text, indicator.tooltip)
}

#[derive(Default)]
pub struct StatusBarObserver {
    last_line: Mutex<Option<String>>,
}

impl StatusBarObserver {
    #[cfg(test)]
    pub fn last_line(&self) -> Option<String> {
        self.last_line
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ConnectionObserver for StatusBarObserver {
    fn on_state_change(&self, state: &ConnectionState) {
        match state {
            ConnectionState::Error(reason) => error!(%reason, "MCP connection error"),
            other => info!(state = %other, "MCP status changed"),
        }

        let line = render_status_line(state);
        println!("{line}");
        *self
            .last_line
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(line);
    }
}
