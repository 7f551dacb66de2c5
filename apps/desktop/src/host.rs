//! Owns the controller and routes host commands to it.

use std::sync::Arc;

use anyhow::Result;
use client_core::{
    api_key::generate_local_api_key, chat::ChatSession, probe::probe, ConnectionController,
    ConnectionObserver, Scheduler, SimulatedTransport,
};
use shared::{error::ConnectionError, status::StatusIndicator};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{commands::HostCommand, observer::render_status_line, settings::Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Host {
    settings: Settings,
    scheduler: Arc<dyn Scheduler>,
    controller: Arc<ConnectionController>,
    chat: ChatSession,
    pending_connect: Option<JoinHandle<Result<(), ConnectionError>>>,
}

impl Host {
    pub fn new(
        settings: Settings,
        scheduler: Arc<dyn Scheduler>,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        let transport = Arc::new(SimulatedTransport::new(
            scheduler.clone(),
            settings.timings(),
        ));
        let controller = ConnectionController::new(transport, scheduler.clone())
            .with_stage_timeout(settings.stage_timeout())
            .with_observer(observer);

        Self {
            settings,
            scheduler,
            controller: Arc::new(controller),
            chat: ChatSession::new(),
            pending_connect: None,
        }
    }

    #[cfg(test)]
    pub fn controller(&self) -> &Arc<ConnectionController> {
        &self.controller
    }

    /// Issues a single connect after the configured delay. Failures are
    /// reported and not retried.
    pub fn start_auto_connect(&mut self) {
        if !self.settings.auto_connect {
            debug!("auto-connect disabled");
            return;
        }
        info!(
            delay_ms = self.settings.auto_connect_delay_ms,
            "scheduling automatic MCP connect"
        );
        let delay = self.settings.auto_connect_delay();
        self.spawn_connect(Some(delay));
    }

    pub async fn handle(&mut self, command: HostCommand) -> Result<Flow> {
        debug!(command = command.name(), "dispatching host command");

        match command {
            HostCommand::Connect => self.spawn_connect(None),
            HostCommand::Disconnect => {
                info!("disconnecting from MCP service");
                self.controller.disconnect();
            }
            HostCommand::Status => {
                let state = self.controller.current_state();
                println!("{}", render_status_line(&state));
                if !self.settings.minimal_mode {
                    println!(
                        "{}",
                        serde_json::to_string(&StatusIndicator::for_state(&state))?
                    );
                }
            }
            HostCommand::ToggleMode => {
                self.settings.minimal_mode = !self.settings.minimal_mode;
                let mode = if self.settings.minimal_mode {
                    "minimal"
                } else {
                    "full"
                };
                info!(mode, "switched to {mode} mode");
            }
            HostCommand::TestConnection => {
                let config = self.settings.connection_config();
                info!(endpoint = %config.endpoint, "testing MCP connection");
                match probe(&config, self.scheduler.as_ref()).await {
                    Ok(report) => {
                        info!(latency_ms = report.latency_ms, "connection test succeeded");
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    }
                    Err(err) => warn!(%err, "connection test failed"),
                }
            }
            HostCommand::GenerateApiKey => {
                let key = generate_local_api_key();
                info!("generated new API key");
                println!("{key}");
                println!("set it as `api_key` in your settings file or MCP_API_KEY");
            }
            HostCommand::Chat { text } => match self.chat.send(&text) {
                Ok(reply) => println!("{}", reply.text),
                Err(err) => warn!(%err, "chat message rejected"),
            },
            HostCommand::History => {
                println!("{}", serde_json::to_string_pretty(self.chat.messages())?);
            }
            HostCommand::Help => println!("{}", crate::commands::HELP),
            HostCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    /// Waits for the most recent background connect, if any, and returns its
    /// outcome.
    pub async fn wait_for_connect(&mut self) -> Option<Result<(), ConnectionError>> {
        let handle = self.pending_connect.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                error!(%err, "connect task aborted");
                None
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.controller.dispose();
        if let Some(handle) = self.pending_connect.take() {
            handle.abort();
        }
    }

    fn spawn_connect(&mut self, delay: Option<std::time::Duration>) {
        let config = self.settings.connection_config();
        info!(
            endpoint = %config.endpoint,
            api_key = %config.masked_credential(),
            "connecting to MCP service"
        );

        let controller = self.controller.clone();
        let scheduler = self.scheduler.clone();
        let handle = tokio::spawn(async move {
            if let Some(delay) = delay {
                scheduler.sleep(delay).await;
            }
            let outcome = controller.connect(config).await;
            match &outcome {
                Ok(()) => info!("MCP service connected"),
                Err(err) if err.is_policy_rejection() => warn!(%err, "connect not applied"),
                Err(err) => error!(%err, "MCP connection failed"),
            }
            outcome
        });

        // The previous task is superseded inside the controller, not aborted here.
        self.pending_connect = Some(handle);
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
