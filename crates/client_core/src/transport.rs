//! Per-stage boundary to the remote MCP service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::domain::{ConnectionConfig, HandshakeStage};

use crate::scheduler::Scheduler;

const INVALID_ENDPOINT_MARKER: &str = "invalid";

/// Runs one handshake stage against the service. `Err` carries the reason the
/// service (or the simulation) gave for rejecting the stage.
#[async_trait]
pub trait HandshakeTransport: Send + Sync {
    async fn run_stage(
        &self,
        stage: HandshakeStage,
        config: &ConnectionConfig,
    ) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTimings {
    pub validate: Duration,
    pub establish: Duration,
    pub register: Duration,
    pub heartbeat: Duration,
}

impl Default for HandshakeTimings {
    fn default() -> Self {
        Self {
            validate: Duration::from_millis(1000),
            establish: Duration::from_millis(1000),
            register: Duration::from_millis(800),
            heartbeat: Duration::from_millis(500),
        }
    }
}

impl HandshakeTimings {
    pub fn for_stage(&self, stage: HandshakeStage) -> Duration {
        match stage {
            HandshakeStage::ValidateCredential => self.validate,
            HandshakeStage::Establish => self.establish,
            HandshakeStage::RegisterCapabilities => self.register,
            HandshakeStage::StartHeartbeat => self.heartbeat,
        }
    }

    pub fn total(&self) -> Duration {
        HandshakeStage::ALL
            .iter()
            .map(|stage| self.for_stage(*stage))
            .sum()
    }
}

/// Stand-in for the real service: every stage is a fixed delay, and the
/// establishment stage rejects endpoints carrying the `invalid` marker.
pub struct SimulatedTransport {
    scheduler: Arc<dyn Scheduler>,
    timings: HandshakeTimings,
}

impl SimulatedTransport {
    pub fn new(scheduler: Arc<dyn Scheduler>, timings: HandshakeTimings) -> Self {
        Self { scheduler, timings }
    }
}

#[async_trait]
impl HandshakeTransport for SimulatedTransport {
    async fn run_stage(
        &self,
        stage: HandshakeStage,
        config: &ConnectionConfig,
    ) -> Result<(), String> {
        self.scheduler.sleep(self.timings.for_stage(stage)).await;

        match stage {
            HandshakeStage::Establish if config.endpoint.contains(INVALID_ENDPOINT_MARKER) => {
                Err(format!("invalid MCP endpoint '{}'", config.endpoint))
            }
            _ => Ok(()),
        }
    }
}
