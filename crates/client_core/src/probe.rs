//! One-shot reachability probe behind the "test connection" command.
//! Does not touch controller state.

use std::time::Duration;

use serde::Serialize;
use shared::{domain::ConnectionConfig, error::ConnectionError};

use crate::scheduler::Scheduler;

pub const PROBE_DELAY: Duration = Duration::from_millis(2000);
const SIMULATED_LATENCY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    pub latency_ms: u64,
    pub certificate_valid: bool,
    pub network_ok: bool,
}

pub async fn probe(
    config: &ConnectionConfig,
    scheduler: &dyn Scheduler,
) -> Result<ProbeReport, ConnectionError> {
    if config.endpoint.trim().is_empty() {
        return Err(ConnectionError::ConfigurationMissing { field: "endpoint" });
    }
    if config.credential.is_empty() {
        return Err(ConnectionError::ConfigurationMissing {
            field: "credential",
        });
    }

    scheduler.sleep(PROBE_DELAY).await;

    Ok(ProbeReport {
        endpoint: config.endpoint.clone(),
        latency_ms: SIMULATED_LATENCY.as_millis() as u64,
        certificate_valid: true,
        network_ok: true,
    })
}
