//! Stage sequencing for a single connect attempt.
//!
//! The machine never suspends: the controller asks it which stage to run next,
//! runs that stage on the transport, and feeds the outcome back in.

use shared::{
    domain::{ConnectionConfig, HandshakeStage, MIN_CREDENTIAL_LEN},
    error::ConnectionError,
};
use url::Url;

#[derive(Debug)]
pub struct HandshakeMachine<'a> {
    config: &'a ConnectionConfig,
    next: Option<HandshakeStage>,
}

impl<'a> HandshakeMachine<'a> {
    /// Checks that the configuration is present and well-formed before any
    /// stage runs.
    pub fn start(config: &'a ConnectionConfig) -> Result<Self, ConnectionError> {
        if config.endpoint.trim().is_empty() {
            return Err(ConnectionError::ConfigurationMissing { field: "endpoint" });
        }
        if config.credential.is_empty() {
            return Err(ConnectionError::ConfigurationMissing {
                field: "credential",
            });
        }
        Url::parse(config.endpoint.trim()).map_err(|err| {
            ConnectionError::ConfigurationInvalid {
                reason: format!("endpoint '{}' is not a valid URL: {err}", config.endpoint),
            }
        })?;

        Ok(Self {
            config,
            next: Some(HandshakeStage::ValidateCredential),
        })
    }

    pub fn current_stage(&self) -> Option<HandshakeStage> {
        self.next
    }

    pub fn is_complete(&self) -> bool {
        self.next.is_none()
    }

    /// Records the outcome of the current stage and moves to the next one.
    pub fn finish_stage(&mut self, outcome: Result<(), String>) -> Result<(), ConnectionError> {
        let Some(stage) = self.next else {
            return Ok(());
        };

        if let Err(reason) = outcome {
            self.next = None;
            return Err(ConnectionError::HandshakeFailed { stage, reason });
        }

        if stage == HandshakeStage::ValidateCredential
            && self.config.credential.chars().count() < MIN_CREDENTIAL_LEN
        {
            self.next = None;
            return Err(ConnectionError::ConfigurationInvalid {
                reason: format!(
                    "credential must be at least {MIN_CREDENTIAL_LEN} characters"
                ),
            });
        }

        self.next = stage.next();
        Ok(())
    }
}
