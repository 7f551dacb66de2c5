use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::HandshakeStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigurationMissing,
    ConfigurationInvalid,
    HandshakeFailed,
    AlreadyConnected,
    Superseded,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("configuration missing: {field} is not set")]
    ConfigurationMissing { field: &'static str },
    #[error("configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },
    #[error("handshake failed during {stage}: {reason}")]
    HandshakeFailed {
        stage: HandshakeStage,
        reason: String,
    },
    #[error("already connected")]
    AlreadyConnected,
    #[error("connect attempt superseded by a newer attempt")]
    Superseded,
    #[error("connect attempt cancelled")]
    Cancelled,
}

impl ConnectionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConfigurationMissing { .. } => ErrorCode::ConfigurationMissing,
            Self::ConfigurationInvalid { .. } => ErrorCode::ConfigurationInvalid,
            Self::HandshakeFailed { .. } => ErrorCode::HandshakeFailed,
            Self::AlreadyConnected => ErrorCode::AlreadyConnected,
            Self::Superseded => ErrorCode::Superseded,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Errors produced by the connect policy rather than by the handshake.
    /// These never move the controller into the error state.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConnected | Self::Superseded | Self::Cancelled
        )
    }
}

/// Serializable form of a [`ConnectionError`] for status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&ConnectionError> for ErrorReport {
    fn from(value: &ConnectionError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
