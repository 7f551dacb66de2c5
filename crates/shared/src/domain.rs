use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum accepted credential length, checked once the validation stage completes.
pub const MIN_CREDENTIAL_LEN: usize = 10;

const MASKED_CREDENTIAL_PREFIX: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Self::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStage {
    ValidateCredential,
    Establish,
    RegisterCapabilities,
    StartHeartbeat,
}

impl HandshakeStage {
    pub const ALL: [HandshakeStage; 4] = [
        HandshakeStage::ValidateCredential,
        HandshakeStage::Establish,
        HandshakeStage::RegisterCapabilities,
        HandshakeStage::StartHeartbeat,
    ];

    pub fn next(self) -> Option<HandshakeStage> {
        match self {
            Self::ValidateCredential => Some(Self::Establish),
            Self::Establish => Some(Self::RegisterCapabilities),
            Self::RegisterCapabilities => Some(Self::StartHeartbeat),
            Self::StartHeartbeat => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidateCredential => "validate_credential",
            Self::Establish => "establish",
            Self::RegisterCapabilities => "register_capabilities",
            Self::StartHeartbeat => "start_heartbeat",
        }
    }
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint and credential for a single connect attempt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub endpoint: String,
    pub credential: String,
}

impl ConnectionConfig {
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: credential.into(),
        }
    }

    /// Credential rendering that is safe to put in log lines.
    pub fn masked_credential(&self) -> String {
        if self.credential.is_empty() {
            return "<unset>".to_string();
        }
        let prefix: String = self
            .credential
            .chars()
            .take(MASKED_CREDENTIAL_PREFIX)
            .collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.masked_credential())
            .finish()
    }
}
