use thiserror::Error;

use crate::stream::gateway::GatewayState;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("malformed message from device {device}: expected {expected} channels, got {actual}")]
    MalformedMessage {
        device: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown device {0}")]
    UnknownDevice(String),
    #[error("gateway is not running (state: {state:?})")]
    NotRunning { state: GatewayState },
    #[error("cannot transition gateway from {from:?} to {to:?}")]
    InvalidTransition { from: GatewayState, to: GatewayState },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("intake queue for device {device} is full ({capacity} samples)")]
    IntakeFull { device: String, capacity: usize },
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScopeError {
    /// Per-message errors leave shared state untouched; the receiver keeps going.
    pub fn is_message_error(&self) -> bool {
        matches!(
            self,
            ScopeError::MalformedMessage { .. }
                | ScopeError::UnknownDevice(_)
                | ScopeError::IntakeFull { .. }
        )
    }
}
