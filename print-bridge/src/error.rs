//! Bridge error types

use serde::Serialize;
use shared::PayloadError;
use thiserror::Error;

/// Failure of a single agent call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No live connection to the agent (socket variant)
    #[error("print agent is not connected")]
    NotConnected,

    /// The call did not complete within its timeout
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Agent answered with a non-2xx status
    #[error("agent returned HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    /// Loopback access was denied by the OS or a sandbox
    #[error("access to {url} was blocked: {guidance}")]
    NetworkBlocked { url: String, guidance: String },

    /// Agent reachable but reported an error for this request
    #[error("agent rejected the request: {0}")]
    Rejected(String),

    /// Connection-level failure (refused, reset, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Malformed or unexpected agent response
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Agent could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            TransportError::NotConnected
                | TransportError::NetworkBlocked { .. }
                | TransportError::Network(_)
        )
    }
}

/// Bridge error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Receipt could not be turned into a typed payload
    #[error("unsupported receipt format: {0}")]
    UnsupportedFormat(String),

    /// No usable printer configuration for the role
    #[error("printer not configured: {0}")]
    NotConfigured(String),

    /// Payload kind the chosen adapter cannot print
    #[error("unsupported by adapter: {0}")]
    UnsupportedByAdapter(String),

    /// Dispatcher stopped before the job completed
    #[error("print dispatcher stopped")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BridgeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BridgeError::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            BridgeError::NotConfigured(_) => FailureKind::NotConfigured,
            BridgeError::UnsupportedByAdapter(_) => FailureKind::UnsupportedByAdapter,
            BridgeError::Cancelled => FailureKind::Cancelled,
            BridgeError::Transport(e) => match e {
                TransportError::NotConnected => FailureKind::NotConnected,
                TransportError::Timeout(_) => FailureKind::Timeout,
                TransportError::HttpStatus { code, .. } => FailureKind::HttpStatus(*code),
                TransportError::NetworkBlocked { .. } => FailureKind::NetworkBlocked,
                TransportError::Rejected(_) => FailureKind::Rejected,
                TransportError::Network(_) => FailureKind::Network,
                TransportError::Protocol(_) => FailureKind::Protocol,
            },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Transport(TransportError::Timeout(_)))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, BridgeError::Transport(e) if e.is_unreachable())
    }
}

impl From<PayloadError> for BridgeError {
    fn from(err: PayloadError) -> Self {
        BridgeError::UnsupportedFormat(err.to_string())
    }
}

/// Flat failure classification carried by a [`PrintOutcome`](crate::PrintOutcome)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    NotConfigured,
    NotConnected,
    Timeout,
    HttpStatus(u16),
    NetworkBlocked,
    UnsupportedByAdapter,
    Rejected,
    Network,
    Protocol,
    Cancelled,
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
