//! Agent transports
//!
//! One transport owns the channel to one agent base URL and is the only
//! source of truth for whether that agent is reachable.
//!
//! - [`HttpAgentTransport`]: stateless `POST /print`, periodic `GET /health`
//! - [`SocketAgentTransport`]: one persistent WebSocket with automatic reconnect

mod http;
mod socket;

pub use self::http::HttpAgentTransport;
pub use socket::SocketAgentTransport;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::message::PrinterInfo;
use tokio::sync::watch;

use crate::dispatch::PrintJob;
use crate::error::TransportError;

/// Guidance shown when loopback access is denied
pub const NETWORK_BLOCKED_GUIDANCE: &str = "Access to the local print agent was denied. \
     Allow this application to reach local network addresses and check that no firewall \
     or sandbox blocks the agent port, then retry.";

/// Body of a successful agent reply
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentResponse {
    pub body: Value,
}

impl AgentResponse {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Agent-assigned job id, when reported
    pub fn job_id(&self) -> Option<&str> {
        self.body.get("job_id").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// Observable snapshot of one agent channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    /// Agent believed reachable
    pub online: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    pub(crate) fn new(state: ConnectionState, online: bool, last_error: Option<String>) -> Self {
        Self {
            state,
            last_error,
            online,
            updated_at: Some(Utc::now()),
        }
    }
}

/// Publishes `status` unless nothing observable changed
pub(crate) fn publish(tx: &watch::Sender<ConnectionStatus>, status: ConnectionStatus) {
    tx.send_if_modified(|current| {
        let changed = current.state != status.state
            || current.online != status.online
            || current.last_error != status.last_error;
        if changed {
            *current = status;
        }
        changed
    });
}

/// Channel to one local agent
#[async_trait]
pub trait AgentTransport: Send + Sync + fmt::Debug {
    /// Agent base URL this transport owns
    fn base_url(&self) -> &str;

    /// Send one print job, bounded by `job.timeout`
    async fn send(&self, job: &PrintJob) -> Result<AgentResponse, TransportError>;

    /// Printers known to the agent
    async fn list_printers(&self, timeout: Duration) -> Result<Vec<PrinterInfo>, TransportError>;

    fn status(&self) -> ConnectionStatus;

    fn subscribe(&self) -> watch::Receiver<ConnectionStatus>;

    fn is_reachable(&self) -> bool {
        self.status().online
    }

    /// Stop background tasks (health monitor, reconnect supervisor)
    fn shutdown(&self);
}

/// Whether any error in the source chain is an io `PermissionDenied`
pub(crate) fn is_permission_denied(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>()
            && io.kind() == std::io::ErrorKind::PermissionDenied
        {
            return true;
        }
        source = e.source();
    }
    false
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
