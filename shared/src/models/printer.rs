//! Printer identity model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical destination class a receipt is printed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterRole {
    /// Customer receipt printer at the till
    Cashier,
    /// Kitchen order ticket printer
    Kitchen,
}

impl PrinterRole {
    pub const ALL: [PrinterRole; 2] = [PrinterRole::Cashier, PrinterRole::Kitchen];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrinterRole::Cashier => "cashier",
            PrinterRole::Kitchen => "kitchen",
        }
    }
}

impl fmt::Display for PrinterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent protocol a printer is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterProtocol {
    /// Stateless HTTP agent (`POST /print`)
    #[default]
    LocalAgent,
    /// Persistent WebSocket agent (`print_receipt` frames)
    Socket,
    /// Generic hardware proxy (`/hw_proxy/default_printer_action`)
    HwProxy,
}

impl PrinterProtocol {
    /// Default host when none is configured
    pub fn default_host(&self) -> &'static str {
        "127.0.0.1"
    }

    /// Default port when none is configured
    pub fn default_port(&self) -> u16 {
        match self {
            PrinterProtocol::LocalAgent | PrinterProtocol::Socket => 9060,
            PrinterProtocol::HwProxy => 8069,
        }
    }

    /// URL scheme used when the configured host has none
    pub fn default_scheme(&self) -> &'static str {
        match self {
            PrinterProtocol::Socket => "ws",
            PrinterProtocol::LocalAgent | PrinterProtocol::HwProxy => "http",
        }
    }
}

impl fmt::Display for PrinterProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterProtocol::LocalAgent => write!(f, "local_agent"),
            PrinterProtocol::Socket => write!(f, "socket"),
            PrinterProtocol::HwProxy => write!(f, "hw_proxy"),
        }
    }
}

/// Identity of one logical printer for the session
///
/// Immutable once constructed: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterIdentity {
    role: PrinterRole,
    name: String,
    agent_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
}

impl PrinterIdentity {
    /// Create an identity. A blank token is stored as no token.
    pub fn new(
        role: PrinterRole,
        name: impl Into<String>,
        agent_base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            role,
            name: name.into(),
            agent_base_url: agent_base_url.into().trim_end_matches('/').to_string(),
            auth_token: auth_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    pub fn role(&self) -> PrinterRole {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL without trailing slash
    pub fn agent_base_url(&self) -> &str {
        &self.agent_base_url
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}
