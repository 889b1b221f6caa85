//! Bridge configuration
//!
//! The bridge never loads configuration itself: the host resolves it (from
//! its own settings store, a file, whatever) and hands over these structs.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use shared::{PrinterIdentity, PrinterProtocol, PrinterRole};

use crate::error::{BridgeError, BridgeResult};

/// Default per-request timeout (ms)
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default interval between HTTP health checks (ms)
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 3_000;
/// Default delay before a dropped socket is re-established (ms)
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// What happens when an agent is configured but cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Surface the failure to the caller
    #[default]
    FailClosed,
    /// Delegate the job to the role's fallback adapter, if any
    FailOpen,
}

/// Automatic retry of timed-out jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per job, including the first one
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Single attempt, no retry
    pub fn none() -> Self {
        Self::new(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Connection settings for one printer role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Agent protocol
    pub protocol: PrinterProtocol,

    /// Agent host, optionally with scheme, port and path
    /// (e.g. "192.168.1.20", "https://agent.local:9443")
    pub host: Option<String>,

    /// Agent port, used when `host` carries none
    pub port: Option<u16>,

    /// Printer name as known by the agent
    pub printer_name: String,

    /// Bearer token; blank means no authentication
    pub auth_token: Option<String>,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            protocol: PrinterProtocol::default(),
            host: None,
            port: None,
            printer_name: String::new(),
            auth_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RoleConfig {
    /// Create a role configuration with protocol defaults
    pub fn new(protocol: PrinterProtocol, printer_name: impl Into<String>) -> Self {
        Self {
            protocol,
            printer_name: printer_name.into(),
            ..Default::default()
        }
    }

    /// Stateless HTTP agent
    pub fn local_agent(printer_name: impl Into<String>) -> Self {
        Self::new(PrinterProtocol::LocalAgent, printer_name)
    }

    /// Persistent WebSocket agent
    pub fn socket(printer_name: impl Into<String>) -> Self {
        Self::new(PrinterProtocol::Socket, printer_name)
    }

    /// Hardware proxy
    pub fn hw_proxy(printer_name: impl Into<String>) -> Self {
        Self::new(PrinterProtocol::HwProxy, printer_name)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Non-blank token
    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Agent base URL without trailing slash.
    ///
    /// A scheme or port already present in `host` is kept; otherwise the
    /// protocol defaults apply. Socket agents get the `/ws` path when none
    /// is given.
    pub fn base_url(&self) -> String {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(self.protocol.default_host());

        let (scheme, rest) = match host.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => (self.protocol.default_scheme(), host),
        };
        let rest = rest.trim_end_matches('/');
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        let mut url = format!("{scheme}://{authority}");
        if !has_explicit_port(authority) {
            let port = self.port.unwrap_or(self.protocol.default_port());
            url.push_str(&format!(":{port}"));
        }
        if path.is_empty() && self.protocol == PrinterProtocol::Socket {
            url.push_str("/ws");
        } else {
            url.push_str(path);
        }
        url
    }

    /// Check the settings are usable
    pub fn validate(&self) -> BridgeResult<()> {
        if self.printer_name.trim().is_empty() {
            return Err(BridgeError::NotConfigured("printer name is empty".into()));
        }
        if self.port == Some(0) {
            return Err(BridgeError::NotConfigured("port 0 is not a valid agent port".into()));
        }
        if self.timeout_ms == 0 {
            return Err(BridgeError::NotConfigured("timeout must be positive".into()));
        }
        let base_url = self.base_url();
        let url = Url::parse(&base_url)
            .map_err(|e| BridgeError::NotConfigured(format!("invalid agent url {base_url}: {e}")))?;
        if url.host_str().is_none() {
            return Err(BridgeError::NotConfigured(format!(
                "agent url {base_url} has no host"
            )));
        }
        Ok(())
    }

    /// Printer identity for `role`
    pub fn identity(&self, role: PrinterRole) -> PrinterIdentity {
        PrinterIdentity::new(
            role,
            self.printer_name.trim(),
            self.base_url(),
            self.token().map(str::to_string),
        )
    }
}

/// `host:port` or `[v6]:port`
fn has_explicit_port(authority: &str) -> bool {
    match authority.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Per-role printer settings; a missing role is "not configured"
    pub roles: HashMap<PrinterRole, RoleConfig>,

    /// HTTP health check interval (ms)
    pub health_interval_ms: u64,

    /// Socket reconnect delay (ms)
    pub reconnect_delay_ms: u64,

    /// Show raw error details in outcome messages
    pub debug: bool,

    /// Behavior when an agent is configured but unreachable
    pub unreachable_policy: UnreachablePolicy,

    /// Retry of timed-out jobs
    pub retry: RetryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            roles: HashMap::new(),
            health_interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            debug: false,
            unreachable_policy: UnreachablePolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: PrinterRole, config: RoleConfig) -> Self {
        self.roles.insert(role, config);
        self
    }

    pub fn with_health_interval_ms(mut self, ms: u64) -> Self {
        self.health_interval_ms = ms;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_unreachable_policy(mut self, policy: UnreachablePolicy) -> Self {
        self.unreachable_policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn role(&self, role: PrinterRole) -> Option<&RoleConfig> {
        self.roles.get(&role)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_defaults() {
        assert_eq!(
            RoleConfig::local_agent("P").base_url(),
            "http://127.0.0.1:9060"
        );
        assert_eq!(RoleConfig::hw_proxy("P").base_url(), "http://127.0.0.1:8069");
        assert_eq!(RoleConfig::socket("P").base_url(), "ws://127.0.0.1:9060/ws");
    }

    #[test]
    fn test_base_url_keeps_explicit_parts() {
        let cfg = RoleConfig::local_agent("P")
            .with_host("https://agent.local:9443/")
            .with_port(1234);
        assert_eq!(cfg.base_url(), "https://agent.local:9443");

        let cfg = RoleConfig::local_agent("P").with_host("192.168.1.20").with_port(9100);
        assert_eq!(cfg.base_url(), "http://192.168.1.20:9100");

        let cfg = RoleConfig::socket("P").with_host("ws://10.0.0.5/agent");
        assert_eq!(cfg.base_url(), "ws://10.0.0.5:9060/agent");

        let cfg = RoleConfig::local_agent("P").with_host("[::1]");
        assert_eq!(cfg.base_url(), "http://[::1]:9060");
    }

    #[test]
    fn test_blank_host_uses_default() {
        let cfg = RoleConfig::local_agent("P").with_host("   ");
        assert_eq!(cfg.base_url(), "http://127.0.0.1:9060");
    }

    #[test]
    fn test_validate() {
        assert!(RoleConfig::local_agent("EPSON").validate().is_ok());

        let err = RoleConfig::local_agent("  ").validate().unwrap_err();
        assert!(matches!(err, BridgeError::NotConfigured(_)));

        let err = RoleConfig::local_agent("P").with_port(0).validate().unwrap_err();
        assert!(matches!(err, BridgeError::NotConfigured(_)));

        let err = RoleConfig::local_agent("P")
            .with_host("http://bad host")
            .validate()
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotConfigured(_)));
    }

    #[test]
    fn test_blank_token_is_none() {
        let cfg = RoleConfig::local_agent("P").with_token("  ");
        assert_eq!(cfg.token(), None);
        assert_eq!(cfg.identity(PrinterRole::Cashier).auth_token(), None);

        let cfg = RoleConfig::local_agent("P").with_token("s3cret");
        assert_eq!(cfg.identity(PrinterRole::Cashier).auth_token(), Some("s3cret"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let cfg: BridgeConfig = serde_json::from_str(
            r#"{
                "roles": {
                    "kitchen": {"protocol": "socket", "printer_name": "Kitchen"},
                    "cashier": {"printer_name": "EPSON", "timeout_ms": 100}
                },
                "unreachable_policy": "fail_open"
            }"#,
        )
        .unwrap();

        let kitchen = cfg.role(PrinterRole::Kitchen).unwrap();
        assert_eq!(kitchen.protocol, PrinterProtocol::Socket);
        assert_eq!(kitchen.timeout_ms, DEFAULT_TIMEOUT_MS);

        let cashier = cfg.role(PrinterRole::Cashier).unwrap();
        assert_eq!(cashier.protocol, PrinterProtocol::LocalAgent);
        assert_eq!(cashier.timeout(), Duration::from_millis(100));

        assert_eq!(cfg.unreachable_policy, UnreachablePolicy::FailOpen);
        assert_eq!(cfg.retry.max_attempts, 1);
        assert_eq!(cfg.health_interval(), Duration::from_secs(3));
    }
}
