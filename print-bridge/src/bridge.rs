//! Print bridge facade
//!
//! Builds transports, adapters and the orchestrator from a [`BridgeConfig`]
//! and owns their lifetime for the session.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shared::message::PrinterInfo;
use shared::{PrinterProtocol, PrinterRole};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::{HttpProxyAdapter, LocalAgentAdapter, PrintOutcome, PrinterAdapter};
use crate::config::{BridgeConfig, DEFAULT_TIMEOUT_MS, RoleConfig};
use crate::dispatch::{DispatchOrchestrator, LaneStatus, PrintTicket};
use crate::error::{BridgeError, BridgeResult};
use crate::normalize::{Normalizer, RawReceipt, ReceiptRenderer};
use crate::transport::{
    AgentTransport, ConnectionStatus, HttpAgentTransport, SocketAgentTransport,
};

/// One transport per agent base URL
#[derive(Clone)]
enum TransportEntry {
    Http(Arc<HttpAgentTransport>),
    Socket(SocketAgentTransport),
}

impl TransportEntry {
    fn as_dyn(&self) -> Arc<dyn AgentTransport> {
        match self {
            TransportEntry::Http(t) => Arc::clone(t) as Arc<dyn AgentTransport>,
            TransportEntry::Socket(t) => Arc::new(t.clone()),
        }
    }
}

/// Builder for [`PrintBridge`]
pub struct PrintBridgeBuilder {
    config: BridgeConfig,
    renderer: Option<Arc<dyn ReceiptRenderer>>,
    fallbacks: HashMap<PrinterRole, Arc<dyn PrinterAdapter>>,
}

impl PrintBridgeBuilder {
    /// Renderer used for markup receipts and visual elements
    pub fn renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Host-provided adapter for `role` (e.g. the host's built-in printer)
    pub fn fallback(mut self, role: PrinterRole, adapter: Arc<dyn PrinterAdapter>) -> Self {
        self.fallbacks.insert(role, adapter);
        self
    }

    /// Create transports and start their background tasks.
    ///
    /// A role whose configuration does not validate is skipped with a
    /// warning; printing to it then fails with `NotConfigured`.
    /// Must run inside a tokio runtime.
    pub fn build(self) -> BridgeResult<PrintBridge> {
        let config = self.config;
        let normalizer = match self.renderer {
            Some(renderer) => Normalizer::with_renderer(renderer),
            None => Normalizer::new(),
        };

        let mut registry: HashMap<String, TransportEntry> = HashMap::new();
        let mut role_transports = HashMap::new();
        let mut builder = DispatchOrchestrator::builder(normalizer)
            .retry(config.retry)
            .unreachable_policy(config.unreachable_policy)
            .debug(config.debug);

        let mut roles: Vec<_> = config.roles.iter().collect();
        roles.sort_by_key(|(role, _)| **role);

        for (&role, role_config) in roles {
            if let Err(e) = role_config.validate() {
                warn!(%role, error = %e, "Skipping printer role");
                continue;
            }
            let entry = transport_for(&mut registry, role_config, &config)?;
            let adapter = adapter_for(role, role_config, &entry, config.debug);
            info!(
                %role,
                protocol = %role_config.protocol,
                printer = %role_config.printer_name,
                base_url = %adapter.identity().agent_base_url(),
                "Printer role configured"
            );
            role_transports.insert(role, entry.as_dyn());
            builder = builder.adapter(role, adapter);
        }

        for (role, fallback) in self.fallbacks {
            builder = builder.fallback(role, fallback);
        }

        for entry in registry.values() {
            match entry {
                TransportEntry::Http(t) => {
                    t.spawn_health_monitor(config.health_interval());
                }
                TransportEntry::Socket(t) => t.start(),
            }
        }

        let transports = registry.values().map(TransportEntry::as_dyn).collect();
        Ok(PrintBridge {
            orchestrator: builder.build(),
            role_transports,
            transports,
            config,
        })
    }
}

fn transport_for(
    registry: &mut HashMap<String, TransportEntry>,
    role_config: &RoleConfig,
    config: &BridgeConfig,
) -> BridgeResult<TransportEntry> {
    let base_url = role_config.base_url();
    if let Some(entry) = registry.get(&base_url) {
        return Ok(entry.clone());
    }

    let token = role_config.token().map(str::to_string);
    let entry = match role_config.protocol {
        PrinterProtocol::LocalAgent => {
            TransportEntry::Http(Arc::new(HttpAgentTransport::new(&base_url, token)?))
        }
        PrinterProtocol::HwProxy => TransportEntry::Http(Arc::new(
            HttpAgentTransport::new(&base_url, token)?
                .with_health_path(crate::adapter::HW_PROXY_HEALTH_PATH),
        )),
        PrinterProtocol::Socket => TransportEntry::Socket(SocketAgentTransport::new(
            &base_url,
            token,
            config.reconnect_delay(),
        )?),
    };
    registry.insert(base_url, entry.clone());
    Ok(entry)
}

fn adapter_for(
    role: PrinterRole,
    role_config: &RoleConfig,
    entry: &TransportEntry,
    debug: bool,
) -> Arc<dyn PrinterAdapter> {
    let identity = role_config.identity(role);
    let timeout = role_config.timeout();
    match (role_config.protocol, entry) {
        (PrinterProtocol::HwProxy, TransportEntry::Http(transport)) => Arc::new(
            HttpProxyAdapter::new(identity, Arc::clone(transport), timeout).with_debug(debug),
        ),
        _ => Arc::new(LocalAgentAdapter::new(identity, entry.as_dyn(), timeout).with_debug(debug)),
    }
}

/// Session-wide entry point for printing
pub struct PrintBridge {
    config: BridgeConfig,
    orchestrator: DispatchOrchestrator,
    role_transports: HashMap<PrinterRole, Arc<dyn AgentTransport>>,
    transports: Vec<Arc<dyn AgentTransport>>,
}

impl fmt::Debug for PrintBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintBridge")
            .field("roles", &self.orchestrator.roles())
            .field("transports", &self.transports.len())
            .finish()
    }
}

impl PrintBridge {
    pub fn builder(config: BridgeConfig) -> PrintBridgeBuilder {
        PrintBridgeBuilder {
            config,
            renderer: None,
            fallbacks: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &DispatchOrchestrator {
        &self.orchestrator
    }

    /// Print `receipt` on the printer of `role` and wait for the outcome
    pub async fn print(&self, role: PrinterRole, receipt: impl Into<RawReceipt>) -> PrintOutcome {
        self.orchestrator.print(role, receipt).await
    }

    /// Queue `receipt` without waiting
    pub async fn enqueue(
        &self,
        role: PrinterRole,
        receipt: impl Into<RawReceipt>,
    ) -> BridgeResult<PrintTicket> {
        self.orchestrator.enqueue(role, receipt).await
    }

    /// Open the cash drawer attached to the printer of `role`
    pub async fn open_cashbox(&self, role: PrinterRole) -> bool {
        match self.orchestrator.adapter(role) {
            Some(adapter) => adapter.open_cashbox().await,
            None => false,
        }
    }

    fn transport(&self, role: PrinterRole) -> BridgeResult<&Arc<dyn AgentTransport>> {
        self.role_transports
            .get(&role)
            .ok_or_else(|| BridgeError::NotConfigured(format!("no printer for the {role} role")))
    }

    /// Printers known to the agent serving `role`
    pub async fn list_printers(&self, role: PrinterRole) -> BridgeResult<Vec<PrinterInfo>> {
        let timeout = self
            .config
            .role(role)
            .map(RoleConfig::timeout)
            .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));
        Ok(self.transport(role)?.list_printers(timeout).await?)
    }

    /// Find `name` among the agent's printers: exact match first, then
    /// case-insensitive, then substring
    pub async fn find_printer(
        &self,
        role: PrinterRole,
        name: &str,
    ) -> BridgeResult<Option<PrinterInfo>> {
        let printers = self.list_printers(role).await?;
        Ok(match_printer(printers, name))
    }

    pub fn transport_status(&self, role: PrinterRole) -> Option<ConnectionStatus> {
        self.role_transports.get(&role).map(|t| t.status())
    }

    pub fn subscribe_status(&self, role: PrinterRole) -> Option<watch::Receiver<ConnectionStatus>> {
        self.role_transports.get(&role).map(|t| t.subscribe())
    }

    pub fn lane_state(&self, role: PrinterRole) -> Option<LaneStatus> {
        self.orchestrator.lane_state(role)
    }

    /// Stop lanes, health monitors and socket supervisors
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
        for transport in &self.transports {
            transport.shutdown();
        }
    }
}

impl Drop for PrintBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn match_printer(printers: Vec<PrinterInfo>, name: &str) -> Option<PrinterInfo> {
    let wanted = name.trim();
    if wanted.is_empty() {
        return None;
    }
    let lower = wanted.to_lowercase();

    if let Some(p) = printers.iter().find(|p| p.name == wanted) {
        return Some(p.clone());
    }
    if let Some(p) = printers.iter().find(|p| p.name.to_lowercase() == lower) {
        return Some(p.clone());
    }
    printers
        .into_iter()
        .find(|p| p.name.to_lowercase().contains(&lower))
}
