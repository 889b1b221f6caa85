//! Local agent adapter (HTTP or socket transport)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::PrinterIdentity;
use tracing::{info, instrument, warn};

use super::PrinterAdapter;
use crate::dispatch::PrintJob;
use crate::error::BridgeResult;
use crate::transport::{AgentResponse, AgentTransport};

/// Prints through a local agent; has no cash drawer support
#[derive(Debug, Clone)]
pub struct LocalAgentAdapter {
    identity: PrinterIdentity,
    transport: Arc<dyn AgentTransport>,
    timeout: Duration,
    debug: bool,
}

impl LocalAgentAdapter {
    pub fn new(
        identity: PrinterIdentity,
        transport: Arc<dyn AgentTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            identity,
            transport,
            timeout,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn transport(&self) -> &Arc<dyn AgentTransport> {
        &self.transport
    }
}

#[async_trait]
impl PrinterAdapter for LocalAgentAdapter {
    fn name(&self) -> &'static str {
        "local_agent"
    }

    fn identity(&self) -> &PrinterIdentity {
        &self.identity
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn debug(&self) -> bool {
        self.debug
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, role = %self.identity.role(), attempt = job.attempts))]
    async fn submit(&self, job: &PrintJob) -> BridgeResult<AgentResponse> {
        match self.transport.send(job).await {
            Ok(response) => {
                info!(printer = %self.identity.name(), "Receipt printed");
                Ok(response)
            }
            Err(e) => {
                warn!(printer = %self.identity.name(), error = %e, "Print failed");
                Err(e.into())
            }
        }
    }

    fn is_reachable(&self) -> bool {
        self.transport.is_reachable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared::message::PrinterInfo;
    use shared::{PayloadKind, PrinterRole, ReceiptPayload};
    use tokio::sync::watch;

    use crate::error::TransportError;
    use crate::transport::ConnectionStatus;

    /// Records every job it is handed
    #[derive(Debug)]
    struct RecordingTransport {
        jobs: Mutex<Vec<PrintJob>>,
        status: watch::Sender<ConnectionStatus>,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                jobs: Mutex::new(Vec::new()),
                status: watch::channel(ConnectionStatus::default()).0,
            })
        }
    }

    #[async_trait]
    impl AgentTransport for RecordingTransport {
        fn base_url(&self) -> &str {
            "http://127.0.0.1:8765"
        }

        async fn send(&self, job: &PrintJob) -> Result<AgentResponse, TransportError> {
            self.jobs.lock().push(job.clone());
            Ok(AgentResponse::new(serde_json::json!({"ok": true})))
        }

        async fn list_printers(&self, _timeout: Duration) -> Result<Vec<PrinterInfo>, TransportError> {
            Ok(Vec::new())
        }

        fn status(&self) -> ConnectionStatus {
            self.status.borrow().clone()
        }

        fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
            self.status.subscribe()
        }

        fn shutdown(&self) {}
    }

    fn adapter(transport: Arc<RecordingTransport>) -> LocalAgentAdapter {
        let identity = PrinterIdentity::new(PrinterRole::Kitchen, "Kitchen", "http://127.0.0.1:8765", None);
        LocalAgentAdapter::new(identity, transport, Duration::from_secs(1))
    }

    fn text_payload() -> ReceiptPayload {
        ReceiptPayload::from_bytes(PayloadKind::Raw, b"1x Soup\n", "application/octet-stream").unwrap()
    }

    #[tokio::test]
    async fn test_print_twice_sends_two_jobs() {
        let transport = RecordingTransport::new();
        let adapter = adapter(transport.clone());

        let first = adapter.print(text_payload()).await;
        let second = adapter.print(text_payload()).await;
        assert!(first.successful && second.successful);

        let jobs = transport.jobs.lock();
        assert_eq!(jobs.len(), 2);
        assert_ne!(jobs[0].id, jobs[1].id);
        assert!(jobs.iter().all(|j| j.attempts == 1));
        assert_eq!(jobs[0].payload, jobs[1].payload);
    }

    #[tokio::test]
    async fn test_open_cashbox_unsupported() {
        let transport = RecordingTransport::new();
        let adapter = adapter(transport.clone());
        assert!(!adapter.open_cashbox().await);
        assert!(transport.jobs.lock().is_empty());
    }
}
