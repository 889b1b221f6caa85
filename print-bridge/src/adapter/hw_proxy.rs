//! Hardware proxy adapter
//!
//! Talks JSON-RPC to `/hw_proxy/default_printer_action`:
//!
//! ```json
//! {"jsonrpc": "2.0", "method": "call", "id": 1,
//!  "params": {"data": {"action": "print_receipt", "printer_name": "...", "receipt": "<base64>"}}}
//! ```
//!
//! A `result` of `false` or an `error` member means the proxy failed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use shared::{PayloadKind, PrinterIdentity};
use tracing::{info, instrument, warn};

use super::PrinterAdapter;
use crate::dispatch::PrintJob;
use crate::error::{BridgeError, BridgeResult, TransportError};
use crate::transport::{AgentResponse, AgentTransport, HttpAgentTransport};

/// Proxy action endpoint
pub const ACTION_PATH: &str = "/hw_proxy/default_printer_action";
/// Proxy health endpoint
pub const HEALTH_PATH: &str = "/hw_proxy/hello";

/// Prints images and raw data through a hardware proxy; opens the cash drawer
#[derive(Debug)]
pub struct HttpProxyAdapter {
    identity: PrinterIdentity,
    transport: Arc<HttpAgentTransport>,
    timeout: Duration,
    debug: bool,
    next_id: AtomicU64,
}

impl HttpProxyAdapter {
    pub fn new(identity: PrinterIdentity, transport: Arc<HttpAgentTransport>, timeout: Duration) -> Self {
        Self {
            identity,
            transport,
            timeout,
            debug: false,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn envelope(&self, data: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "call",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "params": { "data": data },
        })
    }

    async fn action(&self, data: Value, timeout: Duration) -> BridgeResult<Value> {
        let reply = self
            .transport
            .post_json(ACTION_PATH, &self.envelope(data), timeout)
            .await?;
        rpc_result(reply)
    }
}

/// Unwrap a JSON-RPC reply
fn rpc_result(reply: Value) -> BridgeResult<Value> {
    if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
        let message = error
            .pointer("/data/message")
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("hardware proxy error")
            .to_string();
        return Err(TransportError::Rejected(message).into());
    }
    match reply.get("result") {
        Some(Value::Bool(false)) => {
            Err(TransportError::Rejected("hardware proxy reported failure".into()).into())
        }
        Some(result) => Ok(result.clone()),
        None => Ok(reply),
    }
}

#[async_trait]
impl PrinterAdapter for HttpProxyAdapter {
    fn name(&self) -> &'static str {
        "hw_proxy"
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
        if job.payload.kind() == PayloadKind::Pdf {
            return Err(BridgeError::UnsupportedByAdapter(
                "PDF receipts cannot be printed through the hardware proxy.".into(),
            ));
        }

        let data = json!({
            "action": "print_receipt",
            "printer_name": job.identity.name(),
            "receipt": job.payload.data(),
        });
        match self.action(data, job.timeout).await {
            Ok(result) => {
                info!(printer = %job.identity.name(), "Receipt printed via hardware proxy");
                Ok(AgentResponse::new(result))
            }
            Err(e) => {
                warn!(printer = %job.identity.name(), error = %e, "Hardware proxy print failed");
                Err(e)
            }
        }
    }

    async fn open_cashbox(&self) -> bool {
        match self.action(json!({ "action": "cashbox" }), self.timeout).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Cash drawer could not be opened");
                false
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

    #[test]
    fn test_rpc_result() {
        assert_eq!(
            rpc_result(json!({"jsonrpc": "2.0", "id": 1, "result": true})).unwrap(),
            json!(true)
        );
        assert!(rpc_result(json!({"result": false})).is_err());
        assert_eq!(rpc_result(json!({})).unwrap(), json!({}));

        let err = rpc_result(json!({"error": {"message": "Odoo Server Error", "data": {"message": "no paper"}}}))
            .unwrap_err();
        assert_eq!(err, BridgeError::Transport(TransportError::Rejected("no paper".into())));
    }

    #[test]
    fn test_envelope_ids_increase() {
        let transport = Arc::new(HttpAgentTransport::new("http://127.0.0.1:8069", None).unwrap());
        let identity = PrinterIdentity::new(
            shared::PrinterRole::Cashier,
            "EPSON",
            "http://127.0.0.1:8069",
            None,
        );
        let adapter = HttpProxyAdapter::new(identity, transport, Duration::from_secs(1));
        let a = adapter.envelope(json!({"action": "cashbox"}));
        let b = adapter.envelope(json!({"action": "cashbox"}));
        assert_eq!(a["method"], "call");
        assert_eq!(a["params"]["data"]["action"], "cashbox");
        assert_eq!(b["id"].as_u64(), a["id"].as_u64().map(|id| id + 1));
    }

    #[tokio::test]
    async fn test_pdf_refused_without_network_call() {
        // Nothing listens on the discard port
        let transport = Arc::new(HttpAgentTransport::new("http://127.0.0.1:9", None).unwrap());
        let identity = PrinterIdentity::new(
            shared::PrinterRole::Cashier,
            "EPSON",
            "http://127.0.0.1:9",
            None,
        );
        let adapter = HttpProxyAdapter::new(identity, transport.clone(), Duration::from_secs(1));
        let pdf = shared::ReceiptPayload::from_bytes(PayloadKind::Pdf, b"%PDF-1.4\n", "application/pdf")
            .unwrap();

        let outcome = adapter.print(pdf).await;
        assert!(!outcome.successful);
        assert_eq!(outcome.kind, Some(crate::FailureKind::UnsupportedByAdapter));
        assert!(outcome.message.unwrap().body.contains("PDF"));
        // Status untouched: no request was made
        assert_eq!(transport.status(), crate::transport::ConnectionStatus::default());
    }
}
