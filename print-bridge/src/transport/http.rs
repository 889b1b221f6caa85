//! Stateless HTTP agent transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use shared::message::{PrintRequest, PrinterInfo, PrintersResponse};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{
    AgentResponse, AgentTransport, ConnectionState, ConnectionStatus, NETWORK_BLOCKED_GUIDANCE,
    is_permission_denied, millis, publish,
};
use crate::dispatch::PrintJob;
use crate::error::TransportError;

/// Health check path of the local agent
pub const AGENT_HEALTH_PATH: &str = "/health";

/// HTTP transport to a local agent or hardware proxy
#[derive(Debug)]
pub struct HttpAgentTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
    health_path: String,
    status: watch::Sender<ConnectionStatus>,
    cancel: CancellationToken,
}

impl HttpAgentTransport {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        let (status, _) = watch::channel(ConnectionStatus::default());

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            health_path: AGENT_HEALTH_PATH.to_string(),
            status,
            cancel: CancellationToken::new(),
        })
    }

    /// Override the health check path (hardware proxies answer on `/hw_proxy/hello`)
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue one request, bounded by `timeout`.
    ///
    /// The in-flight request is dropped (and its connection aborted) when the
    /// timeout fires.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<(StatusCode, String), TransportError> {
        let url = self.url(path);
        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Err(_) => Err(TransportError::Timeout(millis(timeout))),
            Ok(Err(e)) => Err(self.map_error(&url, e, timeout)),
            Ok(Ok(pair)) => Ok(pair),
        }
    }

    fn map_error(&self, url: &str, err: reqwest::Error, timeout: Duration) -> TransportError {
        if err.is_timeout() {
            return TransportError::Timeout(millis(timeout));
        }
        if is_permission_denied(&err) {
            return TransportError::NetworkBlocked {
                url: url.to_string(),
                guidance: NETWORK_BLOCKED_GUIDANCE.to_string(),
            };
        }
        // Refused or unroutable: the agent is not running
        if err.is_connect() {
            return TransportError::NotConnected;
        }
        TransportError::Network(err.to_string())
    }

    /// Record the effect of a request on reachability
    fn observe<T>(&self, result: &Result<T, TransportError>) {
        match result {
            Ok(_) | Err(TransportError::HttpStatus { .. }) => {
                publish(&self.status, ConnectionStatus::new(ConnectionState::Connected, true, None))
            }
            Err(e) if e.is_unreachable() => publish(
                &self.status,
                ConnectionStatus::new(ConnectionState::Error, false, Some(e.to_string())),
            ),
            Err(_) => {}
        }
    }

    /// POST a JSON body and return the JSON reply.
    ///
    /// Non-2xx → `HttpStatus`; a 2xx body that is not JSON reads as `{}`.
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let result = self
            .request(Method::POST, path, Some(body), timeout)
            .await
            .and_then(|(status, text)| parse_reply(status, &text));
        self.observe(&result);
        result
    }

    /// GET and return the JSON reply
    pub async fn get_json(&self, path: &str, timeout: Duration) -> Result<Value, TransportError> {
        let result = self
            .request(Method::GET, path, None, timeout)
            .await
            .and_then(|(status, text)| parse_reply(status, &text));
        self.observe(&result);
        result
    }

    /// One health check; updates the `online` flag
    pub async fn check_health(&self, timeout: Duration) -> bool {
        let result = self
            .request(Method::GET, &self.health_path, None, timeout)
            .await;
        let status = match &result {
            Ok((code, _)) if code.is_success() => {
                ConnectionStatus::new(ConnectionState::Connected, true, None)
            }
            Ok((code, _)) => ConnectionStatus::new(
                ConnectionState::Error,
                false,
                Some(format!("health check returned HTTP {}", code.as_u16())),
            ),
            Err(e) => ConnectionStatus::new(ConnectionState::Error, false, Some(e.to_string())),
        };
        let online = status.online;
        publish(&self.status, status);
        online
    }

    /// Check health immediately and then every `interval` until shutdown
    pub fn spawn_health_monitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let transport = Arc::clone(self);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            info!(base_url = %transport.base_url, ?interval, "Agent health monitor started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let was_online = transport.is_reachable();
                        let online = transport.check_health(interval).await;
                        if online != was_online {
                            if online {
                                info!(base_url = %transport.base_url, "Agent is online");
                            } else {
                                warn!(base_url = %transport.base_url, "Agent went offline");
                            }
                        }
                    }
                }
            }
            debug!(base_url = %transport.base_url, "Agent health monitor stopped");
        })
    }
}

fn parse_reply(status: StatusCode, text: &str) -> Result<Value, TransportError> {
    if !status.is_success() {
        return Err(TransportError::HttpStatus {
            code: status.as_u16(),
            body: text.trim().to_string(),
        });
    }
    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::Object(Default::default())))
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, printer = %job.identity.name(), base_url = %self.base_url))]
    async fn send(&self, job: &PrintJob) -> Result<AgentResponse, TransportError> {
        let request = PrintRequest::new(job.identity.name(), &job.payload);
        let body = serde_json::to_value(&request)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let reply = self.post_json("/print", &body, job.timeout).await?;
        debug!(kind = %job.payload.kind(), "Agent accepted print job");
        Ok(AgentResponse::new(reply))
    }

    async fn list_printers(&self, timeout: Duration) -> Result<Vec<PrinterInfo>, TransportError> {
        let reply = self.get_json("/printers", timeout).await?;
        let parsed: PrintersResponse =
            serde_json::from_value(reply).map_err(|e| TransportError::Protocol(e.to_string()))?;
        Ok(parsed.printers)
    }

    fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        assert_eq!(
            parse_reply(StatusCode::OK, r#"{"ok":true}"#).unwrap(),
            serde_json::json!({"ok": true})
        );
        assert_eq!(
            parse_reply(StatusCode::OK, "printed").unwrap(),
            serde_json::json!({})
        );
        assert_eq!(
            parse_reply(StatusCode::INTERNAL_SERVER_ERROR, " paper out\n").unwrap_err(),
            TransportError::HttpStatus {
                code: 500,
                body: "paper out".into()
            }
        );
    }

    #[test]
    fn test_url_join() {
        let t = HttpAgentTransport::new("http://127.0.0.1:9060/", None).unwrap();
        assert_eq!(t.url("/print"), "http://127.0.0.1:9060/print");
        assert_eq!(t.url("printers"), "http://127.0.0.1:9060/printers");
    }

    #[test]
    fn test_blank_token_dropped() {
        let t = HttpAgentTransport::new("http://h:1", Some("  ".into())).unwrap();
        assert!(t.token.is_none());
    }

    #[tokio::test]
    async fn test_refused_connection_marks_offline() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let t = HttpAgentTransport::new(format!("http://127.0.0.1:{port}"), None).unwrap();
        let online = t.check_health(Duration::from_millis(500)).await;
        assert!(!online);
        assert!(!t.is_reachable());
        assert_eq!(t.status().state, ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_refused_connection_is_not_connected() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let t = HttpAgentTransport::new(format!("http://127.0.0.1:{port}"), None).unwrap();
        let err = t
            .post_json("/print", &serde_json::json!({}), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::NotConnected);
        assert!(!t.is_reachable());
    }
}
