//! Persistent WebSocket agent transport
//!
//! One supervisor task per transport owns the connection: it connects,
//! runs the session until the socket closes, waits the reconnect delay and
//! starts over, until shutdown. Reconnection is therefore never concurrent.
//!
//! The agent protocol carries no request ids; replies are matched to
//! requests in send order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use reqwest::Url;
use shared::message::{PrinterInfo, SocketCommand, SocketReply};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{
    AgentResponse, AgentTransport, ConnectionState, ConnectionStatus, NETWORK_BLOCKED_GUIDANCE,
    is_permission_denied, millis, publish,
};
use crate::dispatch::PrintJob;
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ReplySender = oneshot::Sender<Result<SocketReply, TransportError>>;

/// Live session: writer half plus requests awaiting a reply
struct Session {
    writer: mpsc::UnboundedSender<Message>,
    pending: VecDeque<ReplySender>,
}

#[derive(Debug)]
struct Inner {
    base_url: String,
    connect_url: String,
    reconnect_delay: Duration,
    status: watch::Sender<ConnectionStatus>,
    session: Mutex<Option<Session>>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// WebSocket transport to a local agent
#[derive(Debug, Clone)]
pub struct SocketAgentTransport {
    inner: Arc<Inner>,
}

impl SocketAgentTransport {
    /// Create a transport; nothing connects until [`start`](Self::start).
    ///
    /// The token, if any, is passed as the `token` query parameter.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        reconnect_delay: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut url = Url::parse(&base_url)
            .map_err(|e| TransportError::Protocol(format!("invalid agent url {base_url}: {e}")))?;
        if let Some(token) = token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("token", token);
        }
        let (status, _) = watch::channel(ConnectionStatus::default());

        Ok(Self {
            inner: Arc::new(Inner {
                base_url,
                connect_url: url.to_string(),
                reconnect_delay,
                status,
                session: Mutex::new(None),
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
            }),
        })
    }

    /// Spawn the connection supervisor. Idempotent.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.supervise().await });
    }

    pub fn is_connected(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    /// Send one command and wait for its reply
    async fn call(
        &self,
        command: &SocketCommand,
        timeout: Duration,
    ) -> Result<SocketReply, TransportError> {
        let text =
            serde_json::to_string(command).map_err(|e| TransportError::Protocol(e.to_string()))?;

        let rx = {
            let mut guard = self.inner.session.lock();
            let session = guard.as_mut().ok_or(TransportError::NotConnected)?;
            session
                .writer
                .send(Message::text(text))
                .map_err(|_| TransportError::NotConnected)?;
            let (tx, rx) = oneshot::channel();
            session.pending.push_back(tx);
            rx
        };

        match tokio::time::timeout(timeout, rx).await {
            Err(_) => Err(TransportError::Timeout(millis(timeout))),
            // Session dropped the sender: connection went away mid-request
            Ok(Err(_)) => Err(TransportError::NotConnected),
            Ok(Ok(reply)) => reply,
        }
    }
}

impl Inner {
    async fn supervise(self: Arc<Self>) {
        info!(base_url = %self.base_url, "Agent socket supervisor started");

        loop {
            self.set_status(ConnectionState::Connecting, None);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect_async(self.connect_url.as_str()) => result,
            };

            match connected {
                Ok((ws, _)) => {
                    info!(base_url = %self.base_url, "Agent socket connected");
                    self.run_session(ws).await;
                }
                Err(e) => {
                    let message = if is_permission_denied(&e) {
                        format!("{e}. {NETWORK_BLOCKED_GUIDANCE}")
                    } else {
                        e.to_string()
                    };
                    warn!(base_url = %self.base_url, error = %message, "Agent socket connect failed");
                    self.set_status(ConnectionState::Error, Some(message));
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            debug!(base_url = %self.base_url, delay = ?self.reconnect_delay, "Reconnecting after delay");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.close_session(ConnectionState::Disconnected, None);
        info!(base_url = %self.base_url, "Agent socket supervisor stopped");
    }

    async fn run_session(&self, ws: WsStream) {
        let (mut sink, mut stream) = ws.split();
        let (writer, mut outgoing) = mpsc::unbounded_channel::<Message>();
        {
            let mut guard = self.session.lock();
            *guard = Some(Session {
                writer,
                pending: VecDeque::new(),
            });
            self.set_status(ConnectionState::Connected, None);
        }

        let reason: Option<String> = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break None;
                }
                Some(message) = outgoing.recv() => {
                    if let Err(e) = sink.send(message).await {
                        break Some(format!("write failed: {e}"));
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch_reply(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break Some("connection closed by agent".to_string()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(e.to_string()),
                },
            }
        };

        match reason {
            Some(reason) => {
                warn!(base_url = %self.base_url, %reason, "Agent socket lost");
                self.close_session(ConnectionState::Disconnected, Some(reason));
            }
            None => self.close_session(ConnectionState::Disconnected, None),
        }
    }

    /// Hand a reply to the oldest waiting request
    fn dispatch_reply(&self, text: &str) {
        let mut guard = self.session.lock();
        let Some(session) = guard.as_mut() else {
            return;
        };
        let Some(waiter) = session.pending.pop_front() else {
            debug!(base_url = %self.base_url, "Unsolicited agent frame ignored");
            return;
        };
        let reply = serde_json::from_str::<SocketReply>(text)
            .map_err(|e| TransportError::Protocol(format!("invalid agent frame: {e}")));
        // Receiver gone means the caller timed out; the slot is still consumed
        let _ = waiter.send(reply);
    }

    /// Drop the session (failing every waiter) and publish the new state
    /// under the same lock, so no caller sees `online` with no session.
    fn close_session(&self, state: ConnectionState, last_error: Option<String>) {
        let mut guard = self.session.lock();
        if let Some(session) = guard.take() {
            for waiter in session.pending {
                let _ = waiter.send(Err(TransportError::NotConnected));
            }
        }
        self.set_status(state, last_error);
    }

    fn set_status(&self, state: ConnectionState, last_error: Option<String>) {
        let online = state == ConnectionState::Connected;
        publish(&self.status, ConnectionStatus::new(state, online, last_error));
    }
}

fn reply_to_result(reply: SocketReply) -> Result<SocketReply, TransportError> {
    if reply.is_error() {
        let message = reply
            .message
            .unwrap_or_else(|| "agent reported an error".to_string());
        return Err(TransportError::Rejected(message));
    }
    Ok(reply)
}

#[async_trait]
impl AgentTransport for SocketAgentTransport {
    fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, printer = %job.identity.name(), base_url = %self.inner.base_url))]
    async fn send(&self, job: &PrintJob) -> Result<AgentResponse, TransportError> {
        let command = SocketCommand::print_receipt(job.identity.name(), &job.payload);
        let reply = reply_to_result(self.call(&command, job.timeout).await?)?;
        let body = serde_json::to_value(&reply).map_err(|e| TransportError::Protocol(e.to_string()))?;
        Ok(AgentResponse::new(body))
    }

    async fn list_printers(&self, timeout: Duration) -> Result<Vec<PrinterInfo>, TransportError> {
        let reply = reply_to_result(self.call(&SocketCommand::ListPrinters, timeout).await?)?;
        reply
            .printers
            .ok_or_else(|| TransportError::Protocol("list_printers reply without printers".into()))
    }

    fn status(&self) -> ConnectionStatus {
        self.inner.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    fn is_reachable(&self) -> bool {
        self.is_connected()
    }

    fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_goes_into_query() {
        let t = SocketAgentTransport::new(
            "ws://127.0.0.1:9060/ws/",
            Some("a b".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(t.base_url(), "ws://127.0.0.1:9060/ws");
        assert_eq!(t.inner.connect_url, "ws://127.0.0.1:9060/ws?token=a+b");
    }

    #[test]
    fn test_error_reply_is_rejected() {
        let reply = SocketReply::error(shared::ErrorCode::PrinterNotFound, "no such printer");
        assert_eq!(
            reply_to_result(reply).unwrap_err(),
            TransportError::Rejected("no such printer".into())
        );
    }

    #[test]
    fn test_unknown_error_code_still_rejected() {
        let reply: SocketReply =
            serde_json::from_str(r#"{"status": "error", "message": "boom", "code": 500}"#).unwrap();
        assert_eq!(
            reply_to_result(reply).unwrap_err(),
            TransportError::Rejected("boom".into())
        );
    }

    #[tokio::test]
    async fn test_send_before_connect_fails_fast() {
        let t = SocketAgentTransport::new("ws://127.0.0.1:9/ws", None, Duration::from_secs(5))
            .unwrap();
        let err = t
            .call(&SocketCommand::Health, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::NotConnected);
        assert!(!t.is_reachable());
    }
}
