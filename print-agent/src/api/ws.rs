//! WebSocket 命令通道
//!
//! 每个文本帧是一条命令，按接收顺序逐条应答 (一问一答，无请求 id)。
//!
//! | 命令 | 应答 |
//! |------|------|
//! | `list_printers` | `{"status":"ok","command":"list_printers","printers":[...]}` |
//! | `print_receipt` | `{"status":"ok","message":"Receipt printed","job_id":"..."}` |
//! | `health` | `{"status":"ok","message":"Agent online","version":"..."}` |
//! | 其它 / 非法 JSON | `{"status":"error","message":"...","code":...}` |

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use shared::message::{PrinterInfo, SocketCommand, SocketPrintData, SocketReply};
use shared::{ErrorCode, PayloadKind};

use super::auth::bearer_token;
use super::health::VERSION;
use super::print::{deliver, submit};
use crate::core::AgentState;
use crate::error::{AgentError, AgentResult};

const COMMANDS: [&str; 3] = ["health", "list_printers", "print_receipt"];

pub fn router() -> Router<AgentState> {
    Router::new().route("/ws", get(handle_ws))
}

#[derive(Debug, Default, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// GET /ws - 升级为 WebSocket
async fn handle_ws(
    State(state): State<AgentState>,
    Query(query): Query<WsQuery>,
    headers: axum::http::HeaderMap,
    ws: WebSocketUpgrade,
) -> AgentResult<impl IntoResponse> {
    let presented = query.token.as_deref().or_else(|| bearer_token(&headers));
    if !state.check_token(presented) {
        tracing::warn!("Rejected WebSocket client with missing or wrong token");
        return Err(AgentError::Unauthorized);
    }
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state)))
}

async fn handle_connection(socket: WebSocket, state: AgentState) {
    tracing::info!("WebSocket client connected");
    let (mut sink, mut stream) = socket.split();

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket read failed");
                break;
            }
        };

        let reply = handle_frame(&state, text.as_str()).await;
        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode WebSocket reply");
                continue;
            }
        };
        if sink.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
    tracing::info!("WebSocket client disconnected");
}

/// 处理一条命令帧，总是返回一个应答
pub(crate) async fn handle_frame(state: &AgentState, text: &str) -> SocketReply {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return SocketReply::error(ErrorCode::InvalidRequest, "Invalid JSON received.");
    };

    let known = value
        .get("command")
        .and_then(Value::as_str)
        .is_some_and(|name| COMMANDS.contains(&name));
    if !known {
        return SocketReply::error(
            ErrorCode::UnknownCommand,
            format!("Unknown command. Allowed commands: {}", COMMANDS.join(", ")),
        );
    }
    let command = serde_json::from_value::<SocketCommand>(value);

    match command {
        Ok(SocketCommand::Health) => {
            let mut reply = SocketReply::ok("Agent online");
            reply.command = Some("health".into());
            reply.extra.insert("version".into(), VERSION.into());
            reply
        }
        Ok(SocketCommand::ListPrinters) => {
            SocketReply::printers(state.backend.printers().into_iter().map(PrinterInfo::new).collect())
        }
        Ok(SocketCommand::PrintReceipt { printer_name, data }) => {
            match print_receipt(state, &printer_name, data).await {
                Ok(job_id) => {
                    let mut reply = SocketReply::ok("Receipt printed");
                    reply.command = Some("print_receipt".into());
                    reply.extra.insert("job_id".into(), job_id.into());
                    reply
                }
                Err(e) => {
                    tracing::warn!(error = %e, printer = %printer_name, "WebSocket print failed");
                    SocketReply::error(e.code(), e.public_message())
                }
            }
        }
        Err(_) => SocketReply::error(
            ErrorCode::RequiredField,
            "Missing 'printer_name' or 'data'.",
        ),
    }
}

/// `data` 为对象 `{type, data, mime}`，或纯字符串 (按原始文本打印)
async fn print_receipt(state: &AgentState, printer: &str, data: Value) -> AgentResult<String> {
    let job = match data {
        Value::String(text) => {
            let printer = state.resolve_printer(printer)?;
            deliver(state, printer, PayloadKind::Raw, "text/plain".into(), text.into_bytes()).await?
        }
        Value::Object(_) => {
            let data: SocketPrintData = serde_json::from_value(data)
                .map_err(|e| AgentError::InvalidPayload(e.to_string()))?;
            submit(state, printer, data.kind, &data.data, data.mime.as_deref()).await?
        }
        _ => return Err(AgentError::MissingField("Missing 'printer_name' or 'data'.".into())),
    };
    Ok(job.id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::core::Config;
    use std::sync::Arc;

    fn state() -> (AgentState, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(["Bar"]));
        (AgentState::new(Config::default(), backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (state, _) = state();
        let reply = handle_frame(&state, "{nope").await;
        assert!(reply.is_error());
        assert_eq!(reply.message.as_deref(), Some("Invalid JSON received."));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (state, _) = state();
        let reply = handle_frame(&state, r#"{"command":"reboot"}"#).await;
        assert_eq!(reply.error_code(), Some(ErrorCode::UnknownCommand));
    }

    #[tokio::test]
    async fn test_plain_string_prints_raw_text() {
        let (state, backend) = state();
        let reply = handle_frame(
            &state,
            r#"{"command":"print_receipt","printer_name":"bar","data":"hello"}"#,
        )
        .await;
        assert!(!reply.is_error(), "{reply:?}");
        let jobs = backend.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].printer, "Bar");
        assert_eq!(jobs[0].bytes, b"hello");
        assert_eq!(reply.extra["job_id"], jobs[0].id.to_string());
    }

    #[tokio::test]
    async fn test_typed_data() {
        let (state, backend) = state();
        let reply = handle_frame(
            &state,
            r#"{"command":"print_receipt","printer_name":"Bar","data":{"type":"pdf","data":"JVBERi0xLjQK"}}"#,
        )
        .await;
        assert!(!reply.is_error(), "{reply:?}");
        assert_eq!(backend.jobs()[0].mime, "application/pdf");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (state, _) = state();
        let reply = handle_frame(&state, r#"{"command":"print_receipt"}"#).await;
        assert_eq!(reply.error_code(), Some(ErrorCode::RequiredField));
    }

    #[tokio::test]
    async fn test_list_printers_and_health() {
        let (state, _) = state();
        let reply = handle_frame(&state, r#"{"command":"list_printers"}"#).await;
        assert_eq!(reply.printers, Some(vec![PrinterInfo::new("Bar")]));

        let reply = handle_frame(&state, r#"{"command":"health"}"#).await;
        assert_eq!(reply.status.as_deref(), Some("ok"));
        assert_eq!(reply.extra["version"], VERSION);
    }
}
