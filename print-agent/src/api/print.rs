//! 打印任务提交
//!
//! # 请求
//!
//! ```json
//! { "printer": "EPSON TM-T20", "type": "raw", "data": "<base64>" }
//! ```
//!
//! `printerName` 可代替 `printer`；`type` 缺省为 `raw` (不区分大小写)。
//!
//! # 响应
//!
//! | 情况 | 状态码 | 响应体 |
//! |------|--------|--------|
//! | 成功 | 200 | `{"ok": true, "job_id": "..."}` |
//! | token 错误 | 401 | `{"error": "Unauthorized", "code": 1001}` |
//! | 缺少字段 | 400 | `{"error": "printer and data required", "code": 3}` |
//! | 未知类型 | 400 | `{"error": "Unknown type: zpl", "code": 3001}` |
//! | 打印机不存在 | 404 | `{"error": "Printer not found: ...", "code": 2001}` |
//! | 打印失败 | 500 | `{"error": "...", "code": 2003}` |

use axum::body::Bytes;
use axum::{Json, Router, extract::State, middleware, routing::post};
use serde::Deserialize;
use shared::message::PrintAccepted;
use shared::{PayloadKind, ReceiptPayload, models::sniff_bytes};

use super::auth::require_token;
use crate::backend::AgentJob;
use crate::core::AgentState;
use crate::error::{AgentError, AgentResult};

pub fn router(state: AgentState) -> Router<AgentState> {
    Router::new()
        .route("/print", post(print))
        .route_layer(middleware::from_fn_with_state(state, require_token))
}

/// `POST /print` 请求体 (宽松解析)
#[derive(Debug, Default, Deserialize)]
struct PrintBody {
    printer: Option<String>,
    #[serde(rename = "printerName")]
    printer_name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn print(State(state): State<AgentState>, body: Bytes) -> AgentResult<Json<PrintAccepted>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AgentError::MissingBody);
    }
    let body: PrintBody =
        serde_json::from_slice(&body).map_err(|e| AgentError::InvalidJson(e.to_string()))?;

    let printer = non_blank(body.printer).or_else(|| non_blank(body.printer_name));
    let data = non_blank(body.data);
    let (Some(printer), Some(data)) = (printer, data) else {
        return Err(AgentError::MissingField("printer and data required".into()));
    };
    let kind: PayloadKind = body.kind.as_deref().unwrap_or("raw").parse()?;

    let job = submit(&state, &printer, kind, &data, None).await?;
    Ok(Json(PrintAccepted {
        ok: true,
        job_id: Some(job.id.to_string()),
    }))
}

/// 校验并解码 base64 数据后交付 (HTTP 与 WebSocket 共用)
pub(crate) async fn submit(
    state: &AgentState,
    printer: &str,
    kind: PayloadKind,
    data: &str,
    mime: Option<&str>,
) -> AgentResult<AgentJob> {
    let printer = state.resolve_printer(printer)?;
    let bytes = ReceiptPayload::from_base64(kind, data, kind.default_mime())?.decoded()?;
    let mime = mime
        .map(str::to_string)
        .or_else(|| sniff_bytes(&bytes).map(|(_, m)| m.to_string()))
        .unwrap_or_else(|| kind.default_mime().to_string());
    deliver(state, printer, kind, mime, bytes).await
}

/// 交付已解码的字节
pub(crate) async fn deliver(
    state: &AgentState,
    printer: String,
    kind: PayloadKind,
    mime: String,
    bytes: Vec<u8>,
) -> AgentResult<AgentJob> {
    if bytes.is_empty() {
        return Err(AgentError::EmptyPayload);
    }
    let job = AgentJob::new(printer, kind, mime, bytes);
    state.backend.submit(&job).await?;
    tracing::info!(
        job_id = %job.id,
        printer = %job.printer,
        kind = %job.kind,
        bytes = job.bytes.len(),
        "Print job accepted"
    );
    Ok(job)
}
