//! 健康检查路由
//!
//! # 响应示例
//!
//! ```json
//! { "status": "ok", "version": "0.1.0" }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use shared::message::HealthResponse;

use crate::core::AgentState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn router() -> Router<AgentState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// 详细健康检查响应
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    backend: &'static str,
    printer_count: usize,
    /// 后端检查结果
    checks: BackendCheck,
}

#[derive(Serialize)]
pub struct BackendCheck {
    /// 状态 (ok | error)
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: Some(VERSION.to_string()),
    })
}

async fn detailed_health(State(state): State<AgentState>) -> Json<DetailedHealthResponse> {
    let checks = match state.backend.check() {
        Ok(()) => BackendCheck {
            status: "ok",
            message: None,
        },
        Err(message) => BackendCheck {
            status: "error",
            message: Some(message),
        },
    };
    let status = if checks.status == "ok" { "ok" } else { "degraded" };

    Json(DetailedHealthResponse {
        status,
        version: VERSION,
        uptime_seconds: state.uptime_seconds(),
        backend: state.backend.name(),
        printer_count: state.backend.printers().len(),
        checks,
    })
}
