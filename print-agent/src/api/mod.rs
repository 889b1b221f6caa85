//! HTTP / WebSocket 接口
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 简单健康检查 | 无 |
//! | /health/detailed | GET | 详细健康检查 | 无 |
//! | /printers | GET | 打印机列表 | 无 |
//! | /print | POST | 提交打印任务 | Bearer (配置 token 时) |
//! | /ws | GET | WebSocket 命令通道 | `?token=` (配置 token 时) |

pub mod auth;
pub mod health;
pub mod print;
pub mod printers;
pub mod ws;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json, Router};
use shared::ErrorCode;
use shared::message::ErrorBody;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::AgentState;

/// 浏览器在访问本机地址前发送的 Private Network Access 响应头
const ALLOW_PRIVATE_NETWORK: &str = "access-control-allow-private-network";

/// 构建完整路由 (已绑定状态)
pub fn router(state: AgentState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);

    Router::new()
        .merge(health::router())
        .merge(printers::router())
        .merge(print::router(state.clone()))
        .merge(ws::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(timeout),
        )
        .layer(cors_layer())
        .layer(middleware::from_fn(allow_private_network))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(86_400))
}

/// 所有响应都带上 `Access-Control-Allow-Private-Network: true`
async fn allow_private_network(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(ALLOW_PRIVATE_NETWORK, HeaderValue::from_static("true"));
    response
}

async fn handle_timeout(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request timed out");
        let body = ErrorBody::new(ErrorCode::PrintFailed, "Request timed out");
        (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response()
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        let body = ErrorBody::new(ErrorCode::InternalError, "Internal agent error");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
