//! Token 认证
//!
//! 未配置 `AGENT_TOKEN` 时所有请求放行。

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::core::AgentState;
use crate::error::AgentError;

/// 从 `Authorization: Bearer <token>` 头取出 token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}

/// 认证中间件 - 要求 Bearer token
pub async fn require_token(
    State(state): State<AgentState>,
    request: Request,
    next: Next,
) -> Result<Response, AgentError> {
    if !state.check_token(bearer_token(request.headers())) {
        tracing::warn!(uri = %request.uri(), "Rejected request with missing or wrong token");
        return Err(AgentError::Unauthorized);
    }
    Ok(next.run(request).await)
}
