//! Agent 错误类型
//!
//! 每个错误映射到一个 [`ErrorCode`]，HTTP 响应体为 `{"error": "...", "code": 2001}`。

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use shared::message::ErrorBody;
use shared::{ErrorCode, PayloadError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Missing body")]
    MissingBody,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("{0}")]
    MissingField(String),

    #[error("Unknown type: {0}")]
    UnknownPayloadType(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Payload is empty")]
    EmptyPayload,

    #[error("Printer not found: {name}. Available: {}", available.join(", "))]
    PrinterNotFound { name: String, available: Vec<String> },

    #[error("No printers available on this system")]
    NoPrinters,

    #[error("Print failed: {0}")]
    PrintFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl AgentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::Unauthorized => ErrorCode::Unauthorized,
            AgentError::MissingBody | AgentError::InvalidJson(_) => ErrorCode::InvalidRequest,
            AgentError::MissingField(_) => ErrorCode::RequiredField,
            AgentError::UnknownPayloadType(_) => ErrorCode::UnknownPayloadType,
            AgentError::InvalidPayload(_) => ErrorCode::InvalidPayload,
            AgentError::EmptyPayload => ErrorCode::EmptyPayload,
            AgentError::PrinterNotFound { .. } => ErrorCode::PrinterNotFound,
            AgentError::NoPrinters => ErrorCode::NoPrinters,
            AgentError::PrintFailed(_) => ErrorCode::PrintFailed,
            AgentError::Storage(_) => ErrorCode::StorageError,
        }
    }

    /// 返回给客户端的消息 (存储错误不暴露路径细节)
    pub fn public_message(&self) -> String {
        match self {
            AgentError::Storage(_) => "Failed to store print job".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<PayloadError> for AgentError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::UnknownKind(kind) => AgentError::UnknownPayloadType(kind),
            PayloadError::InvalidBase64(msg) => AgentError::InvalidPayload(msg),
            PayloadError::Empty => AgentError::EmptyPayload,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let code = self.code();
        if code.http_status().is_server_error() {
            tracing::error!(error = %self, code = %code, "Request failed");
        } else {
            tracing::warn!(error = %self, code = %code, "Request rejected");
        }
        let body = ErrorBody::new(code, self.public_message());
        (code.http_status(), Json(body)).into_response()
    }
}

/// 处理器的 Result 类型别名
pub type AgentResult<T> = Result<T, AgentError>;
