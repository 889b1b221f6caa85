//! HTTP agent request / response bodies

use serde::{Deserialize, Serialize};

use super::PrinterInfo;
use crate::error::ErrorCode;
use crate::models::{PayloadKind, ReceiptPayload};

/// `POST /print` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRequest {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub printer: String,
    /// Base64 payload
    pub data: String,
}

impl PrintRequest {
    pub fn new(printer: impl Into<String>, payload: &ReceiptPayload) -> Self {
        Self {
            kind: payload.kind(),
            printer: printer.into(),
            data: payload.data().to_string(),
        }
    }
}

/// `GET /printers` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintersResponse {
    #[serde(default)]
    pub printers: Vec<PrinterInfo>,
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Successful `POST /print` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintAccepted {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Error body returned with any non-2xx agent response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code),
        }
    }
}
