//! WebSocket agent frames

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::PrinterInfo;
use crate::error::ErrorCode;
use crate::models::{PayloadKind, ReceiptPayload};

/// Client → agent frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SocketCommand {
    PrintReceipt {
        printer_name: String,
        /// Either a [`SocketPrintData`] object or a plain string (raw text)
        data: Value,
    },
    ListPrinters,
    Health,
}

impl SocketCommand {
    pub fn print_receipt(printer_name: impl Into<String>, payload: &ReceiptPayload) -> Self {
        let data = SocketPrintData {
            kind: payload.kind(),
            data: payload.data().to_string(),
            mime: Some(payload.mime().to_string()),
        };
        Self::PrintReceipt {
            printer_name: printer_name.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SocketCommand::PrintReceipt { .. } => "print_receipt",
            SocketCommand::ListPrinters => "list_printers",
            SocketCommand::Health => "health",
        }
    }
}

/// Typed `data` member of a `print_receipt` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketPrintData {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

/// Agent → client frame
///
/// Agents answer with `{"status": "ok"|"error", ...}`; printer listings also
/// carry `"command": "list_printers"`. Unknown members are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Numeric error code as sent; see [`SocketReply::error_code`]
    #[serde(
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printers: Option<Vec<PrinterInfo>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SocketReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Some("ok".to_string()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: Some("error".to_string()),
            message: Some(message.into()),
            code: Some(code.code()),
            ..Default::default()
        }
    }

    pub fn printers(printers: Vec<PrinterInfo>) -> Self {
        Self {
            status: Some("ok".to_string()),
            command: Some("list_printers".to_string()),
            printers: Some(printers),
            ..Default::default()
        }
    }

    /// `status` is `"error"` (legacy agents also answer `"success"` for ok)
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    /// Known error code, if the agent sent one this side understands
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code.and_then(|c| ErrorCode::try_from(c).ok())
    }
}

/// Codes from other agents may be strings or out of range; drop those
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok()))
}
