//! Error code definitions shared by the agent and its clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent error code
///
/// Serialized as a bare `u16` so that non-Rust clients can switch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Request body is malformed
    InvalidRequest = 2,
    /// Required field missing
    RequiredField = 3,
    /// Route or resource not found
    NotFound = 4,
    /// Unknown socket command
    UnknownCommand = 5,

    // ==================== 1xxx: Auth ====================
    /// Missing or wrong bearer token
    Unauthorized = 1001,

    // ==================== 2xxx: Printer ====================
    /// Requested printer is not installed on this machine
    PrinterNotFound = 2001,
    /// No printers are available at all
    NoPrinters = 2002,
    /// Backend failed to deliver the job
    PrintFailed = 2003,

    // ==================== 3xxx: Payload ====================
    /// `type` is not one of raw | image | pdf
    UnknownPayloadType = 3001,
    /// `data` is not valid base64
    InvalidPayload = 3002,
    /// `data` decoded to zero bytes
    EmptyPayload = 3003,

    // ==================== 9xxx: System ====================
    /// Internal agent error
    InternalError = 9001,
    /// Spool storage error
    StorageError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Developer-facing English message for this code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "printer and data required",
            ErrorCode::NotFound => "Not found",
            ErrorCode::UnknownCommand => "Unknown command",

            ErrorCode::Unauthorized => "Unauthorized",

            ErrorCode::PrinterNotFound => "Printer not found",
            ErrorCode::NoPrinters => "No printers available on this system",
            ErrorCode::PrintFailed => "Print operation failed",

            ErrorCode::UnknownPayloadType => "Unknown payload type",
            ErrorCode::InvalidPayload => "Payload is not valid base64",
            ErrorCode::EmptyPayload => "Payload is empty",

            ErrorCode::InternalError => "Internal agent error",
            ErrorCode::StorageError => "Spool storage error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::InvalidRequest),
            3 => Ok(ErrorCode::RequiredField),
            4 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::UnknownCommand),

            1001 => Ok(ErrorCode::Unauthorized),

            2001 => Ok(ErrorCode::PrinterNotFound),
            2002 => Ok(ErrorCode::NoPrinters),
            2003 => Ok(ErrorCode::PrintFailed),

            3001 => Ok(ErrorCode::UnknownPayloadType),
            3002 => Ok(ErrorCode::InvalidPayload),
            3003 => Ok(ErrorCode::EmptyPayload),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
