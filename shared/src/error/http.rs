//! HTTP status mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// HTTP status the agent answers with for this code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::InvalidRequest
            | Self::RequiredField
            | Self::UnknownCommand
            | Self::UnknownPayloadType
            | Self::InvalidPayload
            | Self::EmptyPayload => StatusCode::BAD_REQUEST,

            Self::Unauthorized => StatusCode::UNAUTHORIZED,

            Self::NotFound | Self::PrinterNotFound => StatusCode::NOT_FOUND,

            Self::NoPrinters => StatusCode::SERVICE_UNAVAILABLE,

            Self::Unknown | Self::PrintFailed | Self::InternalError | Self::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
