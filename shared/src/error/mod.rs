//! Agent error codes
//!
//! Numeric error codes returned by the local agent in JSON error bodies
//! (`{"error": "...", "code": 2001}`) and in socket error frames.
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Printer errors
//! - 3xxx: Payload errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::ErrorCode;
//!
//! let code = ErrorCode::PrinterNotFound;
//! assert_eq!(code.code(), 2001);
//! assert_eq!(code.http_status(), http::StatusCode::NOT_FOUND);
//! ```

mod codes;
mod http;

pub use codes::{ErrorCode, InvalidErrorCode};
