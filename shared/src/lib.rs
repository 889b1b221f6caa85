//! Shared types for the print bridge
//!
//! Domain and wire types used by both the client bridge (`print-bridge`)
//! and the local agent (`print-agent`): printer identities, normalized
//! receipt payloads, HTTP/socket frames and agent error codes.

pub mod error;
pub mod message;
pub mod models;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ErrorCode, InvalidErrorCode};
pub use models::{
    PayloadError, PayloadKind, PrinterIdentity, PrinterProtocol, PrinterRole, ReceiptPayload,
};
