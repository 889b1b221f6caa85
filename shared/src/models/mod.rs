//! Domain models shared by the bridge and the agent

pub mod payload;
pub mod printer;

pub use payload::{
    LENIENT_BASE64, PayloadError, PayloadKind, ReceiptPayload, extension_for_mime, sniff_bytes,
};
pub use printer::{PrinterIdentity, PrinterProtocol, PrinterRole};
