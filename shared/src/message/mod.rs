//! Agent wire protocol
//!
//! Two transports speak to the same agent:
//!
//! - [`http`]: stateless JSON over HTTP (`/health`, `/printers`, `/print`)
//! - [`socket`]: JSON frames over one persistent WebSocket (`/ws`)

pub mod http;
pub mod socket;

pub use self::http::{ErrorBody, HealthResponse, PrintAccepted, PrintRequest, PrintersResponse};
pub use socket::{SocketCommand, SocketPrintData, SocketReply};

use serde::{Deserialize, Serialize};

/// One printer as reported by the agent
///
/// Older agents list bare names (`["EPSON"]`), newer ones objects
/// (`[{"name": "EPSON"}]`); both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PrinterEntry")]
pub struct PrinterInfo {
    pub name: String,
}

impl PrinterInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PrinterEntry {
    Name(String),
    Info { name: String },
}

impl From<PrinterEntry> for PrinterInfo {
    fn from(entry: PrinterEntry) -> Self {
        match entry {
            PrinterEntry::Name(name) | PrinterEntry::Info { name } => Self { name },
        }
    }
}
