//! Print job

use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::{PrinterIdentity, ReceiptPayload};
use uuid::Uuid;

/// One receipt on its way to one printer
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub id: Uuid,
    pub identity: PrinterIdentity,
    pub payload: ReceiptPayload,
    pub enqueued_at: DateTime<Utc>,
    /// Attempts made so far
    pub attempts: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl PrintJob {
    pub fn new(identity: PrinterIdentity, payload: ReceiptPayload, timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            payload,
            enqueued_at: Utc::now(),
            attempts: 0,
            timeout,
        }
    }

    /// Same job addressed to another printer (fallback delegation)
    pub fn redirected(&self, identity: PrinterIdentity, timeout: Duration) -> Self {
        Self {
            identity,
            timeout,
            ..self.clone()
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
