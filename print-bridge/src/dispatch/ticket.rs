//! Handle to a queued job

use shared::PrinterRole;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::adapter::PrintOutcome;
use crate::error::BridgeError;

/// Returned by `enqueue`; resolves to the job's outcome
#[derive(Debug)]
pub struct PrintTicket {
    job_id: Uuid,
    role: PrinterRole,
    rx: oneshot::Receiver<PrintOutcome>,
    debug: bool,
}

impl PrintTicket {
    pub(crate) fn new(
        job_id: Uuid,
        role: PrinterRole,
        rx: oneshot::Receiver<PrintOutcome>,
        debug: bool,
    ) -> Self {
        Self {
            job_id,
            role,
            rx,
            debug,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn role(&self) -> PrinterRole {
        self.role
    }

    /// Wait for the job to complete
    pub async fn wait(self) -> PrintOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => PrintOutcome::failure(&BridgeError::Cancelled, self.debug),
        }
    }
}
