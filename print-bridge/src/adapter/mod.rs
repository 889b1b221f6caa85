//! Printer adapters
//!
//! An adapter binds a transport and a printer identity into the
//! capability the host sees: `print` and `open_cashbox`. Neither raises;
//! failures come back as a [`PrintOutcome`] or `false`.

mod hw_proxy;
mod local_agent;
mod outcome;

pub use crate::error::FailureKind;
pub use hw_proxy::{
    ACTION_PATH as HW_PROXY_ACTION_PATH, HEALTH_PATH as HW_PROXY_HEALTH_PATH, HttpProxyAdapter,
};
pub use local_agent::LocalAgentAdapter;
pub use outcome::{OutcomeMessage, PrintOutcome};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use shared::{PrinterIdentity, ReceiptPayload};

use crate::dispatch::PrintJob;
use crate::error::BridgeResult;
use crate::transport::AgentResponse;

#[async_trait]
pub trait PrinterAdapter: Send + Sync + fmt::Debug {
    /// Short adapter name for logs
    fn name(&self) -> &'static str;

    fn identity(&self) -> &PrinterIdentity;

    /// Per-attempt timeout
    fn timeout(&self) -> Duration;

    /// Raw error text in outcome messages
    fn debug(&self) -> bool {
        false
    }

    /// Deliver one job
    async fn submit(&self, job: &PrintJob) -> BridgeResult<AgentResponse>;

    /// Print a payload as a new, independent job
    async fn print(&self, payload: ReceiptPayload) -> PrintOutcome {
        let mut job = PrintJob::new(self.identity().clone(), payload, self.timeout());
        job.attempts = 1;
        PrintOutcome::from_result(self.submit(&job).await, self.debug())
    }

    /// Kick the cash drawer; `false` when unsupported or failed
    async fn open_cashbox(&self) -> bool {
        false
    }

    fn is_reachable(&self) -> bool;
}
