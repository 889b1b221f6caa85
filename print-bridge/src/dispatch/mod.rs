//! Job dispatch
//!
//! One lane per printer role. A lane is a FIFO queue drained by a single
//! worker task, so jobs of one role complete in enqueue order with at most
//! one in flight, while lanes progress independently of each other.

mod job;
mod orchestrator;
mod ticket;

pub use job::PrintJob;
pub use orchestrator::{DispatchOrchestrator, DispatchOrchestratorBuilder, LaneState, LaneStatus};
pub use ticket::PrintTicket;
